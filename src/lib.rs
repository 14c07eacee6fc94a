//! # Postcard Periods
//!
//! Harvests digitized postcard metadata, normalizes it, and classifies every
//! record by historical period and content category.
//!
//! Dates on postcards are free text ("1912", "[193-?]", "1939-1945", or
//! nothing at all), so the period classifier grades each mapping with a
//! confidence and, where the date is weak, falls back to century and decade
//! phrases in the record's Estonian and English subjects. A keyword
//! cross-check flags records whose text contradicts the date.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌───────────┐   ┌─────────────┐   ┌──────────┐
//! │  OAI-PMH   │──▶│ Harvester │──▶│ Transformer │──▶│ Classify │
//! │  endpoint  │   │ (retries) │   │ (EDM→flat)  │   │ period + │
//! └────────────┘   └───────────┘   └─────────────┘   │ category │
//!                                                    └────┬─────┘
//!                                                         ▼
//!                                  ┌───────────┐   ┌────────────┐
//!                                  │   Store   │◀──│ Aggregator │
//!                                  │ JSON tree │   │   index    │
//!                                  └───────────┘   └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! pcx sync --limit 100          # harvest a sample and build the index
//! pcx stats                     # what landed where
//! pcx map-date "1941-1943"      # inspect a single date mapping
//! pcx rebuild                   # reclassify without re-harvesting
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`xml`] | Owned XML element tree |
//! | [`oai`] | `ListRecords` response parsing |
//! | [`source`] | Remote record source trait and HTTP client |
//! | [`harvest`] | Paginated harvest with retry and backoff |
//! | [`progress`] | Harvest progress reporting |
//! | [`transform`] | Raw record → normalized record |
//! | [`periods`] | Period table |
//! | [`dating`] | Date string → period classification |
//! | [`category`] | Content category classification |
//! | [`conflict`] | Textual cross-check of date mappings |
//! | [`aggregate`] | Period × category index |
//! | [`store`] | Persisted index and record archives |
//! | [`ingest`] | Pipeline orchestration |
//! | [`stats`] | Index statistics |

pub mod aggregate;
pub mod category;
pub mod config;
pub mod conflict;
pub mod dating;
pub mod harvest;
pub mod ingest;
pub mod models;
pub mod oai;
pub mod periods;
pub mod progress;
pub mod source;
pub mod stats;
pub mod store;
pub mod transform;
pub mod xml;
