//! # Postcard Periods CLI (`pcx`)
//!
//! The `pcx` binary harvests postcard metadata from an OAI-PMH endpoint,
//! classifies every record by historical period and content category,
//! and writes the resulting index plus chunked record archives.
//!
//! ## Usage
//!
//! ```bash
//! pcx --config ./config/pcx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pcx sync` | Harvest, transform, classify and persist |
//! | `pcx rebuild` | Reclassify the raw archive of the last sync |
//! | `pcx map-date <RAW>` | Print the period mapping for one date string |
//! | `pcx stats` | Summarize the persisted index |
//!
//! ## Examples
//!
//! ```bash
//! # First 200 records only, no output written
//! pcx sync --limit 200 --dry-run
//!
//! # Full harvest with JSON progress on stderr
//! pcx sync --progress json
//!
//! # Check how a date string is read
//! pcx map-date "[193-?]"
//! ```

use anyhow::bail;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use postcard_periods::config::{self, Config};
use postcard_periods::dating::PeriodClassifier;
use postcard_periods::ingest::{self, SyncOptions};
use postcard_periods::progress::ProgressMode;
use postcard_periods::stats;

/// Postcard Periods CLI: harvest postcard metadata and index it by
/// historical period and content category.
///
/// Commands that touch the output directory read a TOML configuration
/// file given by `--config`. See `config/pcx.example.toml`.
#[derive(Parser)]
#[command(
    name = "pcx",
    about = "Harvest postcard metadata and index it by historical period and category",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/pcx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest the configured source and rebuild the index.
    ///
    /// Follows continuation tokens until the list is exhausted (or the
    /// limit is reached), normalizes and classifies every record, then
    /// replaces the output directory in one step.
    Sync {
        /// Stop after this many records (overrides `harvest.batch_size`).
        #[arg(long)]
        limit: Option<usize>,

        /// Run the pipeline but write nothing.
        #[arg(long)]
        dry_run: bool,

        /// Progress on stderr: `auto`, `human`, `json` or `off`.
        #[arg(long, default_value = "auto")]
        progress: String,
    },

    /// Reclassify the persisted raw archive without harvesting.
    Rebuild,

    /// Print the period mapping for a single raw date string as JSON.
    MapDate {
        /// Raw date as it appears in the metadata, e.g. `1941-1943`.
        raw: String,
    },

    /// Show statistics for the persisted index.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Commands that don't require config
    if let Commands::MapDate { raw } = &cli.command {
        let mapping = PeriodClassifier::new().map_date_to_period(raw, None);
        println!("{}", serde_json::to_string_pretty(&mapping)?);
        return Ok(());
    }

    let cfg: Config = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Sync {
            limit,
            dry_run,
            progress,
        } => {
            let Some(progress) = ProgressMode::parse(&progress) else {
                bail!(
                    "Unknown progress mode: '{}'. Available: auto, human, json, off",
                    progress
                );
            };
            let options = SyncOptions {
                limit,
                dry_run,
                progress,
            };
            ingest::run_sync(&cfg, &options).await?;
        }
        Commands::Rebuild => {
            ingest::run_rebuild(&cfg)?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg)?;
        }
        Commands::MapDate { .. } => {}
    }

    Ok(())
}
