//! Core data models used throughout the pipeline.
//!
//! These types represent the records that flow from the harvester through
//! normalization and classification into the persisted period index.
//! Persisted shapes use camelCase keys because the index is read by a
//! JavaScript presentation layer.

use serde::{Deserialize, Serialize};

use crate::xml::XmlElement;

/// Header of a harvested record, as declared by the record source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordHeader {
    pub identifier: Option<String>,
    pub datestamp: Option<String>,
    #[serde(default)]
    pub set_specs: Vec<String>,
    #[serde(default)]
    pub deleted: bool,
}

/// Raw record produced by the harvester before normalization.
///
/// The metadata payload is kept as an opaque element tree; only the
/// transformer looks inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub header: RecordHeader,
    pub metadata: Option<XmlElement>,
}

/// The two image references every surviving record must carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrls {
    /// Display page URL (`edm:isShownAt`). Index key for the aggregate.
    pub full: String,
    /// Aggregated resource URL (`edm:isShownBy` / `edm:object`).
    pub resource: String,
}

/// Flat, validated record derived from exactly one [`RawRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRecord {
    pub identifier: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ester_url: Option<String>,
    pub image_urls: ImageUrls,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub subjects_et: Vec<String>,
    pub subjects_en: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_date: Option<String>,
    pub language: String,
    pub data_provider: String,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rights: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_warnings: Option<Vec<String>>,
}

impl NormalizedRecord {
    /// Both subject buckets, Estonian first.
    pub fn all_subjects(&self) -> impl Iterator<Item = &str> {
        self.subjects_et
            .iter()
            .chain(self.subjects_en.iter())
            .map(String::as_str)
    }
}

/// Historical period buckets, in chronological order.
///
/// The derived `Ord` follows declaration order, so maps keyed by `Period`
/// iterate chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Period {
    TsaristEra,
    WarOfIndependence,
    EarlyRepublic,
    EraOfSilence,
    FirstSovietOccupation,
    Wartime,
    StalinistEra,
    ThawPeriod,
    StagnationEra,
    SingingRevolution,
    RestoredIndependence,
    Contemporary,
}

impl Period {
    pub const ALL: [Period; 12] = [
        Period::TsaristEra,
        Period::WarOfIndependence,
        Period::EarlyRepublic,
        Period::EraOfSilence,
        Period::FirstSovietOccupation,
        Period::Wartime,
        Period::StalinistEra,
        Period::ThawPeriod,
        Period::StagnationEra,
        Period::SingingRevolution,
        Period::RestoredIndependence,
        Period::Contemporary,
    ];

    /// Wire name, e.g. `"STALINIST_ERA"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::TsaristEra => "TSARIST_ERA",
            Period::WarOfIndependence => "WAR_OF_INDEPENDENCE",
            Period::EarlyRepublic => "EARLY_REPUBLIC",
            Period::EraOfSilence => "ERA_OF_SILENCE",
            Period::FirstSovietOccupation => "FIRST_SOVIET_OCCUPATION",
            Period::Wartime => "WARTIME",
            Period::StalinistEra => "STALINIST_ERA",
            Period::ThawPeriod => "THAW_PERIOD",
            Period::StagnationEra => "STAGNATION_ERA",
            Period::SingingRevolution => "SINGING_REVOLUTION",
            Period::RestoredIndependence => "RESTORED_INDEPENDENCE",
            Period::Contemporary => "CONTEMPORARY",
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How certain a date → period mapping is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        })
    }
}

/// Result of classifying one date string into a [`Period`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateMapping {
    pub raw_date: String,
    pub mapped_period: Period,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub potential_periods: Option<Vec<Period>>,
    pub confidence: Confidence,
    pub reasoning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visual_verification: Option<VisualVerification>,
}

/// Keyword cross-check of a date mapping against textual cues.
///
/// Only attached when at least one hint matched; its absence means the
/// record carried no war or Soviet-era cues at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualVerification {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_period: Option<Period>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    pub war_hints: Vec<String>,
    pub soviet_hints: Vec<String>,
    pub needs_review: bool,
    pub reasoning: String,
}

/// Subject class half of a [`ContentCategory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentClass {
    Scenery,
    Festive,
    Portrait,
    Misc,
}

/// Drawn-versus-photographic half of a [`ContentCategory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Medium {
    Drawn,
    Photo,
}

/// Content bucket: subject class crossed with medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentCategory {
    SceneryDrawn,
    SceneryPhoto,
    FestiveDrawn,
    FestivePhoto,
    PortraitDrawn,
    PortraitPhoto,
    MiscDrawn,
    MiscPhoto,
}

impl ContentCategory {
    pub const ALL: [ContentCategory; 8] = [
        ContentCategory::SceneryDrawn,
        ContentCategory::SceneryPhoto,
        ContentCategory::FestiveDrawn,
        ContentCategory::FestivePhoto,
        ContentCategory::PortraitDrawn,
        ContentCategory::PortraitPhoto,
        ContentCategory::MiscDrawn,
        ContentCategory::MiscPhoto,
    ];

    pub fn new(class: ContentClass, medium: Medium) -> Self {
        match (class, medium) {
            (ContentClass::Scenery, Medium::Drawn) => ContentCategory::SceneryDrawn,
            (ContentClass::Scenery, Medium::Photo) => ContentCategory::SceneryPhoto,
            (ContentClass::Festive, Medium::Drawn) => ContentCategory::FestiveDrawn,
            (ContentClass::Festive, Medium::Photo) => ContentCategory::FestivePhoto,
            (ContentClass::Portrait, Medium::Drawn) => ContentCategory::PortraitDrawn,
            (ContentClass::Portrait, Medium::Photo) => ContentCategory::PortraitPhoto,
            (ContentClass::Misc, Medium::Drawn) => ContentCategory::MiscDrawn,
            (ContentClass::Misc, Medium::Photo) => ContentCategory::MiscPhoto,
        }
    }

    pub fn medium(&self) -> Medium {
        match self {
            ContentCategory::SceneryPhoto
            | ContentCategory::FestivePhoto
            | ContentCategory::PortraitPhoto
            | ContentCategory::MiscPhoto => Medium::Photo,
            _ => Medium::Drawn,
        }
    }

    /// Wire name, e.g. `"festive_drawn"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentCategory::SceneryDrawn => "scenery_drawn",
            ContentCategory::SceneryPhoto => "scenery_photo",
            ContentCategory::FestiveDrawn => "festive_drawn",
            ContentCategory::FestivePhoto => "festive_photo",
            ContentCategory::PortraitDrawn => "portrait_drawn",
            ContentCategory::PortraitPhoto => "portrait_photo",
            ContentCategory::MiscDrawn => "misc_drawn",
            ContentCategory::MiscPhoto => "misc_photo",
        }
    }
}

impl std::fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
