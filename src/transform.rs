//! Raw record → [`NormalizedRecord`] transformation.
//!
//! Extraction works on the EDM payload carried in each record's metadata:
//!
//! | Field | Source |
//! |-------|--------|
//! | `title` | first non-empty `dc:title` |
//! | `esterUrl` | first `dc:identifier` containing `ester.ee` |
//! | `imageUrls.full` | `edm:isShownAt` |
//! | `imageUrls.resource` | `edm:isShownBy`, else `edm:object` |
//! | `subjectsEt` / `subjectsEn` | `dc:subject` by `xml:lang` |
//! | `rawDate` | `dc:date`, else `dcterms:created` |
//! | `dataProvider` / `provider` | `edm:dataProvider` / `edm:provider` |
//!
//! Missing image URLs reject the record. Every other gap is a
//! data-quality warning: the record is still produced with a default.
//! Subjects tagged with a language other than `et` or `en` (or untagged)
//! are dropped without a warning.

use tracing::warn;

use crate::models::{ImageUrls, NormalizedRecord, RawRecord};
use crate::xml::XmlElement;

pub const UNTITLED: &str = "[untitled]";
pub const DEFAULT_LANGUAGE: &str = "et";
pub const ALLOWED_LANGUAGES: [&str; 4] = ["et", "ru", "de", "en"];
pub const UNKNOWN_PROVIDER: &str = "unknown";
/// Identifier substring marking the national library catalogue link.
pub const ESTER_DOMAIN: &str = "ester.ee";

/// Why a record could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error("record header has no identifier")]
    MissingIdentifier,
    #[error("record is marked deleted")]
    Deleted,
    #[error("record has no metadata payload")]
    MissingMetadata,
    #[error("missing required image URL {field}")]
    MissingImageUrl { field: &'static str },
}

/// A non-fatal data-quality finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    pub identifier: String,
    pub message: String,
}

/// Warning log shared across a whole batch.
#[derive(Debug, Default)]
pub struct TransformContext {
    pub warnings: Vec<ValidationWarning>,
    identifier: String,
}

impl TransformContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn warn(&mut self, message: impl Into<String>) -> String {
        let message = message.into();
        self.warnings.push(ValidationWarning {
            identifier: self.identifier.clone(),
            message: message.clone(),
        });
        message
    }
}

/// A record excluded from the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub identifier: Option<String>,
    pub error: TransformError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub input: usize,
    pub output: usize,
    pub skipped: usize,
    pub warnings: usize,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub records: Vec<NormalizedRecord>,
    pub skipped: Vec<SkippedRecord>,
    pub warnings: Vec<ValidationWarning>,
    pub summary: BatchSummary,
}

/// Normalize one raw record, appending data-quality warnings to `ctx`.
pub fn transform(
    raw: &RawRecord,
    ctx: &mut TransformContext,
) -> Result<NormalizedRecord, TransformError> {
    let identifier = raw
        .header
        .identifier
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(TransformError::MissingIdentifier)?
        .to_string();
    if raw.header.deleted {
        return Err(TransformError::Deleted);
    }
    let metadata = raw.metadata.as_ref().ok_or(TransformError::MissingMetadata)?;

    // Checked first so a rejected record leaves no warnings behind.
    let image_urls = extract_image_urls(metadata)?;

    ctx.identifier = identifier.clone();
    let mut record_warnings = Vec::new();

    let title = match first_text(metadata, "dc:title") {
        Some(title) => title,
        None => {
            record_warnings.push(ctx.warn("missing title"));
            UNTITLED.to_string()
        }
    };

    let (subjects_et, subjects_en) = partition_subjects(metadata);
    if subjects_et.is_empty() && subjects_en.is_empty() {
        record_warnings.push(ctx.warn("no subjects in et or en"));
    }

    let language = match first_text(metadata, "dc:language").map(|l| l.to_lowercase()) {
        Some(lang) if ALLOWED_LANGUAGES.contains(&lang.as_str()) => lang,
        Some(lang) => {
            record_warnings.push(ctx.warn(format!(
                "unexpected language '{}', using '{}'",
                lang, DEFAULT_LANGUAGE
            )));
            DEFAULT_LANGUAGE.to_string()
        }
        None => {
            record_warnings.push(ctx.warn(format!(
                "missing language, using '{}'",
                DEFAULT_LANGUAGE
            )));
            DEFAULT_LANGUAGE.to_string()
        }
    };

    let data_provider = match first_resource(metadata, "edm:dataProvider") {
        Some(p) => p,
        None => {
            record_warnings.push(ctx.warn("missing data provider"));
            UNKNOWN_PROVIDER.to_string()
        }
    };
    let provider = match first_resource(metadata, "edm:provider") {
        Some(p) => p,
        None => {
            record_warnings.push(ctx.warn("missing provider"));
            UNKNOWN_PROVIDER.to_string()
        }
    };

    Ok(NormalizedRecord {
        identifier,
        title,
        creator: first_text(metadata, "dc:creator"),
        publisher: first_text(metadata, "dc:publisher"),
        ester_url: ester_url(metadata),
        image_urls,
        location: first_resource(metadata, "edm:currentLocation"),
        subjects_et,
        subjects_en,
        raw_date: first_text(metadata, "dc:date").or_else(|| first_text(metadata, "dcterms:created")),
        language,
        data_provider,
        provider,
        rights: first_resource(metadata, "edm:rights").or_else(|| first_text(metadata, "dc:rights")),
        validation_warnings: if record_warnings.is_empty() {
            None
        } else {
            Some(record_warnings)
        },
    })
}

/// Normalize a batch, skipping (and logging) records that fail.
pub fn transform_batch(raw_records: &[RawRecord]) -> BatchOutcome {
    let mut ctx = TransformContext::new();
    let mut records = Vec::with_capacity(raw_records.len());
    let mut skipped = Vec::new();

    for raw in raw_records {
        match transform(raw, &mut ctx) {
            Ok(record) => records.push(record),
            Err(error) => {
                warn!(
                    identifier = raw.header.identifier.as_deref().unwrap_or("<none>"),
                    %error,
                    "skipping record"
                );
                skipped.push(SkippedRecord {
                    identifier: raw.header.identifier.clone(),
                    error,
                });
            }
        }
    }

    let summary = BatchSummary {
        input: raw_records.len(),
        output: records.len(),
        skipped: skipped.len(),
        warnings: ctx.warnings.len(),
    };

    BatchOutcome {
        records,
        skipped,
        warnings: ctx.warnings,
        summary,
    }
}

fn extract_image_urls(metadata: &XmlElement) -> Result<ImageUrls, TransformError> {
    let full = first_resource(metadata, "edm:isShownAt").ok_or(TransformError::MissingImageUrl {
        field: "edm:isShownAt",
    })?;
    let resource = first_resource(metadata, "edm:isShownBy")
        .or_else(|| first_resource(metadata, "edm:object"))
        .ok_or(TransformError::MissingImageUrl {
            field: "edm:isShownBy",
        })?;
    Ok(ImageUrls { full, resource })
}

fn first_text(metadata: &XmlElement, name: &str) -> Option<String> {
    metadata
        .find_all(name)
        .into_iter()
        .find_map(|e| e.text())
        .map(str::to_string)
}

fn first_resource(metadata: &XmlElement, name: &str) -> Option<String> {
    metadata
        .find_all(name)
        .into_iter()
        .find_map(|e| e.resource_or_text())
        .map(str::to_string)
}

fn ester_url(metadata: &XmlElement) -> Option<String> {
    metadata
        .find_all("dc:identifier")
        .into_iter()
        .filter_map(|e| e.resource_or_text())
        .find(|value| value.contains(ESTER_DOMAIN))
        .map(str::to_string)
}

fn partition_subjects(metadata: &XmlElement) -> (Vec<String>, Vec<String>) {
    let mut et = Vec::new();
    let mut en = Vec::new();
    for subject in metadata.find_all("dc:subject") {
        let Some(text) = subject.text() else { continue };
        match subject.attr("xml:lang").map(|l| l.trim().to_lowercase()).as_deref() {
            Some("et") => et.push(text.to_string()),
            Some("en") => en.push(text.to_string()),
            _ => {}
        }
    }
    (et, en)
}
