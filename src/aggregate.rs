//! Period × category index built from classified records.
//!
//! [`aggregate`] folds a batch of [`NormalizedRecord`]s into a
//! [`PeriodMappedData`] in one pass. The structure is zero-filled: every
//! period and every category key is present even when no record lands
//! in it, so consumers never have to handle missing buckets.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::category::categorize;
use crate::conflict;
use crate::dating::{period_phrase_regex, PeriodClassifier};
use crate::models::{Confidence, ContentCategory, Medium, NormalizedRecord, Period};
use crate::periods::{PeriodDefinition, PeriodTable};

/// Generic subjects that describe the collection rather than the picture.
/// Compared case-insensitively against whole subject strings.
pub const PROVENANCE_TERMS: &[&str] = &[
    "postkaardid",
    "postkaart",
    "piltpostkaardid",
    "fotopostkaardid",
    "fotod",
    "pildid",
    "trükised",
    "postcards",
    "postcard",
    "picture postcards",
    "photos",
    "photographs",
    "pictures",
    "printed matter",
];

/// The persisted index document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodMappedData {
    pub metadata: IndexMetadata,
    pub periods: BTreeMap<Period, PeriodBucket>,
    /// Keyed by the record's display URL (`imageUrls.full`).
    pub index: BTreeMap<String, IndexEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexMetadata {
    pub generated_at: DateTime<Utc>,
    pub total_records: usize,
    /// Periods with at least one record, chronological.
    pub periods_present: Vec<Period>,
    pub summary: IndexSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSummary {
    pub confidence: ConfidenceCounts,
    pub needs_review: usize,
    pub categories: BTreeMap<ContentCategory, usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl ConfidenceCounts {
    pub fn add(&mut self, confidence: Confidence) {
        match confidence {
            Confidence::High => self.high += 1,
            Confidence::Medium => self.medium += 1,
            Confidence::Low => self.low += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodBucket {
    pub metadata: PeriodMetadata,
    pub categories: BTreeMap<ContentCategory, CategoryBucket>,
    pub statistics: PeriodStatistics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodMetadata {
    pub name_et: String,
    pub name_en: String,
    pub start: i32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub end: Option<i32>,
}

impl From<&PeriodDefinition> for PeriodMetadata {
    fn from(def: &PeriodDefinition) -> Self {
        Self {
            name_et: def.name_et.to_string(),
            name_en: def.name_en.to_string(),
            start: def.start,
            end: def.end,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryBucket {
    /// Display URLs of the records in this bucket, in input order.
    pub records: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodStatistics {
    pub total_records: usize,
    pub confidence: ConfidenceCounts,
    pub needs_review: usize,
    pub drawn: usize,
    pub photo: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub period: Period,
    pub category: ContentCategory,
    pub image_url: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub location: Option<String>,
    pub subjects: Vec<String>,
}

impl PeriodMappedData {
    /// Zero-filled structure with every period and category key present.
    pub fn empty(table: &PeriodTable, generated_at: DateTime<Utc>) -> Self {
        let periods = Period::ALL
            .iter()
            .map(|&period| {
                let metadata = table
                    .definition(period)
                    .map(PeriodMetadata::from)
                    .unwrap_or_default();
                let categories = ContentCategory::ALL
                    .iter()
                    .map(|&c| (c, CategoryBucket::default()))
                    .collect();
                (
                    period,
                    PeriodBucket {
                        metadata,
                        categories,
                        statistics: PeriodStatistics::default(),
                    },
                )
            })
            .collect();

        Self {
            metadata: IndexMetadata {
                generated_at,
                total_records: 0,
                periods_present: Vec::new(),
                summary: IndexSummary {
                    categories: ContentCategory::ALL.iter().map(|&c| (c, 0)).collect(),
                    ..IndexSummary::default()
                },
            },
            periods,
            index: BTreeMap::new(),
        }
    }

    fn insert(
        &mut self,
        record: &NormalizedRecord,
        period: Period,
        category: ContentCategory,
        confidence: Confidence,
        needs_review: bool,
    ) {
        let url = record.image_urls.full.clone();

        if let Some(bucket) = self.periods.get_mut(&period) {
            if let Some(cat) = bucket.categories.get_mut(&category) {
                cat.records.push(url.clone());
                cat.count += 1;
            }
            let stats = &mut bucket.statistics;
            stats.total_records += 1;
            stats.confidence.add(confidence);
            if needs_review {
                stats.needs_review += 1;
            }
            match category.medium() {
                Medium::Drawn => stats.drawn += 1,
                Medium::Photo => stats.photo += 1,
            }
        }

        let meta = &mut self.metadata;
        meta.total_records += 1;
        meta.summary.confidence.add(confidence);
        if needs_review {
            meta.summary.needs_review += 1;
        }
        *meta.summary.categories.entry(category).or_insert(0) += 1;
        if !meta.periods_present.contains(&period) {
            meta.periods_present.push(period);
            meta.periods_present.sort();
        }

        self.index.insert(
            url.clone(),
            IndexEntry {
                period,
                category,
                image_url: url,
                location: record.location.clone(),
                subjects: index_subjects(record),
            },
        );
    }

    /// Records in one period/category bucket.
    pub fn count(&self, period: Period, category: ContentCategory) -> usize {
        self.periods
            .get(&period)
            .and_then(|b| b.categories.get(&category))
            .map_or(0, |c| c.count)
    }
}

/// Classify every record and fold the results into the index.
///
/// Records sharing a display URL are indexed once; later duplicates are
/// ignored so bucket counts always agree with the index.
pub fn aggregate(
    records: &[NormalizedRecord],
    classifier: &PeriodClassifier,
    generated_at: DateTime<Utc>,
) -> PeriodMappedData {
    let mut data = PeriodMappedData::empty(classifier.table(), generated_at);

    for record in records {
        if data.index.contains_key(&record.image_urls.full) {
            debug!(
                identifier = %record.identifier,
                url = %record.image_urls.full,
                "duplicate image url, skipping"
            );
            continue;
        }

        let raw_date = record.raw_date.as_deref().unwrap_or("");
        let mut mapping = classifier.map_date_to_period(raw_date, Some(record));
        conflict::verify(record, &mut mapping);
        let category = categorize(record);
        let needs_review = mapping
            .visual_verification
            .as_ref()
            .is_some_and(|v| v.needs_review);

        data.insert(
            record,
            mapping.mapped_period,
            category,
            mapping.confidence,
            needs_review,
        );
    }

    data
}

/// Subjects worth showing in the index: provenance terms and period
/// phrases removed, duplicates collapsed.
pub fn index_subjects(record: &NormalizedRecord) -> Vec<String> {
    let phrase = period_phrase_regex();
    let mut out: Vec<String> = Vec::new();
    for subject in record.all_subjects() {
        let subject = subject.trim();
        if subject.is_empty() || phrase.is_match(subject) {
            continue;
        }
        let lower = subject.to_lowercase();
        if PROVENANCE_TERMS.contains(&lower.as_str()) {
            continue;
        }
        if !out.iter().any(|s| s.to_lowercase() == lower) {
            out.push(subject.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImageUrls;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn classifier() -> PeriodClassifier {
        PeriodClassifier::with_table(PeriodTable::standard(), 2024)
    }

    fn record(id: &str, date: &str, et: &[&str], en: &[&str]) -> NormalizedRecord {
        NormalizedRecord {
            identifier: id.into(),
            title: format!("Kaart {}", id),
            creator: None,
            publisher: None,
            ester_url: None,
            image_urls: ImageUrls {
                full: format!("https://example.org/{}", id),
                resource: format!("https://example.org/{}.jpg", id),
            },
            location: Some("Tartu".into()),
            subjects_et: et.iter().map(|s| s.to_string()).collect(),
            subjects_en: en.iter().map(|s| s.to_string()).collect(),
            raw_date: if date.is_empty() {
                None
            } else {
                Some(date.into())
            },
            language: "et".into(),
            data_provider: "x".into(),
            provider: "y".into(),
            rights: None,
            validation_warnings: None,
        }
    }

    #[test]
    fn empty_input_is_zero_filled() {
        let data = aggregate(&[], &classifier(), ts());
        assert_eq!(data.periods.len(), 12);
        for period in Period::ALL {
            let bucket = &data.periods[&period];
            assert_eq!(bucket.categories.len(), 8);
            for category in ContentCategory::ALL {
                assert_eq!(bucket.categories[&category].count, 0);
                assert!(bucket.categories[&category].records.is_empty());
            }
            assert_eq!(bucket.statistics, PeriodStatistics::default());
        }
        assert_eq!(data.metadata.total_records, 0);
        assert!(data.metadata.periods_present.is_empty());
        assert!(data.index.is_empty());
        assert_eq!(data.metadata.summary.categories.len(), 8);
    }

    #[test]
    fn records_land_in_their_buckets() {
        let records = vec![
            record("a", "1912", &["linnavaated"], &[]),
            record("b", "1912", &["linnavaated", "fotod"], &[]),
            record("c", "1942", &["portreed"], &[]),
        ];
        let data = aggregate(&records, &classifier(), ts());

        assert_eq!(data.metadata.total_records, 3);
        assert_eq!(
            data.metadata.periods_present,
            vec![Period::TsaristEra, Period::Wartime]
        );
        assert_eq!(data.count(Period::TsaristEra, ContentCategory::SceneryDrawn), 1);
        assert_eq!(data.count(Period::TsaristEra, ContentCategory::SceneryPhoto), 1);
        assert_eq!(data.count(Period::Wartime, ContentCategory::PortraitDrawn), 1);

        let tsarist = &data.periods[&Period::TsaristEra];
        assert_eq!(tsarist.statistics.total_records, 2);
        assert_eq!(tsarist.statistics.drawn, 1);
        assert_eq!(tsarist.statistics.photo, 1);
        assert_eq!(tsarist.statistics.confidence.high, 2);
        assert_eq!(tsarist.metadata.start, 1894);
        assert_eq!(
            tsarist.categories[&ContentCategory::SceneryDrawn].records,
            vec!["https://example.org/a"]
        );

        let entry = &data.index["https://example.org/c"];
        assert_eq!(entry.period, Period::Wartime);
        assert_eq!(entry.category, ContentCategory::PortraitDrawn);
        assert_eq!(entry.location.as_deref(), Some("Tartu"));
        assert_eq!(data.metadata.summary.confidence.total(), 3);
    }

    #[test]
    fn periods_present_is_chronological() {
        let records = vec![
            record("a", "1975", &[], &[]),
            record("b", "1905", &[], &[]),
            record("c", "1975", &[], &[]),
        ];
        let data = aggregate(&records, &classifier(), ts());
        assert_eq!(
            data.metadata.periods_present,
            vec![Period::TsaristEra, Period::StagnationEra]
        );
    }

    #[test]
    fn conflicts_are_counted_for_review() {
        let records = vec![record("a", "1935-1945", &["Teine maailmasõda"], &[])];
        let data = aggregate(&records, &classifier(), ts());
        assert_eq!(data.metadata.summary.needs_review, 1);
        let stats = &data.periods[&Period::FirstSovietOccupation].statistics;
        assert_eq!(stats.needs_review, 1);
        assert_eq!(stats.confidence.low, 1);
    }

    #[test]
    fn duplicate_urls_are_indexed_once() {
        let records = vec![
            record("a", "1912", &[], &[]),
            record("a", "1975", &[], &[]),
        ];
        let data = aggregate(&records, &classifier(), ts());
        assert_eq!(data.metadata.total_records, 1);
        assert_eq!(data.index.len(), 1);
        assert_eq!(data.index["https://example.org/a"].period, Period::TsaristEra);
    }

    #[test]
    fn index_subjects_drop_provenance_and_period_phrases() {
        let r = record(
            "a",
            "",
            &["Postkaardid", "linnavaated", "1930-ndad", "Tartu"],
            &["postcards", "20th century", "Townscapes", "tartu"],
        );
        assert_eq!(index_subjects(&r), vec!["linnavaated", "Tartu", "Townscapes"]);
    }

    #[test]
    fn classification_uses_unfiltered_subjects() {
        // The decade subject is stripped from the index but still dates the record.
        let r = record("a", "", &["1930-ndad"], &["1930s"]);
        let data = aggregate(&[r], &classifier(), ts());
        let entry = &data.index["https://example.org/a"];
        assert_eq!(entry.period, Period::EraOfSilence);
        assert!(entry.subjects.is_empty());
        assert_eq!(data.metadata.summary.confidence.high, 1);
    }

    #[test]
    fn index_document_serializes_with_camel_case_keys() {
        let data = aggregate(&[record("a", "1912", &[], &[])], &classifier(), ts());
        let json = serde_json::to_value(&data).unwrap();
        assert!(json["metadata"]["periodsPresent"].is_array());
        assert_eq!(json["metadata"]["totalRecords"], 1);
        assert_eq!(
            json["periods"]["TSARIST_ERA"]["categories"]["misc_drawn"]["count"],
            1
        );
        assert_eq!(
            json["index"]["https://example.org/a"]["imageUrl"],
            "https://example.org/a"
        );

        let back: PeriodMappedData = serde_json::from_value(json).unwrap();
        assert_eq!(back, data);
    }
}
