//! Date string → historical period classification.
//!
//! Catalogue dates arrive in many hand-typed shapes. Each string is matched
//! against an ordered list of [`DateShape`]s (first match wins):
//!
//! | Shape | Example | Resolved year | Confidence |
//! |-------|---------|---------------|------------|
//! | exact year | `1912` | 1912 | high |
//! | bracketed year | `[1912]` | 1912 | medium |
//! | year range | `1941-1943` | midpoint | medium, low if it spans periods |
//! | slash range | `1912/1913` | midpoint | medium |
//! | uncertain year | `1912?` | 1912 | low |
//! | uncertain decade | `191-?` | 1915 | low |
//! | bracketed uncertain decade | `[191-?]` | 1915 | low |
//! | parenthesized uncertain decade | `(191-?]` | 1915 | low |
//!
//! Anything else maps to the period containing the current year with low
//! confidence. Low-confidence results are then refined from the record's
//! subject terms ("20th century", "1930-ndad", ...) when a record is given.

use std::sync::OnceLock;

use chrono::Datelike;
use regex::{Captures, Regex};

use crate::models::{Confidence, DateMapping, NormalizedRecord, Period};
use crate::periods::PeriodTable;

/// Lexical shape of a raw date string, in matching priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateShape {
    ExactYear,
    BracketedYear,
    YearRange,
    SlashRange,
    UncertainYear,
    UncertainDecade,
    BracketedUncertainDecade,
    ParenthesizedUncertainDecade,
}

impl DateShape {
    pub const ORDER: [DateShape; 8] = [
        DateShape::ExactYear,
        DateShape::BracketedYear,
        DateShape::YearRange,
        DateShape::SlashRange,
        DateShape::UncertainYear,
        DateShape::UncertainDecade,
        DateShape::BracketedUncertainDecade,
        DateShape::ParenthesizedUncertainDecade,
    ];

    fn pattern(self) -> &'static str {
        match self {
            DateShape::ExactYear => r"^(\d{4})$",
            DateShape::BracketedYear => r"^\[(\d{4})\]$",
            DateShape::YearRange => r"^(\d{4})\s*-\s*(\d{4})$",
            DateShape::SlashRange => r"^(\d{4})\s*/\s*(\d{4})$",
            DateShape::UncertainYear => r"^(\d{4})\?$",
            DateShape::UncertainDecade => r"^(\d{3})-\?$",
            DateShape::BracketedUncertainDecade => r"^\[(\d{3})-\?\]$",
            DateShape::ParenthesizedUncertainDecade => r"^\((\d{3})-\?[\])]$",
        }
    }

    fn regex(self) -> &'static Regex {
        static COMPILED: OnceLock<Vec<Regex>> = OnceLock::new();
        let compiled = COMPILED.get_or_init(|| {
            DateShape::ORDER
                .iter()
                .map(|shape| Regex::new(shape.pattern()).expect("date shape pattern is valid"))
                .collect()
        });
        &compiled[self as usize]
    }

    /// Numbers captured when `raw` has this shape.
    pub fn captures(self, raw: &str) -> Option<Vec<i32>> {
        let caps = self.regex().captures(raw)?;
        caps.iter()
            .skip(1)
            .map(|m| m.and_then(|m| m.as_str().parse().ok()))
            .collect()
    }

    /// First shape (in priority order) that matches, with its numbers.
    pub fn detect(raw: &str) -> Option<(DateShape, Vec<i32>)> {
        let raw = raw.trim();
        DateShape::ORDER
            .iter()
            .find_map(|shape| shape.captures(raw).map(|nums| (*shape, nums)))
    }
}

/// Maps raw date strings (and optionally whole records) to periods.
#[derive(Debug, Clone)]
pub struct PeriodClassifier {
    table: PeriodTable,
    current_year: i32,
}

impl Default for PeriodClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl PeriodClassifier {
    /// Standard table, current calendar year from the system clock.
    pub fn new() -> Self {
        Self::with_table(PeriodTable::standard(), chrono::Utc::now().year())
    }

    pub fn with_table(table: PeriodTable, current_year: i32) -> Self {
        Self {
            table,
            current_year,
        }
    }

    pub fn table(&self) -> &PeriodTable {
        &self.table
    }

    /// Classify a date string, refining low-confidence results from the
    /// record's subjects when a record is supplied.
    pub fn map_date_to_period(
        &self,
        raw_date: &str,
        record: Option<&NormalizedRecord>,
    ) -> DateMapping {
        let lexical = self.map_lexical(raw_date);
        let Some(record) = record else {
            return lexical;
        };
        if lexical.confidence != Confidence::Low && !raw_date.trim().is_empty() {
            return lexical;
        }
        match self.estimate_from_subjects(record) {
            Some(estimate) => DateMapping {
                raw_date: raw_date.to_string(),
                mapped_period: self.table.period_for_year(estimate.year),
                potential_periods: lexical.potential_periods,
                confidence: estimate.confidence,
                reasoning: estimate.reasoning,
                visual_verification: None,
            },
            None => lexical,
        }
    }

    /// Classify from the date string alone.
    pub fn map_lexical(&self, raw_date: &str) -> DateMapping {
        let trimmed = raw_date.trim();
        match DateShape::detect(trimmed) {
            Some((shape, nums)) => self.resolve(shape, &nums, raw_date),
            None => self.unrecognized(raw_date),
        }
    }

    fn resolve(&self, shape: DateShape, nums: &[i32], raw_date: &str) -> DateMapping {
        let single = |year: i32, confidence: Confidence, reasoning: String| DateMapping {
            raw_date: raw_date.to_string(),
            mapped_period: self.table.period_for_year(year),
            potential_periods: None,
            confidence,
            reasoning,
            visual_verification: None,
        };

        match shape {
            DateShape::ExactYear => {
                single(nums[0], Confidence::High, format!("Exact year {}", nums[0]))
            }
            DateShape::BracketedYear => single(
                nums[0],
                Confidence::Medium,
                format!("Bracketed year [{}] is inferred by the cataloguer", nums[0]),
            ),
            DateShape::YearRange => {
                let (start, end) = (nums[0], nums[1]);
                let mid = midpoint(start, end);
                let touched = self.table.periods_in_range(start, end);
                let (confidence, reasoning) = if touched.len() > 1 {
                    let names: Vec<&str> = touched.iter().map(Period::as_str).collect();
                    (
                        Confidence::Low,
                        format!(
                            "Year range {}-{} spans {} periods ({}); using midpoint {}",
                            start,
                            end,
                            touched.len(),
                            names.join(", "),
                            mid
                        ),
                    )
                } else {
                    (
                        Confidence::Medium,
                        format!("Year range {}-{} within one period; midpoint {}", start, end, mid),
                    )
                };
                DateMapping {
                    potential_periods: Some(touched),
                    ..single(mid, confidence, reasoning)
                }
            }
            DateShape::SlashRange => {
                let mid = midpoint(nums[0], nums[1]);
                single(
                    mid,
                    Confidence::Medium,
                    format!("Alternative years {}/{}; midpoint {}", nums[0], nums[1], mid),
                )
            }
            DateShape::UncertainYear => single(
                nums[0],
                Confidence::Low,
                format!("Uncertain year {}?", nums[0]),
            ),
            DateShape::UncertainDecade
            | DateShape::BracketedUncertainDecade
            | DateShape::ParenthesizedUncertainDecade => {
                let year = nums[0] * 10 + 5;
                single(
                    year,
                    Confidence::Low,
                    format!("Uncertain decade {}0s; estimated {}", nums[0], year),
                )
            }
        }
    }

    fn unrecognized(&self, raw_date: &str) -> DateMapping {
        let reasoning = if raw_date.trim().is_empty() {
            "No date given; defaulting to the current period".to_string()
        } else {
            format!(
                "Unrecognized date format '{}'; defaulting to the current period",
                raw_date.trim()
            )
        };
        DateMapping {
            raw_date: raw_date.to_string(),
            mapped_period: self.table.period_for_year(self.current_year),
            potential_periods: None,
            confidence: Confidence::Low,
            reasoning,
            visual_verification: None,
        }
    }

    fn estimate_from_subjects(&self, record: &NormalizedRecord) -> Option<SubjectEstimate> {
        let et = estimate_bucket(&record.subjects_et, SubjectLanguage::Et);
        let en = estimate_bucket(&record.subjects_en, SubjectLanguage::En);

        match (et, en) {
            (Some(et), Some(en)) if (et.year - en.year).abs() <= 10 => {
                let year = midpoint(et.year, en.year);
                Some(SubjectEstimate {
                    year,
                    confidence: Confidence::High,
                    reasoning: format!(
                        "Subjects agree: '{}' (et) ≈ {}, '{}' (en) ≈ {}; estimated {}",
                        et.phrase, et.year, en.phrase, en.year, year
                    ),
                })
            }
            (Some(et), Some(en)) => Some(SubjectEstimate {
                year: et.year,
                confidence: Confidence::Medium,
                reasoning: format!(
                    "Subjects disagree: '{}' (et) ≈ {}, '{}' (en) ≈ {}; using the Estonian estimate",
                    et.phrase, et.year, en.phrase, en.year
                ),
            }),
            (Some(one), None) | (None, Some(one)) => Some(SubjectEstimate {
                year: one.year,
                confidence: Confidence::Medium,
                reasoning: format!(
                    "Estimated {} from subject '{}' ({})",
                    one.year,
                    one.phrase,
                    one.language.code()
                ),
            }),
            (None, None) => None,
        }
    }
}

fn midpoint(a: i32, b: i32) -> i32 {
    (a + b).div_euclid(2)
}

struct SubjectEstimate {
    year: i32,
    confidence: Confidence,
    reasoning: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubjectLanguage {
    Et,
    En,
}

impl SubjectLanguage {
    fn code(self) -> &'static str {
        match self {
            SubjectLanguage::Et => "et",
            SubjectLanguage::En => "en",
        }
    }
}

/// Period-indicating phrase families, most specific first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PhraseKind {
    HalfCentury,
    CenturyPart,
    Decade,
    Century,
}

const EN_PHRASES: [(PhraseKind, &str); 4] = [
    (
        PhraseKind::HalfCentury,
        r"(?i)\b(?P<which>first|second)\s+half\s+of\s+(?:the\s+)?(?P<n>\d{1,2})(?:st|nd|rd|th)\s+century",
    ),
    (
        PhraseKind::CenturyPart,
        r"(?i)\b(?P<which>beginning|end)\s+of\s+(?:the\s+)?(?P<n>\d{1,2})(?:st|nd|rd|th)\s+century",
    ),
    (PhraseKind::Decade, r"(?i)\b(?P<n>1[89]\d)0'?s\b"),
    (
        PhraseKind::Century,
        r"(?i)\b(?P<n>\d{1,2})(?:st|nd|rd|th)\s+century",
    ),
];

const ET_PHRASES: [(PhraseKind, &str); 4] = [
    (
        PhraseKind::HalfCentury,
        r"(?i)\b(?P<n>\d{1,2})\.\s*sajandi\s+(?P<which>esimene|teine)\s+pool",
    ),
    (
        PhraseKind::CenturyPart,
        r"(?i)\b(?P<n>\d{1,2})\.\s*sajandi\s+(?P<which>algus|lõpp)",
    ),
    (
        PhraseKind::Decade,
        r"(?i)\b(?P<n>1[89]\d)0(?:\s*-?\s*ndad|\.\s*aastad)",
    ),
    (PhraseKind::Century, r"(?i)\b(?P<n>\d{1,2})\.\s*sajand"),
];

fn phrase_regexes(language: SubjectLanguage) -> &'static [(PhraseKind, Regex)] {
    static ET: OnceLock<Vec<(PhraseKind, Regex)>> = OnceLock::new();
    static EN: OnceLock<Vec<(PhraseKind, Regex)>> = OnceLock::new();
    let (cell, source) = match language {
        SubjectLanguage::Et => (&ET, &ET_PHRASES),
        SubjectLanguage::En => (&EN, &EN_PHRASES),
    };
    cell.get_or_init(|| {
        source
            .iter()
            .map(|(kind, pattern)| {
                (
                    *kind,
                    Regex::new(pattern).expect("subject phrase pattern is valid"),
                )
            })
            .collect()
    })
}

/// Regex matching any century or decade phrase in either language.
///
/// Used to strip period phrases from subjects before indexing.
pub fn period_phrase_regex() -> &'static Regex {
    static ANY: OnceLock<Regex> = OnceLock::new();
    ANY.get_or_init(|| {
        let alternatives: Vec<String> = EN_PHRASES
            .iter()
            .chain(ET_PHRASES.iter())
            .map(|(_, p)| {
                let bare = p
                    .trim_start_matches("(?i)")
                    .replace("?P<n>", "")
                    .replace("?P<which>", "");
                format!("(?:{})", bare)
            })
            .collect();
        Regex::new(&format!("(?i){}", alternatives.join("|")))
            .expect("period phrase pattern is valid")
    })
}

struct BucketEstimate {
    year: i32,
    phrase: String,
    language: SubjectLanguage,
}

fn estimate_bucket(subjects: &[String], language: SubjectLanguage) -> Option<BucketEstimate> {
    let regexes = phrase_regexes(language);
    subjects.iter().find_map(|subject| {
        regexes.iter().find_map(|(kind, regex)| {
            let caps = regex.captures(subject)?;
            let year = estimate_year(*kind, &caps)?;
            Some(BucketEstimate {
                year,
                phrase: caps.get(0).map(|m| m.as_str()).unwrap_or(subject).to_string(),
                language,
            })
        })
    })
}

fn estimate_year(kind: PhraseKind, caps: &Captures<'_>) -> Option<i32> {
    let n: i32 = caps.name("n")?.as_str().parse().ok()?;
    let which = caps
        .name("which")
        .map(|m| m.as_str().to_lowercase())
        .unwrap_or_default();
    let century_start = (n - 1) * 100;
    match kind {
        PhraseKind::Century => Some(century_start + 50),
        PhraseKind::HalfCentury => match which.as_str() {
            "first" | "esimene" => Some(century_start + 25),
            _ => Some(century_start + 75),
        },
        PhraseKind::CenturyPart => match which.as_str() {
            "beginning" | "algus" => Some(century_start + 10),
            _ => Some(century_start + 90),
        },
        PhraseKind::Decade => Some(n * 10 + 5),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImageUrls;
    use proptest::prelude::*;

    fn classifier() -> PeriodClassifier {
        PeriodClassifier::with_table(PeriodTable::standard(), 2026)
    }

    fn record(et: &[&str], en: &[&str]) -> NormalizedRecord {
        NormalizedRecord {
            identifier: "oai:1".into(),
            title: "Postkaart".into(),
            creator: None,
            publisher: None,
            ester_url: None,
            image_urls: ImageUrls {
                full: "https://example.org/1".into(),
                resource: "https://example.org/1.jpg".into(),
            },
            location: None,
            subjects_et: et.iter().map(|s| s.to_string()).collect(),
            subjects_en: en.iter().map(|s| s.to_string()).collect(),
            raw_date: None,
            language: "et".into(),
            data_provider: "x".into(),
            provider: "y".into(),
            rights: None,
            validation_warnings: None,
        }
    }

    #[test]
    fn shapes_detect_in_priority_order() {
        let cases = [
            ("1912", DateShape::ExactYear),
            ("[1912]", DateShape::BracketedYear),
            ("1912-1914", DateShape::YearRange),
            ("1912 - 1914", DateShape::YearRange),
            ("1912/1913", DateShape::SlashRange),
            ("1912?", DateShape::UncertainYear),
            ("191-?", DateShape::UncertainDecade),
            ("[191-?]", DateShape::BracketedUncertainDecade),
            ("(191-?]", DateShape::ParenthesizedUncertainDecade),
            ("(191-?)", DateShape::ParenthesizedUncertainDecade),
        ];
        for (raw, expected) in cases {
            assert_eq!(DateShape::detect(raw).map(|(s, _)| s), Some(expected), "{}", raw);
        }
        assert!(DateShape::detect("circa 1912").is_none());
        assert!(DateShape::detect("12.05.1912").is_none());
    }

    #[test]
    fn exact_years_are_high_confidence() {
        let c = classifier();
        for year in [1894, 1917, 1925, 1940, 1943, 1950, 1975, 1990, 2010] {
            let mapping = c.map_date_to_period(&year.to_string(), None);
            assert_eq!(mapping.confidence, Confidence::High);
            assert_eq!(mapping.mapped_period, c.table().period_for_year(year));
            assert!(mapping.potential_periods.is_none());
        }
    }

    #[test]
    fn bracketed_year_is_medium() {
        let mapping = classifier().map_date_to_period("[1936]", None);
        assert_eq!(mapping.mapped_period, Period::EraOfSilence);
        assert_eq!(mapping.confidence, Confidence::Medium);
    }

    #[test]
    fn range_within_one_period_is_medium() {
        let mapping = classifier().map_date_to_period("1941-1943", None);
        assert_eq!(mapping.mapped_period, Period::Wartime);
        assert_eq!(mapping.potential_periods, Some(vec![Period::Wartime]));
        assert_eq!(mapping.confidence, Confidence::Medium);
    }

    #[test]
    fn range_across_periods_is_low() {
        let mapping = classifier().map_date_to_period("1915-1925", None);
        assert_eq!(mapping.confidence, Confidence::Low);
        assert_eq!(mapping.mapped_period, Period::WarOfIndependence);
        let potential = mapping.potential_periods.unwrap();
        assert!(potential.len() >= 2);
        assert_eq!(
            potential,
            vec![
                Period::TsaristEra,
                Period::WarOfIndependence,
                Period::EarlyRepublic
            ]
        );
    }

    #[test]
    fn slash_and_uncertain_shapes() {
        let c = classifier();
        let slash = c.map_date_to_period("1939/1941", None);
        assert_eq!(slash.mapped_period, Period::FirstSovietOccupation);
        assert_eq!(slash.confidence, Confidence::Medium);

        let uncertain = c.map_date_to_period("1956?", None);
        assert_eq!(uncertain.mapped_period, Period::ThawPeriod);
        assert_eq!(uncertain.confidence, Confidence::Low);

        for raw in ["192-?", "[192-?]", "(192-?]"] {
            let decade = c.map_date_to_period(raw, None);
            assert_eq!(decade.mapped_period, Period::EarlyRepublic, "{}", raw);
            assert_eq!(decade.confidence, Confidence::Low);
            assert!(decade.reasoning.contains("1925"));
        }
    }

    #[test]
    fn unrecognized_format_maps_to_current_period() {
        let c = PeriodClassifier::with_table(PeriodTable::standard(), 1960);
        let mapping = c.map_date_to_period("umbes sajandivahetusel", None);
        assert_eq!(mapping.mapped_period, Period::ThawPeriod);
        assert_eq!(mapping.confidence, Confidence::Low);
        assert!(mapping.reasoning.contains("Unrecognized"));
    }

    #[test]
    fn empty_date_uses_english_century_subject() {
        let r = record(&[], &["20th century"]);
        let mapping = classifier().map_date_to_period("", Some(&r));
        assert_eq!(mapping.mapped_period, Period::StalinistEra);
        assert_eq!(mapping.confidence, Confidence::Medium);
        assert!(mapping.reasoning.contains("1950"));
    }

    #[test]
    fn agreeing_buckets_raise_confidence() {
        let r = record(&["1930-ndad"], &["1930s"]);
        let mapping = classifier().map_date_to_period("", Some(&r));
        assert_eq!(mapping.mapped_period, Period::EraOfSilence);
        assert_eq!(mapping.confidence, Confidence::High);
    }

    #[test]
    fn disagreeing_buckets_prefer_estonian() {
        let r = record(&["20. sajandi algus"], &["1970s"]);
        let mapping = classifier().map_date_to_period("", Some(&r));
        assert_eq!(mapping.confidence, Confidence::Medium);
        assert_eq!(mapping.mapped_period, Period::TsaristEra);
    }

    #[test]
    fn phrase_estimates() {
        let c = classifier();
        let cases = [
            (record(&["20. sajandi esimene pool"], &[]), Period::EarlyRepublic),
            (record(&["20. sajandi teine pool"], &[]), Period::StagnationEra),
            (record(&[], &["beginning of the 20th century"]), Period::TsaristEra),
            (record(&[], &["end of the 20th century"]), Period::SingingRevolution),
            (record(&["20. sajand"], &[]), Period::StalinistEra),
        ];
        for (r, expected) in cases {
            let mapping = c.map_date_to_period("", Some(&r));
            assert_eq!(mapping.mapped_period, expected, "{:?}", r.subjects_et);
        }
    }

    #[test]
    fn enrichment_keeps_range_potential_periods() {
        let r = record(&[], &["1940s"]);
        let mapping = classifier().map_date_to_period("1939-1945", Some(&r));
        assert_eq!(mapping.mapped_period, Period::StalinistEra);
        assert_eq!(mapping.confidence, Confidence::Medium);
        assert_eq!(mapping.potential_periods.as_ref().map(Vec::len), Some(4));
    }

    #[test]
    fn confident_dates_ignore_subjects() {
        let r = record(&[], &["19th century"]);
        let mapping = classifier().map_date_to_period("1925", Some(&r));
        assert_eq!(mapping.mapped_period, Period::EarlyRepublic);
        assert_eq!(mapping.confidence, Confidence::High);
    }

    #[test]
    fn low_confidence_without_phrases_is_unchanged() {
        let r = record(&["linnavaated"], &["townscapes"]);
        let c = classifier();
        assert_eq!(
            c.map_date_to_period("1912?", Some(&r)),
            c.map_date_to_period("1912?", None)
        );
    }

    #[test]
    fn classification_is_deterministic() {
        let c = classifier();
        let r = record(&["20. sajand"], &[]);
        for raw in ["", "1912", "1915-1925", "garbage", "[191-?]"] {
            assert_eq!(
                c.map_date_to_period(raw, Some(&r)),
                c.map_date_to_period(raw, Some(&r))
            );
        }
    }

    #[test]
    fn period_phrase_regex_matches_both_languages() {
        let re = period_phrase_regex();
        assert!(re.is_match("20th century"));
        assert!(re.is_match("20. sajand"));
        assert!(re.is_match("1930-ndad"));
        assert!(re.is_match("1930s"));
        assert!(!re.is_match("linnavaated"));
    }

    proptest! {
        #[test]
        fn any_four_digit_year_is_high(year in 0i32..10000) {
            let c = classifier();
            let mapping = c.map_date_to_period(&format!("{:04}", year), None);
            prop_assert_eq!(mapping.confidence, Confidence::High);
            prop_assert_eq!(mapping.mapped_period, c.table().period_for_year(year));
            prop_assert!(mapping.potential_periods.is_none());
        }

        #[test]
        fn ranges_are_low_exactly_when_crossing_periods(start in 1800i32..2100, end in 1800i32..2100) {
            let c = classifier();
            let mapping = c.map_date_to_period(&format!("{}-{}", start, end), None);
            let touched = c.table().periods_in_range(start, end);
            if touched.len() > 1 {
                prop_assert_eq!(mapping.confidence, Confidence::Low);
            } else {
                prop_assert_eq!(mapping.confidence, Confidence::Medium);
            }
            let potential = mapping.potential_periods.unwrap_or_default();
            prop_assert_eq!(potential.len() >= 2, mapping.confidence == Confidence::Low);
            prop_assert_eq!(potential, touched);
        }

        #[test]
        fn any_date_string_maps_the_same_way_twice(raw in ".{0,24}", subject in ".{0,24}") {
            let c = classifier();
            let r = record(&[subject.as_str()], &[]);
            let first = c.map_date_to_period(&raw, Some(&r));
            prop_assert!(Period::ALL.contains(&first.mapped_period));
            prop_assert_eq!(&first, &c.map_date_to_period(&raw, Some(&r)));
            prop_assert_eq!(c.map_date_to_period(&raw, None), c.map_date_to_period(&raw, None));
        }
    }
}
