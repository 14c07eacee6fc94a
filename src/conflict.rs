//! Keyword cross-check of date mappings against textual cues.
//!
//! Two hint families are scanned in the lowercased title and subjects:
//! war/occupation terms and Soviet-era terms. War hints take precedence
//! when both families match. A suggestion is only made when the date
//! mapping already admits the suggested period, so a hint can narrow an
//! ambiguous range but never override a confident date.

use std::sync::OnceLock;

use regex::Regex;

use crate::category::RecordText;
use crate::models::{Confidence, DateMapping, NormalizedRecord, Period, VisualVerification};

/// Regex sources for each hint family. Patterns are matched against
/// lowercased text.
#[derive(Debug, Clone, Copy)]
pub struct ConflictPatterns {
    pub war: &'static [&'static str],
    pub soviet: &'static [&'static str],
    pub stalin: &'static [&'static str],
    pub thaw: &'static [&'static str],
}

pub const STANDARD_PATTERNS: ConflictPatterns = ConflictPatterns {
    war: &[
        r"sõda",
        r"sõja",
        r"okupatsioon",
        r"\bwar\b",
        r"\boccupation\b",
        r"\bbombing",
        r"pommitamine",
        r"wehrmacht",
    ],
    soviet: &[
        r"nõukogude",
        r"\bsoviet",
        r"kolhoos",
        r"kolkhoz",
        r"\bnsvl\b",
        r"\bussr\b",
        r"eesti nsv",
        r"punaarmee",
        r"red army",
        r"\blenin",
    ],
    stalin: &[r"stalin"],
    thaw: &[r"hruštšov", r"khrushchev", r"\bsula\b", r"\bthaw\b"],
};

/// Soviet sub-periods a Soviet-era hint may resolve to.
const SOVIET_PERIODS: [Period; 3] = [
    Period::StalinistEra,
    Period::ThawPeriod,
    Period::StagnationEra,
];

struct HintSet {
    patterns: Vec<(&'static str, Regex)>,
}

impl HintSet {
    fn compile(sources: &'static [&'static str]) -> Result<Self, regex::Error> {
        let patterns = sources
            .iter()
            .map(|src| Regex::new(src).map(|re| (*src, re)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Matched text of every pattern that hits, deduplicated, in table order.
    fn matches(&self, text: &str) -> Vec<String> {
        let mut hits: Vec<String> = Vec::new();
        for (_, re) in &self.patterns {
            if let Some(m) = re.find(text) {
                let hit = m.as_str().trim().to_string();
                if !hits.contains(&hit) {
                    hits.push(hit);
                }
            }
        }
        hits
    }

    fn is_match(&self, text: &str) -> bool {
        self.patterns.iter().any(|(_, re)| re.is_match(text))
    }
}

/// Compiled hint tables.
pub struct ConflictDetector {
    war: HintSet,
    soviet: HintSet,
    stalin: HintSet,
    thaw: HintSet,
}

impl ConflictDetector {
    pub fn new(patterns: &ConflictPatterns) -> Result<Self, regex::Error> {
        Ok(Self {
            war: HintSet::compile(patterns.war)?,
            soviet: HintSet::compile(patterns.soviet)?,
            stalin: HintSet::compile(patterns.stalin)?,
            thaw: HintSet::compile(patterns.thaw)?,
        })
    }

    /// Detector over the standard tables, compiled once.
    pub fn standard() -> &'static ConflictDetector {
        static DETECTOR: OnceLock<ConflictDetector> = OnceLock::new();
        DETECTOR.get_or_init(|| {
            ConflictDetector::new(&STANDARD_PATTERNS).expect("standard conflict patterns are valid")
        })
    }

    /// Cross-check `mapping` against the record's text.
    ///
    /// Returns `None` when no hint of either family matched.
    pub fn verify(
        &self,
        record: &NormalizedRecord,
        mapping: &DateMapping,
    ) -> Option<VisualVerification> {
        let text = hint_text(record);
        let war_hints = self.war.matches(&text);
        let soviet_hints = self.soviet.matches(&text);
        if war_hints.is_empty() && soviet_hints.is_empty() {
            return None;
        }

        let admitted: Vec<Period> = mapping
            .potential_periods
            .clone()
            .unwrap_or_else(|| vec![mapping.mapped_period]);

        let (suggested_period, reasoning) = if !war_hints.is_empty()
            && admitted.contains(&Period::Wartime)
        {
            (
                Some(Period::Wartime),
                format!("War-related terms ({}) within a wartime date range", war_hints.join(", ")),
            )
        } else if !soviet_hints.is_empty() && admitted.iter().any(|p| SOVIET_PERIODS.contains(p)) {
            let period = self.soviet_sub_period(&text);
            (
                Some(period),
                format!(
                    "Soviet-era terms ({}) suggest {}",
                    soviet_hints.join(", "),
                    period
                ),
            )
        } else {
            (
                None,
                "Textual hints found, but none fits the date range".to_string(),
            )
        };

        let needs_review = suggested_period.is_some_and(|p| p != mapping.mapped_period);
        Some(VisualVerification {
            suggested_period,
            confidence: suggested_period.map(|_| Confidence::Medium),
            war_hints,
            soviet_hints,
            needs_review,
            reasoning,
        })
    }

    fn soviet_sub_period(&self, text: &str) -> Period {
        if self.stalin.is_match(text) {
            Period::StalinistEra
        } else if self.thaw.is_match(text) {
            Period::ThawPeriod
        } else {
            Period::StagnationEra
        }
    }
}

fn hint_text(record: &NormalizedRecord) -> String {
    let RecordText { title, subjects } = RecordText::from_record(record);
    let mut text = title;
    for subject in subjects {
        text.push('\n');
        text.push_str(&subject);
    }
    text
}

/// Attach a verification block to `mapping` when the record carries hints.
pub fn verify(record: &NormalizedRecord, mapping: &mut DateMapping) {
    mapping.visual_verification = ConflictDetector::standard().verify(record, mapping);
}
