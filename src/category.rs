//! Content categorization from title and subject keywords.
//!
//! An ordered cascade of rules over the lowercased title and bilingual
//! subjects; the first rule that matches decides the subject class:
//!
//! 1. festive phrase in the title
//! 2. festive subject keyword
//! 3. portrait keyword, or a "Name, Name, YYYY-YYYY" life-span subject
//! 4. miscellaneous keyword
//! 5. scenery keyword
//! 6. otherwise miscellaneous
//!
//! The medium is decided separately: a record counts as a photograph only
//! when a subject names photographs or photographers. Everything else is
//! treated as drawn.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::{ContentCategory, ContentClass, Medium, NormalizedRecord};

/// Keyword tables driving the cascade. All entries are lowercase.
#[derive(Debug, Clone, Copy)]
pub struct CategoryKeywords {
    pub festive_title: &'static [&'static str],
    pub festive_subjects: &'static [&'static str],
    pub portrait_subjects: &'static [&'static str],
    pub misc_subjects: &'static [&'static str],
    pub scenery_subjects: &'static [&'static str],
    pub photo_subjects: &'static [&'static str],
}

impl Default for CategoryKeywords {
    fn default() -> Self {
        STANDARD_KEYWORDS
    }
}

pub const STANDARD_KEYWORDS: CategoryKeywords = CategoryKeywords {
    festive_title: &[
        "head uut aastat",
        "häid jõule",
        "häid jõulupühi",
        "rõõmsaid jõulupühi",
        "rõõmsaid pühi",
        "häid pühi",
        "head lihavõttepühi",
        "häid lihavõttepühi",
        "palju õnne",
        "merry christmas",
        "happy new year",
        "happy easter",
        "season's greetings",
    ],
    festive_subjects: &[
        "jõulud",
        "jõulukaardid",
        "uusaasta",
        "uus aasta",
        "lihavõtted",
        "lihavõttepühad",
        "õnnitluskaardid",
        "tervituskaardid",
        "pühad",
        "christmas",
        "new year",
        "easter",
        "greeting cards",
        "holidays",
    ],
    portrait_subjects: &[
        "portreed",
        "portree",
        "grupiportreed",
        "inimesed",
        "näitlejad",
        "portraits",
        "portrait",
        "group portraits",
        "people",
        "actors",
    ],
    misc_subjects: &[
        "kunst",
        "maalid",
        "karikatuurid",
        "reklaam",
        "loomad",
        "lilled",
        "art",
        "paintings",
        "caricatures",
        "advertising",
        "animals",
        "flowers",
    ],
    scenery_subjects: &[
        "linnavaated",
        "vaated",
        "maastikud",
        "hooned",
        "kirikud",
        "tänavad",
        "mõisad",
        "sadamad",
        "rannad",
        "townscapes",
        "views",
        "landscapes",
        "buildings",
        "churches",
        "streets",
        "manors",
        "harbours",
        "beaches",
    ],
    photo_subjects: &[
        "fotod",
        "fotograafid",
        "fotograafia",
        "fotopostkaardid",
        "photographs",
        "photographers",
        "photography",
        "snapshots",
    ],
};

/// Lowercased text the cascade looks at.
pub struct RecordText {
    pub title: String,
    pub subjects: Vec<String>,
}

impl RecordText {
    pub fn from_record(record: &NormalizedRecord) -> Self {
        Self {
            title: record.title.to_lowercase(),
            subjects: record.all_subjects().map(str::to_lowercase).collect(),
        }
    }

    fn any_subject(&self, keywords: &[&str]) -> bool {
        self.subjects
            .iter()
            .any(|subject| keywords.iter().any(|kw| contains_term(subject, kw)))
    }
}

/// Whole-word containment, so "art" does not match inside "tartu".
fn contains_term(haystack: &str, term: &str) -> bool {
    if term.is_empty() {
        return false;
    }
    haystack.match_indices(term).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + term.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// One step of the category cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryRule {
    FestiveTitle,
    FestiveSubject,
    Portrait,
    Misc,
    Scenery,
}

impl CategoryRule {
    pub const ORDER: [CategoryRule; 5] = [
        CategoryRule::FestiveTitle,
        CategoryRule::FestiveSubject,
        CategoryRule::Portrait,
        CategoryRule::Misc,
        CategoryRule::Scenery,
    ];

    pub fn class(self) -> ContentClass {
        match self {
            CategoryRule::FestiveTitle | CategoryRule::FestiveSubject => ContentClass::Festive,
            CategoryRule::Portrait => ContentClass::Portrait,
            CategoryRule::Misc => ContentClass::Misc,
            CategoryRule::Scenery => ContentClass::Scenery,
        }
    }

    pub fn matches(self, text: &RecordText, keywords: &CategoryKeywords) -> bool {
        match self {
            CategoryRule::FestiveTitle => keywords
                .festive_title
                .iter()
                .any(|kw| contains_term(&text.title, kw)),
            CategoryRule::FestiveSubject => text.any_subject(keywords.festive_subjects),
            CategoryRule::Portrait => {
                text.any_subject(keywords.portrait_subjects)
                    || text.subjects.iter().any(|s| life_span_regex().is_match(s))
            }
            CategoryRule::Misc => text.any_subject(keywords.misc_subjects),
            CategoryRule::Scenery => text.any_subject(keywords.scenery_subjects),
        }
    }
}

/// "Surname, Forename, 1880-1941" biographical subject headings.
fn life_span_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[^,\d]+,\s*[^,\d]+,\s*\d{4}\s*-\s*\d{4}$")
            .expect("life span pattern is valid")
    })
}

/// Categorize a record with the standard keyword tables.
pub fn categorize(record: &NormalizedRecord) -> ContentCategory {
    categorize_with(record, &STANDARD_KEYWORDS)
}

pub fn categorize_with(record: &NormalizedRecord, keywords: &CategoryKeywords) -> ContentCategory {
    let text = RecordText::from_record(record);
    let class = CategoryRule::ORDER
        .iter()
        .find(|rule| rule.matches(&text, keywords))
        .map(|rule| rule.class())
        .unwrap_or(ContentClass::Misc);
    ContentCategory::new(class, medium(&text, keywords))
}

fn medium(text: &RecordText, keywords: &CategoryKeywords) -> Medium {
    if text.any_subject(keywords.photo_subjects) {
        Medium::Photo
    } else {
        Medium::Drawn
    }
}
