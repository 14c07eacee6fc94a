//! Historical period table and year → period lookup.
//!
//! The table is ordered chronologically. Lookup is a linear scan that
//! returns the first definition whose range contains the year; years no
//! definition contains fall back to the terminal, open-ended period.

use serde::Serialize;

use crate::models::Period;

/// One row of the period table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodDefinition {
    pub period: Period,
    pub start: i32,
    /// Inclusive end year; `None` for the open-ended final period.
    pub end: Option<i32>,
    pub name_et: &'static str,
    pub name_en: &'static str,
}

impl PeriodDefinition {
    pub fn contains(&self, year: i32) -> bool {
        year >= self.start && self.end.map_or(true, |end| year <= end)
    }
}

/// Estonian history from the first picture postcards onwards.
pub const STANDARD_PERIODS: [PeriodDefinition; 12] = [
    PeriodDefinition {
        period: Period::TsaristEra,
        start: 1894,
        end: Some(1917),
        name_et: "Tsaariaeg",
        name_en: "Tsarist era",
    },
    PeriodDefinition {
        period: Period::WarOfIndependence,
        start: 1918,
        end: Some(1920),
        name_et: "Vabadussõda",
        name_en: "War of Independence",
    },
    PeriodDefinition {
        period: Period::EarlyRepublic,
        start: 1921,
        end: Some(1933),
        name_et: "Parlamentaarne vabariik",
        name_en: "Early republic",
    },
    PeriodDefinition {
        period: Period::EraOfSilence,
        start: 1934,
        end: Some(1939),
        name_et: "Vaikiv ajastu",
        name_en: "Era of Silence",
    },
    PeriodDefinition {
        period: Period::FirstSovietOccupation,
        start: 1940,
        end: Some(1940),
        name_et: "Esimene Nõukogude okupatsioon",
        name_en: "First Soviet occupation",
    },
    PeriodDefinition {
        period: Period::Wartime,
        start: 1941,
        end: Some(1944),
        name_et: "Sõjaaeg ja Saksa okupatsioon",
        name_en: "Wartime and German occupation",
    },
    PeriodDefinition {
        period: Period::StalinistEra,
        start: 1945,
        end: Some(1953),
        name_et: "Stalinistlik periood",
        name_en: "Stalinist era",
    },
    PeriodDefinition {
        period: Period::ThawPeriod,
        start: 1954,
        end: Some(1967),
        name_et: "Sula",
        name_en: "Thaw",
    },
    PeriodDefinition {
        period: Period::StagnationEra,
        start: 1968,
        end: Some(1985),
        name_et: "Stagnatsiooniaeg",
        name_en: "Stagnation era",
    },
    PeriodDefinition {
        period: Period::SingingRevolution,
        start: 1986,
        end: Some(1991),
        name_et: "Laulev revolutsioon",
        name_en: "Singing Revolution",
    },
    PeriodDefinition {
        period: Period::RestoredIndependence,
        start: 1992,
        end: Some(2003),
        name_et: "Taasiseseisvunud Eesti",
        name_en: "Restored independence",
    },
    PeriodDefinition {
        period: Period::Contemporary,
        start: 2004,
        end: None,
        name_et: "Tänapäev",
        name_en: "Contemporary",
    },
];

/// Ordered, immutable period table.
///
/// Held by reference so tests can substitute a reduced table.
#[derive(Debug, Clone, Copy)]
pub struct PeriodTable {
    definitions: &'static [PeriodDefinition],
}

impl Default for PeriodTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl PeriodTable {
    pub const fn standard() -> Self {
        Self {
            definitions: &STANDARD_PERIODS,
        }
    }

    /// A custom table. Must be non-empty and chronologically ordered; the
    /// last entry is the fallback period.
    pub const fn new(definitions: &'static [PeriodDefinition]) -> Self {
        Self { definitions }
    }

    pub fn definitions(&self) -> &'static [PeriodDefinition] {
        self.definitions
    }

    pub fn definition(&self, period: Period) -> Option<&'static PeriodDefinition> {
        self.definitions.iter().find(|d| d.period == period)
    }

    /// Terminal open-ended period used for unmatched years.
    pub fn terminal(&self) -> Period {
        self.definitions
            .iter()
            .rev()
            .find(|d| d.end.is_none())
            .or_else(|| self.definitions.last())
            .map(|d| d.period)
            .unwrap_or(Period::Contemporary)
    }

    pub fn lookup(&self, year: i32) -> Option<Period> {
        self.definitions
            .iter()
            .find(|d| d.contains(year))
            .map(|d| d.period)
    }

    /// Period containing `year`, or the terminal period when none does.
    pub fn period_for_year(&self, year: i32) -> Period {
        self.lookup(year).unwrap_or_else(|| self.terminal())
    }

    /// Distinct periods touched by every year in `[start, end]`, in order.
    pub fn periods_in_range(&self, start: i32, end: i32) -> Vec<Period> {
        let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
        let mut out: Vec<Period> = Vec::new();
        for year in lo..=hi {
            let period = self.period_for_year(year);
            if !out.contains(&period) {
                out.push(period);
            }
        }
        out
    }
}
