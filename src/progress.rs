//! Harvest progress reporting.
//!
//! Reports page-by-page progress during `pcx sync` so users see how far
//! pagination has got. Progress is emitted on **stderr** so stdout remains
//! parseable for scripts.

use std::io::Write;

/// A single progress event for a harvest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HarvestProgressEvent {
    /// A page request is about to be issued (1-based page number).
    Fetching { source: String, page: u64 },
    /// A page arrived: `records` on this page, `total` accumulated so far.
    Fetched {
        source: String,
        page: u64,
        records: u64,
        total: u64,
        expected: Option<u64>,
    },
}

/// Reports harvest progress. Implementations write to stderr (human or JSON).
pub trait HarvestProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the harvester.
    fn report(&self, event: HarvestProgressEvent);
}

/// Human-friendly progress on stderr: "harvest <source>  page 3  1,234 / 5,000 records".
pub struct StderrProgress;

impl HarvestProgressReporter for StderrProgress {
    fn report(&self, event: HarvestProgressEvent) {
        let line = match &event {
            HarvestProgressEvent::Fetching { source, page } => {
                format!("harvest {}  page {}  fetching...\n", source, page)
            }
            HarvestProgressEvent::Fetched {
                source,
                page,
                total,
                expected,
                ..
            } => match expected {
                Some(expected) => format!(
                    "harvest {}  page {}  {} / {} records\n",
                    source,
                    page,
                    format_number(*total),
                    format_number(*expected)
                ),
                None => format!(
                    "harvest {}  page {}  {} records\n",
                    source,
                    page,
                    format_number(*total)
                ),
            },
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl HarvestProgressReporter for JsonProgress {
    fn report(&self, event: HarvestProgressEvent) {
        let obj = match &event {
            HarvestProgressEvent::Fetching { source, page } => serde_json::json!({
                "event": "progress",
                "source": source,
                "phase": "fetching",
                "page": page
            }),
            HarvestProgressEvent::Fetched {
                source,
                page,
                records,
                total,
                expected,
            } => serde_json::json!({
                "event": "progress",
                "source": source,
                "phase": "fetched",
                "page": page,
                "records": records,
                "total": total,
                "expected": expected
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl HarvestProgressReporter for NoProgress {
    fn report(&self, _event: HarvestProgressEvent) {}
}

pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Parse the `--progress` flag. `auto` resolves by TTY detection.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "auto" => Some(Self::default_for_tty()),
            "human" => Some(ProgressMode::Human),
            "json" => Some(ProgressMode::Json),
            "off" => Some(ProgressMode::Off),
            _ => None,
        }
    }

    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode. Caller passes it to the harvester.
    pub fn reporter(&self) -> Box<dyn HarvestProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
