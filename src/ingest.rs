//! Pipeline orchestration.
//!
//! Coordinates the full sync flow: harvest → transform → classify and
//! aggregate → persist. `rebuild` re-runs everything after the harvest
//! from the raw archive of the last sync, so keyword or period table
//! changes can be applied without touching the network.

use anyhow::{bail, Result};
use chrono::Utc;
use tracing::info;

use crate::aggregate::{aggregate, PeriodMappedData};
use crate::config::Config;
use crate::dating::PeriodClassifier;
use crate::harvest::{harvest_with_progress, HarvestOptions};
use crate::models::RawRecord;
use crate::progress::{HarvestProgressReporter, ProgressMode};
use crate::source::{OaiPmhSource, RecordSource};
use crate::store::{self, Manifest, RunOutput};
use crate::transform::{transform_batch, BatchSummary};

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Overrides `harvest.batch_size`.
    pub limit: Option<usize>,
    /// Stop before anything is written.
    pub dry_run: bool,
    pub progress: ProgressMode,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            limit: None,
            dry_run: false,
            progress: ProgressMode::Off,
        }
    }
}

/// Counts from one pipeline run.
#[derive(Debug)]
pub struct SyncReport {
    pub harvested: usize,
    pub summary: BatchSummary,
    pub index: PeriodMappedData,
    /// `None` for dry runs.
    pub manifest: Option<Manifest>,
}

impl SyncReport {
    pub fn print(&self, label: &str) {
        println!("{}{}", label, if self.manifest.is_none() { " (dry-run)" } else { "" });
        println!("  harvested: {}", self.harvested);
        println!("  transformed: {}", self.summary.output);
        println!("  skipped: {}", self.summary.skipped);
        println!("  warnings: {}", self.summary.warnings);
        for period in &self.index.metadata.periods_present {
            let count = self
                .index
                .periods
                .get(period)
                .map_or(0, |b| b.statistics.total_records);
            println!("  {}: {}", period, count);
        }
        println!("  needs review: {}", self.index.metadata.summary.needs_review);
        if let Some(manifest) = &self.manifest {
            println!("  chunks written: {}", manifest.chunk_count);
            println!("  run: {}", manifest.run_id);
        }
        println!("ok");
    }
}

/// `pcx sync`: harvest the configured source and rebuild the output.
pub async fn run_sync(config: &Config, options: &SyncOptions) -> Result<()> {
    let source = OaiPmhSource::new(&config.source)?;
    let reporter = options.progress.reporter();
    let report = sync_from_source(&source, config, options, reporter.as_ref()).await?;
    report.print(&format!("sync {}", source.name()));
    Ok(())
}

pub async fn sync_from_source<S>(
    source: &S,
    config: &Config,
    options: &SyncOptions,
    progress: &dyn HarvestProgressReporter,
) -> Result<SyncReport>
where
    S: RecordSource + ?Sized,
{
    if options.limit == Some(0) {
        bail!("--limit must be >= 1 when set");
    }
    let mut harvest_options = HarvestOptions::from(&config.harvest);
    if options.limit.is_some() {
        harvest_options.batch_size = options.limit;
    }

    let raw = harvest_with_progress(source, &harvest_options, progress).await?;
    process(raw, config, options.dry_run)
}

/// `pcx rebuild`: reclassify the raw archive of the last sync.
pub fn run_rebuild(config: &Config) -> Result<()> {
    let report = rebuild(config)?;
    report.print("rebuild");
    Ok(())
}

pub fn rebuild(config: &Config) -> Result<SyncReport> {
    let raw = store::load_raw_records(&config.output.dir)?;
    info!(records = raw.len(), "loaded raw archive");
    process(raw, config, false)
}

fn process(raw: Vec<RawRecord>, config: &Config, dry_run: bool) -> Result<SyncReport> {
    let outcome = transform_batch(&raw);
    let classifier = PeriodClassifier::new();
    let index = aggregate(&outcome.records, &classifier, Utc::now());

    let manifest = if dry_run {
        None
    } else {
        Some(store::write_run(
            &config.output.dir,
            config.output.chunk_size,
            &RunOutput {
                raw: &raw,
                normalized: &outcome.records,
                index: &index,
            },
        )?)
    };

    Ok(SyncReport {
        harvested: raw.len(),
        summary: outcome.summary,
        index,
        manifest,
    })
}
