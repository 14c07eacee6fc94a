//! Index statistics overview.
//!
//! Summarizes what the last run produced: record totals, the confidence
//! distribution, review flags and a period × category table. Used by
//! `pcx stats` to check a sync or rebuild looks sane.

use anyhow::Result;
use tracing::warn;

use crate::aggregate::PeriodMappedData;
use crate::config::Config;
use crate::models::ContentCategory;
use crate::progress::format_number;
use crate::store;

/// Run the stats command: read the persisted index and print a summary.
pub fn run_stats(config: &Config) -> Result<()> {
    let dir = &config.output.dir;
    let index = store::load_index(dir)?;
    let manifest = match store::load_manifest(dir) {
        Ok(manifest) => Some(manifest),
        Err(e) => {
            warn!("could not read manifest, archive details omitted: {:#}", e);
            None
        }
    };

    println!("Postcard Periods — Index Stats");
    println!("==============================");
    println!();
    println!("  Output:      {}", dir.display());
    println!(
        "  Generated:   {}",
        index.metadata.generated_at.format("%Y-%m-%d %H:%M")
    );
    if let Some(m) = &manifest {
        println!("  Run:         {}", m.run_id);
        println!(
            "  Archived:    {} raw / {} normalized in {} chunk(s) of {}",
            format_number(m.total_records as u64),
            format_number(m.normalized_records as u64),
            m.chunk_count,
            m.chunk_size
        );
    }
    println!();
    println!(
        "  Records:     {}",
        format_number(index.metadata.total_records as u64)
    );
    let c = &index.metadata.summary.confidence;
    println!(
        "  Confidence:  high {} ({}%), medium {} ({}%), low {} ({}%)",
        c.high,
        percent(c.high, c.total()),
        c.medium,
        percent(c.medium, c.total()),
        c.low,
        percent(c.low, c.total())
    );
    println!("  Review:      {}", index.metadata.summary.needs_review);

    let rows = period_rows(&index);
    if !rows.is_empty() {
        println!();
        println!("  By period:");
        let mut header = format!("  {:<24} {:>6}", "PERIOD", "TOTAL");
        for category in ContentCategory::ALL {
            header.push_str(&format!(" {:>14}", category.as_str()));
        }
        header.push_str(&format!(" {:>7}", "REVIEW"));
        println!("{}", header);
        println!("  {}", "-".repeat(header.len() - 2));
        for row in rows {
            println!("{}", row);
        }
    }

    println!();
    Ok(())
}

/// One table line per period that has records.
fn period_rows(index: &PeriodMappedData) -> Vec<String> {
    index
        .metadata
        .periods_present
        .iter()
        .filter_map(|period| {
            let bucket = index.periods.get(period)?;
            let mut line = format!(
                "  {:<24} {:>6}",
                period.as_str(),
                bucket.statistics.total_records
            );
            for category in ContentCategory::ALL {
                let count = bucket.categories.get(&category).map_or(0, |c| c.count);
                line.push_str(&format!(" {:>14}", count));
            }
            line.push_str(&format!(" {:>7}", bucket.statistics.needs_review));
            Some(line)
        })
        .collect()
}

fn percent(part: usize, total: usize) -> usize {
    if total > 0 {
        part * 100 / total
    } else {
        0
    }
}
