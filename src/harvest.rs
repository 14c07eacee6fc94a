//! Paginated, retrying harvest of raw records.
//!
//! Pages are fetched strictly in sequence: each page's continuation token
//! comes from the previous response, so there is nothing to parallelize.
//!
//! # Retry Strategy
//!
//! Each page fetch gets up to `max_retries` attempts:
//! - no response, HTTP 429, 503 or any 5xx → retry after `retry_delay × 2^attempt`
//! - any other HTTP status → fail immediately
//! - embedded provider error or unparseable body → fail immediately
//!
//! The harvest stops when a response carries no continuation token, or
//! when `batch_size` records have been accumulated. A continuation token
//! the provider already handed out aborts the run, since following it
//! would never terminate.

use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::HarvestConfig;
use crate::models::RawRecord;
use crate::oai::{parse_list_records, ProtocolError, RecordPage};
use crate::progress::{HarvestProgressEvent, HarvestProgressReporter, NoProgress};
use crate::source::{FetchError, PageRequest, RecordSource};

#[derive(Debug, Clone)]
pub struct HarvestOptions {
    /// Attempts allowed per page, including the first one.
    pub max_retries: u32,
    /// Base backoff delay.
    pub retry_delay: Duration,
    /// Stop once this many records have been accumulated.
    pub batch_size: Option<usize>,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
            batch_size: None,
        }
    }
}

impl From<&HarvestConfig> for HarvestOptions {
    fn from(config: &HarvestConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
            batch_size: config.batch_size,
        }
    }
}

impl HarvestOptions {
    /// Delay before the retry that follows failed attempt `attempt` (0-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.retry_delay.saturating_mul(1u32 << attempt.min(16))
    }
}

/// A harvest run that could not complete.
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    #[error("harvest failed on page {page} after {attempts} attempt(s): {cause}")]
    Fetch {
        page: u64,
        attempts: u32,
        cause: FetchError,
    },
    #[error("harvest failed on page {page} after {attempts} attempt(s): {cause}")]
    Protocol {
        page: u64,
        attempts: u32,
        cause: ProtocolError,
    },
}

impl HarvestError {
    pub fn page(&self) -> u64 {
        match self {
            HarvestError::Fetch { page, .. } | HarvestError::Protocol { page, .. } => *page,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            HarvestError::Fetch { attempts, .. } | HarvestError::Protocol { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Harvest every record the source lists, following continuation tokens.
pub async fn harvest<S>(source: &S, options: &HarvestOptions) -> Result<Vec<RawRecord>, HarvestError>
where
    S: RecordSource + ?Sized,
{
    harvest_with_progress(source, options, &NoProgress).await
}

pub async fn harvest_with_progress<S>(
    source: &S,
    options: &HarvestOptions,
    progress: &dyn HarvestProgressReporter,
) -> Result<Vec<RawRecord>, HarvestError>
where
    S: RecordSource + ?Sized,
{
    let mut records: Vec<RawRecord> = Vec::new();
    let mut request = PageRequest::Initial;
    let mut seen_tokens: HashSet<String> = HashSet::new();
    let mut page: u64 = 0;

    loop {
        page += 1;
        progress.report(HarvestProgressEvent::Fetching {
            source: source.name().to_string(),
            page,
        });

        let (batch, attempts) = fetch_page_with_retry(source, &request, page, options).await?;
        let RecordPage {
            records: page_records,
            resumption_token,
            complete_list_size,
        } = batch;

        debug!(page, attempts, records = page_records.len(), "page received");
        let page_len = page_records.len() as u64;
        records.extend(page_records);

        progress.report(HarvestProgressEvent::Fetched {
            source: source.name().to_string(),
            page,
            records: page_len,
            total: records.len() as u64,
            expected: complete_list_size.map(|n| n as u64),
        });

        if let Some(limit) = options.batch_size {
            if records.len() >= limit {
                records.truncate(limit);
                info!(page, limit, "batch size reached, stopping harvest");
                break;
            }
        }

        match resumption_token {
            Some(token) => {
                if !seen_tokens.insert(token.clone()) {
                    return Err(HarvestError::Protocol {
                        page,
                        attempts,
                        cause: ProtocolError::Malformed(format!(
                            "repeated resumption token '{}'",
                            token
                        )),
                    });
                }
                request = PageRequest::Resume(token);
            }
            None => break,
        }
    }

    info!(pages = page, records = records.len(), "harvest complete");
    Ok(records)
}

/// Fetch and parse one page. Returns the page and the attempts it took.
async fn fetch_page_with_retry<S>(
    source: &S,
    request: &PageRequest,
    page: u64,
    options: &HarvestOptions,
) -> Result<(RecordPage, u32), HarvestError>
where
    S: RecordSource + ?Sized,
{
    let allowed = options.max_retries.max(1);
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        match source.fetch_page(request).await {
            Ok(body) => {
                return parse_list_records(&body)
                    .map(|parsed| (parsed, attempt))
                    .map_err(|cause| HarvestError::Protocol {
                        page,
                        attempts: attempt,
                        cause,
                    });
            }
            Err(cause) if cause.is_transient() && attempt < allowed => {
                let delay = options.backoff_delay(attempt - 1);
                warn!(
                    page,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %cause,
                    "transient fetch failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(cause) => {
                return Err(HarvestError::Fetch {
                    page,
                    attempts: attempt,
                    cause,
                });
            }
        }
    }
}
