//! Remote record source abstraction and the OAI-PMH implementation.
//!
//! The harvester only knows the [`RecordSource`] trait: given a
//! [`PageRequest`] it returns the raw response body, or a [`FetchError`]
//! describing why no usable body arrived. Parsing the body (including
//! detection of embedded error documents) happens in [`crate::oai`].
//!
//! # Configuration
//!
//! ```toml
//! [source]
//! base_url = "https://example.org/oai"
//! set = "postcards"
//! metadata_prefix = "edm"
//! timeout_secs = 30
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use tracing::debug;

use crate::config::SourceConfig;

/// Which page to request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRequest {
    /// First page: fixed set and metadata-format selectors.
    Initial,
    /// Any later page: only the continuation token from the previous response.
    Resume(String),
}

/// Transport-level failure to obtain a response body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// No response was received at all (connect error, timeout, broken body).
    #[error("no response from record source: {0}")]
    Transport(String),
    /// The source answered with a non-success HTTP status.
    #[error("record source returned HTTP {0}")]
    Status(u16),
}

impl FetchError {
    /// Whether retrying the same request could plausibly succeed.
    ///
    /// - no response → retry
    /// - HTTP 429, 503 and any other 5xx → retry
    /// - anything else (4xx) → fail immediately
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport(_) => true,
            FetchError::Status(code) => *code == 429 || *code == 503 || (500..600).contains(code),
        }
    }
}

/// A paginated record listing.
///
/// Implement this to harvest from something other than an OAI-PMH
/// endpoint (tests use an in-memory implementation).
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Short label used in logs and progress output.
    fn name(&self) -> &str;

    /// Fetch one page and return its body unparsed.
    async fn fetch_page(&self, request: &PageRequest) -> Result<String, FetchError>;
}

const DEFAULT_USER_AGENT: &str = concat!("pcx/", env!("CARGO_PKG_VERSION"));

/// OAI-PMH `ListRecords` over HTTP.
pub struct OaiPmhSource {
    client: Client,
    base_url: String,
    set: String,
    metadata_prefix: String,
}

impl OaiPmhSource {
    pub fn new(config: &SourceConfig) -> anyhow::Result<Self> {
        let user_agent = config.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
        let mut headers = header::HeaderMap::new();
        headers.insert(header::USER_AGENT, header::HeaderValue::from_str(user_agent)?);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            set: config.set.clone(),
            metadata_prefix: config.metadata_prefix.clone(),
        })
    }

    fn query(&self, request: &PageRequest) -> Vec<(&'static str, String)> {
        match request {
            PageRequest::Initial => vec![
                ("verb", "ListRecords".to_string()),
                ("set", self.set.clone()),
                ("metadataPrefix", self.metadata_prefix.clone()),
            ],
            PageRequest::Resume(token) => vec![
                ("verb", "ListRecords".to_string()),
                ("resumptionToken", token.clone()),
            ],
        }
    }
}

#[async_trait]
impl RecordSource for OaiPmhSource {
    fn name(&self) -> &str {
        &self.base_url
    }

    async fn fetch_page(&self, request: &PageRequest) -> Result<String, FetchError> {
        let query = self.query(request);
        debug!(url = %self.base_url, ?request, "requesting page");

        let response = self
            .client
            .get(&self.base_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))
    }
}
