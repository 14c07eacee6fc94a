use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(default)]
    pub harvest: HarvestConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub base_url: String,
    #[serde(default = "default_set")]
    pub set: String,
    #[serde(default = "default_metadata_prefix")]
    pub metadata_prefix: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_set() -> String {
    "postcards".to_string()
}
fn default_metadata_prefix() -> String {
    "edm".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct HarvestConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default)]
    pub batch_size: Option<usize>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            batch_size: None,
        }
    }
}

impl HarvestConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub dir: PathBuf,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_chunk_size() -> usize {
    100
}

impl Config {
    /// Defaults for commands that never touch the network.
    pub fn minimal() -> Self {
        Self {
            source: SourceConfig {
                base_url: "http://localhost/oai".to_string(),
                set: default_set(),
                metadata_prefix: default_metadata_prefix(),
                timeout_secs: default_timeout_secs(),
                user_agent: None,
            },
            harvest: HarvestConfig::default(),
            output: OutputConfig {
                dir: PathBuf::from("./data"),
                chunk_size: default_chunk_size(),
            },
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    let url = config.source.base_url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        anyhow::bail!("source.base_url must be an http(s) URL, got '{}'", url);
    }
    if config.source.set.trim().is_empty() {
        anyhow::bail!("source.set must not be empty");
    }
    if config.source.metadata_prefix.trim().is_empty() {
        anyhow::bail!("source.metadata_prefix must not be empty");
    }
    if config.source.timeout_secs == 0 {
        anyhow::bail!("source.timeout_secs must be > 0");
    }

    if config.harvest.max_retries == 0 {
        anyhow::bail!("harvest.max_retries must be >= 1");
    }
    if config.harvest.batch_size == Some(0) {
        anyhow::bail!("harvest.batch_size must be >= 1 when set");
    }

    if config.output.chunk_size == 0 {
        anyhow::bail!("output.chunk_size must be >= 1");
    }

    Ok(())
}
