//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.plscope.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".plscope.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Automatic retry policy for the HTTP client.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Politeness delays between requests.
    #[serde(default)]
    pub pacing: PacingConfig,

    /// Collection and aggregation settings.
    #[serde(default)]
    pub aggregation: AggregationConfig,

    /// Result cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Remote API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the open-data API (no trailing slash needed).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_base_url() -> String {
    "https://dadosabertos.camara.leg.br/api/v2".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("plscope/{}", env!("CARGO_PKG_VERSION"))
}

/// Largest accepted value for the backoff settings (one day).
pub const MAX_BACKOFF_SECONDS: f64 = 86_400.0;

/// Retry policy applied by the client before a request is given up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Automatic retries on network errors and retryable statuses.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff factor in seconds; retry `n` waits `factor * 2^(n-1)`.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    /// Upper bound for a single backoff wait.
    #[serde(default = "default_backoff_max")]
    pub backoff_max_seconds: f64,

    /// Statuses that trigger an automatic retry.
    #[serde(default = "default_status_forcelist")]
    pub status_forcelist: Vec<u16>,

    /// Wait used for the manual 429 retry when `Retry-After` is missing.
    #[serde(default = "default_retry_after")]
    pub default_retry_after_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_factor: default_backoff_factor(),
            backoff_max_seconds: default_backoff_max(),
            status_forcelist: default_status_forcelist(),
            default_retry_after_seconds: default_retry_after(),
        }
    }
}

fn default_max_retries() -> u32 {
    5
}

fn default_backoff_factor() -> f64 {
    1.2 // 1.2s, 2.4s, 4.8s...
}

fn default_backoff_max() -> f64 {
    120.0
}

fn default_status_forcelist() -> Vec<u16> {
    vec![429, 500, 502, 503, 504]
}

fn default_retry_after() -> u64 {
    2
}

/// Delays that keep the request rate under the API's limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Pause between consecutive listing pages of the same year.
    #[serde(default = "default_page_delay")]
    pub page_delay_ms: u64,

    /// Number of bills between two batch pauses.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause taken every `batch_size` bills during party resolution.
    #[serde(default = "default_batch_delay")]
    pub batch_delay_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            page_delay_ms: default_page_delay(),
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay(),
        }
    }
}

fn default_page_delay() -> u64 {
    150
}

fn default_batch_size() -> usize {
    25
}

fn default_batch_delay() -> u64 {
    400
}

impl PacingConfig {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}

/// Collection and aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Bills resolved for party counts when not using all records.
    #[serde(default = "default_sample_limit")]
    pub sample_limit: usize,

    /// Records requested per listing page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Proposal type code to collect.
    #[serde(default = "default_bill_type")]
    pub bill_type: String,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            sample_limit: default_sample_limit(),
            page_size: default_page_size(),
            bill_type: default_bill_type(),
        }
    }
}

fn default_sample_limit() -> usize {
    800
}

fn default_page_size() -> u32 {
    100
}

fn default_bill_type() -> String {
    "PL".to_string()
}

/// Result cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of a cached result in seconds.
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl(),
        }
    }
}

fn default_ttl() -> u64 {
    3600
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Rows shown in the sample table.
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,

    /// Width in characters of the longest text bar.
    #[serde(default = "default_bar_width")]
    pub bar_width: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            preview_rows: default_preview_rows(),
            bar_width: default_bar_width(),
        }
    }
}

fn default_preview_rows() -> usize {
    50
}

fn default_bar_width() -> usize {
    40
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Reject values that cannot be turned into durations.
    pub fn validate(&self) -> Result<()> {
        let seconds = [
            ("retry.backoff_factor", self.retry.backoff_factor),
            ("retry.backoff_max_seconds", self.retry.backoff_max_seconds),
        ];

        for (name, value) in seconds {
            if !value.is_finite() || !(0.0..=MAX_BACKOFF_SECONDS).contains(&value) {
                anyhow::bail!(
                    "{} must be between 0 and {} seconds, got {}",
                    name,
                    MAX_BACKOFF_SECONDS,
                    value
                );
            }
        }

        Ok(())
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.plscope.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(CONFIG_FILE_NAME);

        if path.exists() {
            Ok(Some(Self::load(&path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.api_url {
            self.api.base_url = url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.api.timeout_seconds = timeout;
        }
        if let Some(rows) = args.preview_rows {
            self.report.preview_rows = rows;
        }
        if let Some(limit) = args.sample_limit {
            self.aggregation.sample_limit = limit;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
