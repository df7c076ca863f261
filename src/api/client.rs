//! JSON fetch wrapper with retry, backoff and rate-limit handling.
//!
//! [`ApiClient::fetch`] never fails: every unrecoverable problem becomes a
//! user-visible warning and `None`, so callers carry on with partial data.

use crate::api::transport::{HttpResponse, ReqwestTransport, Transport, TransportError};
use crate::config::{Config, RetryConfig};
use crate::pacing::{Sleeper, TokioSleeper};
use anyhow::{Context, Result};
use serde_json::Value;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a fetch produced no data. Always carries the URL it was for.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("server returned {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: TransportError,
    },
    #[error("invalid JSON from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Statuses whose `Retry-After` header replaces the computed backoff.
const RETRY_AFTER_STATUSES: [u16; 2] = [429, 503];

/// Cap used when the configured one is not a representable duration.
const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(120);

/// Automatic retry policy applied to every request.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_factor: f64,
    pub backoff_max: Duration,
    pub status_forcelist: Vec<u16>,
    /// Wait before the manual 429 retry when `Retry-After` is missing.
    pub default_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_factor: config.backoff_factor,
            backoff_max: Duration::try_from_secs_f64(config.backoff_max_seconds.max(0.0))
                .unwrap_or(DEFAULT_BACKOFF_MAX),
            status_forcelist: config.status_forcelist.clone(),
            default_retry_after: Duration::from_secs(config.default_retry_after_seconds),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `retry` (1-based): `factor * 2^(retry-1)`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31) as i32;
        let secs = (self.backoff_factor * 2f64.powi(exponent)).max(0.0);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(self.backoff_max)
            .min(self.backoff_max)
    }

    pub fn is_retryable(&self, status: u16) -> bool {
        self.status_forcelist.contains(&status)
    }
}

/// Parse a `Retry-After` value given in whole seconds.
pub fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Read-only JSON client for the open-data API.
pub struct ApiClient<T = ReqwestTransport, S = TokioSleeper> {
    base_url: String,
    transport: T,
    sleeper: S,
    policy: RetryPolicy,
    warnings: Mutex<Vec<String>>,
}

impl ApiClient {
    /// Build a client with a real connection pool from the configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport =
            ReqwestTransport::new(&config.api).context("Failed to create HTTP client")?;

        Ok(Self::new(
            &config.api.base_url,
            transport,
            TokioSleeper,
            RetryPolicy::from(&config.retry),
        ))
    }
}

impl<T: Transport, S: Sleeper> ApiClient<T, S> {
    pub fn new(base_url: &str, transport: T, sleeper: S, policy: RetryPolicy) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            sleeper,
            policy,
            warnings: Mutex::new(Vec::new()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The sleeper shared with the components that pace their requests.
    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// Absolute URL for an API path such as `/proposicoes`.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET `path` and decode the body as JSON.
    ///
    /// Returns `None` after recording a warning when the request cannot be
    /// completed; the caller should continue with whatever data it has.
    pub async fn fetch(&self, path: &str, query: &[(String, String)]) -> Option<Value> {
        let url = self.url(path);

        match self.try_fetch(&url, query).await {
            Ok(json) => Some(json),
            Err(e) => {
                let message = match &e {
                    FetchError::Status { url, status } => format!(
                        "Server returned {} for {}. Continuing with partial data.",
                        status, url
                    ),
                    FetchError::Transport { url, source } => {
                        format!("Failed to access {}: {}", url, source)
                    }
                    FetchError::Decode { .. } => format!("Failed to read response: {}", e),
                };
                warn!("{}", message);
                self.record_warning(message);
                None
            }
        }
    }

    /// Warnings recorded and not yet drained.
    pub fn warning_count(&self) -> usize {
        self.warnings.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Drain the warnings recorded so far.
    pub fn take_warnings(&self) -> Vec<String> {
        let mut warnings = self.warnings.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *warnings)
    }

    fn record_warning(&self, message: String) {
        self.warnings
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message);
    }

    async fn try_fetch(&self, url: &str, query: &[(String, String)]) -> Result<Value, FetchError> {
        let mut response = self.send_with_retries(url, query).await?;

        if response.status == 429 {
            let wait = parse_retry_after(response.retry_after.as_deref())
                .unwrap_or(self.policy.default_retry_after);
            info!(
                "Rate limited by {}; waiting {}s before one last try",
                url,
                wait.as_secs()
            );
            self.sleeper.sleep(wait).await;

            response = self
                .transport
                .get(url, query)
                .await
                .map_err(|source| FetchError::Transport {
                    url: url.to_string(),
                    source,
                })?;
        }

        if !response.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status,
            });
        }

        serde_json::from_str(&response.body).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }

    /// Send with automatic retries on network errors and retryable statuses.
    ///
    /// A retryable status that is still failing once retries are exhausted
    /// is returned as a response, not as an error.
    async fn send_with_retries(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<HttpResponse, FetchError> {
        let mut retries = 0;

        loop {
            let wait = match self.transport.get(url, query).await {
                Ok(response)
                    if self.policy.is_retryable(response.status)
                        && retries < self.policy.max_retries =>
                {
                    retries += 1;
                    let hinted = if RETRY_AFTER_STATUSES.contains(&response.status) {
                        parse_retry_after(response.retry_after.as_deref())
                    } else {
                        None
                    };
                    let wait = hinted.unwrap_or_else(|| self.policy.backoff(retries));
                    debug!(
                        "{} returned {}; retry {}/{} in {:.1}s",
                        url,
                        response.status,
                        retries,
                        self.policy.max_retries,
                        wait.as_secs_f64()
                    );
                    wait
                }
                Ok(response) => return Ok(response),
                Err(e) if retries < self.policy.max_retries => {
                    retries += 1;
                    let wait = self.policy.backoff(retries);
                    debug!(
                        "{} failed ({}); retry {}/{} in {:.1}s",
                        url,
                        e,
                        retries,
                        self.policy.max_retries,
                        wait.as_secs_f64()
                    );
                    wait
                }
                Err(source) => {
                    return Err(FetchError::Transport {
                        url: url.to_string(),
                        source,
                    })
                }
            };

            self.sleeper.sleep(wait).await;
        }
    }
}
