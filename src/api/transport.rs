//! Raw HTTP transport.
//!
//! The client's retry logic talks to a [`Transport`] rather than to
//! `reqwest` directly, so scripted transports can stand in for the network.

use crate::config::ApiConfig;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, RETRY_AFTER};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Status, rate-limit hint, and body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Raw `Retry-After` header value, if any.
    pub retry_after: Option<String>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Network-level failure: the request never produced a status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

/// Issues a single GET request. No retries happen at this level.
pub trait Transport {
    fn get(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

/// Transport over a pooled `reqwest` client.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build the connection pool with the fixed identification headers and
    /// the configured timeout.
    pub fn new(config: &ApiConfig) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()?;

        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn get(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
        async move {
            debug!("GET {} {:?}", url, query);

            let response = self.client.get(url).query(query).send().await?;
            let status = response.status().as_u16();
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.text().await?;

            Ok(HttpResponse {
                status,
                retry_after,
                body,
            })
        }
    }
}
