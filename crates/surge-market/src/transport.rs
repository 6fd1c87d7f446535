//! HTTP transport seam.
//!
//! The retry loop in `client.rs` is written against this trait so tests
//! can script status sequences without a network.

use crate::error::{MarketError, MarketResult};
use async_trait::async_trait;
use std::time::Duration;

/// Minimal view of an HTTP response: status code plus raw body.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Transient failures worth retrying: 429 and any 5xx.
    pub fn is_retryable(&self) -> bool {
        self.status == 429 || (500..600).contains(&self.status)
    }
}

/// Async HTTP GET transport.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str) -> MarketResult<HttpResponse>;
}

/// Production transport backed by reqwest.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> MarketResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MarketError::ClientBuild(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> MarketResult<HttpResponse> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                MarketError::Timeout
            } else {
                MarketError::Transport(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| MarketError::Transport(e.to_string()))?;

        Ok(HttpResponse { status, body })
    }
}
