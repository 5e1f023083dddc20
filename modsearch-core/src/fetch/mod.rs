//! JSON fetcher - bounded-time GET of a remote JSON document
//!
//! The [`JsonFetcher`] trait is the seam between the pipeline and the
//! network. [`HttpFetcher`] is the reqwest implementation used in production;
//! tests swap in a scripted fetcher.
//!
//! Every fetch bypasses caches, fails on non-2xx status, and is bounded by an
//! explicit timeout. When the timeout fires the in-flight request future is
//! dropped, which closes the connection. No retries happen at this layer.

mod lenient;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{Result, SearchError};

pub use lenient::sanitize_json;

/// Trait for fetching and decoding remote JSON documents
#[async_trait]
pub trait JsonFetcher: Send + Sync {
    /// GET `url` and decode the body as JSON, giving up after `timeout`.
    async fn fetch_json(&self, url: &str, timeout: Duration) -> Result<Value>;
}

/// reqwest-backed fetcher
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher that identifies itself with `user_agent`
    pub fn new(user_agent: &str) -> anyhow::Result<Self> {
        use anyhow::Context;

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    async fn fetch_body(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header(CACHE_CONTROL, "no-cache, no-store")
            .header(PRAGMA, "no-cache")
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| transport_error(url, e))
    }
}

#[async_trait]
impl JsonFetcher for HttpFetcher {
    async fn fetch_json(&self, url: &str, timeout: Duration) -> Result<Value> {
        let started = Instant::now();

        // Dropping the inner future on expiry cancels the request.
        let body = match tokio::time::timeout(timeout, self.fetch_body(url)).await {
            Ok(body) => body?,
            Err(_) => {
                debug!("Fetch {} cancelled after {:?}", url, timeout);
                return Err(SearchError::Timeout {
                    url: url.to_string(),
                    timeout_ms: timeout.as_millis(),
                });
            }
        };

        trace!(
            "Fetched {} ({} bytes in {:?})",
            url,
            body.len(),
            started.elapsed()
        );

        parse_json(url, &body)
    }
}

fn transport_error(url: &str, err: reqwest::Error) -> SearchError {
    SearchError::Transport {
        url: url.to_string(),
        message: err.without_url().to_string(),
    }
}

/// Decode a response body, retrying once through [`sanitize_json`]
///
/// The strict parse is the primary path. Only when it fails is the body
/// cleaned of BOM, comments and trailing commas and parsed again.
pub fn parse_json(url: &str, body: &str) -> Result<Value> {
    match serde_json::from_str(body) {
        Ok(value) => Ok(value),
        Err(strict_err) => {
            debug!("Strict JSON parse of {} failed ({}), retrying lenient", url, strict_err);
            serde_json::from_str(&sanitize_json(body)).map_err(|source| {
                SearchError::MalformedJson {
                    url: url.to_string(),
                    source,
                }
            })
        }
    }
}
