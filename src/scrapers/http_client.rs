//! HTTP fetch helpers shared by the scraper and the discovery paths.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use reqwest::redirect::Policy;
use reqwest::{Client, Response};
use tracing::debug;

use super::rate_limiter::DomainLimiter;
use super::ScrapeError;
use crate::config::ScrapeConfig;

/// Read a response body up to `cap` bytes, truncating anything beyond it.
pub async fn read_body_capped(response: Response, cap: usize) -> Result<Vec<u8>, reqwest::Error> {
    let mut body: Vec<u8> = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if body.len() + chunk.len() > cap {
            body.extend_from_slice(&chunk[..cap - body.len()]);
            debug!(cap, "response body truncated at cap");
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Rate-limited HTML page client: brand user agent, one redirect, capped
/// bodies, per-domain pacing.
pub struct PageClient {
    client: Client,
    limiter: Arc<DomainLimiter>,
}

impl PageClient {
    pub fn new(config: &ScrapeConfig) -> Self {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(Policy::limited(1))
            .gzip(true)
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            limiter: Arc::new(DomainLimiter::new(config)),
        }
    }

    /// Fetch a page as text under the domain limiter.
    pub async fn get_text(
        &self,
        url: &str,
        timeout: Duration,
        cap: usize,
    ) -> Result<String, ScrapeError> {
        let _permit = self.limiter.acquire(url).await;

        let response = tokio::time::timeout(timeout, self.client.get(url).send())
            .await
            .map_err(|_| ScrapeError::Fetch(format!("timeout fetching {}", url)))?
            .map_err(|e| ScrapeError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ScrapeError::Status(response.status().as_u16()));
        }

        let body = tokio::time::timeout(timeout, read_body_capped(response, cap))
            .await
            .map_err(|_| ScrapeError::Fetch(format!("timeout reading {}", url)))?
            .map_err(|e| ScrapeError::Fetch(e.to_string()))?;

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}
