// src/scrape/fetcher.rs
//! Rate-limited page fetching. One shared client, one global semaphore, one
//! politeness delay before every request. Failures are soft: the caller logs
//! and skips the URL, the job keeps going.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::article::RawPage;
use crate::config::FetchConfig;
use crate::error::ScrapeError;

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a page body. `Err` is a soft failure; no retry is performed
    /// here, but a retrying wrapper can implement the same trait without
    /// touching any caller.
    async fn fetch(&self, url: &str) -> Result<RawPage, ScrapeError>;
}

pub struct HttpFetcher {
    http: reqwest::Client,
    limiter: Arc<Semaphore>,
    delay: Duration,
}

impl HttpFetcher {
    pub fn new(cfg: &FetchConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            http,
            limiter: Arc::new(Semaphore::new(cfg.max_concurrent_requests)),
            delay: Duration::from_millis(cfg.request_delay_ms),
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<RawPage, ScrapeError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|e| ScrapeError::network(url, e))?;

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ScrapeError::network(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ScrapeError::network(url, format!("HTTP {status}")));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| ScrapeError::network(url, e))?;
        debug!(%url, bytes = body.len(), "fetched page");

        Ok(RawPage {
            url: url.to_string(),
            body,
            fetched_at: Utc::now(),
        })
    }
}
