//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the shared HTTP client with the configured user agent
//! - A randomized courtesy delay before every attempt
//! - Bounded retries for timed-out attempts
//! - Error classification

use crate::config::RequestsConfig;
use rand::Rng;
use reqwest::header::HeaderMap;
use reqwest::Client;
use scraper::Html;
use std::time::Duration;
use thiserror::Error;

/// Attempts made per fetch call before giving up
pub const MAX_ATTEMPTS: u32 = 3;

/// Errors surfaced by the fetcher
///
/// Timed-out attempts are retried internally and only show up as
/// `Exhausted` once the budget is spent.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Gave up on {url} after {attempts} timed out attempts")]
    Exhausted { url: String, attempts: u32 },

    #[error("Request to {url} failed on attempt {attempt}: {source}")]
    Transport {
        url: String,
        attempt: u32,
        #[source]
        source: reqwest::Error,
    },
}

/// Uniform courtesy delay window, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayWindow {
    min_ms: u64,
    max_ms: u64,
}

impl DelayWindow {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min_ms: min_ms.min(max_ms),
            max_ms: min_ms.max(max_ms),
        }
    }

    pub fn from_config(config: &RequestsConfig) -> Self {
        Self::new(config.min_delay_ms, config.max_delay_ms)
    }

    /// A window that never sleeps
    pub fn none() -> Self {
        Self::new(0, 0)
    }

    /// Draws one delay from the window
    pub fn sample(&self) -> Duration {
        if self.min_ms == self.max_ms {
            return Duration::from_millis(self.min_ms);
        }
        let ms = rand::thread_rng().gen_range(self.min_ms..=self.max_ms);
        Duration::from_millis(ms)
    }
}

/// Attempt budget for a single fetch call
#[derive(Debug)]
struct RetryBudget {
    attempts_remaining: u32,
    attempts_made: u32,
    delay: DelayWindow,
}

impl RetryBudget {
    fn new(attempts: u32, delay: DelayWindow) -> Self {
        Self {
            attempts_remaining: attempts,
            attempts_made: 0,
            delay,
        }
    }

    /// Consumes one attempt, returning its 1-based number
    fn next_attempt(&mut self) -> Option<u32> {
        if self.attempts_remaining == 0 {
            return None;
        }
        self.attempts_remaining -= 1;
        self.attempts_made += 1;
        Some(self.attempts_made)
    }
}

/// Builds an HTTP client with proper configuration
///
/// The request timeout applies to each attempt separately. Idle connections
/// are not pooled: a VPN rotation changes the route, and a socket opened
/// before it must not carry requests made after it.
///
/// # Arguments
///
/// * `config` - The request configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &RequestsConfig) -> Result<Client, reqwest::Error> {
    let timeout = Duration::from_millis(config.timeout_ms);

    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(timeout)
        .connect_timeout(timeout)
        .pool_max_idle_per_host(0)
        .gzip(true)
        .brotli(true)
        .build()
}

/// GET with courtesy delays and bounded retries
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | Success (any status) | Parse body, return document |
/// | Timeout | Retry, up to 3 attempts in total |
/// | Any other transport error | Abort immediately |
#[derive(Debug, Clone)]
pub struct RetryingFetcher {
    client: Client,
    delay: DelayWindow,
    max_attempts: u32,
}

impl RetryingFetcher {
    pub fn new(client: Client, delay: DelayWindow) -> Self {
        Self {
            client,
            delay,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    pub fn from_config(config: &RequestsConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(
            build_http_client(config)?,
            DelayWindow::from_config(config),
        ))
    }

    /// The underlying client, shared with logo retrieval
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub async fn fetch(&self, url: &str) -> Result<Html, FetchError> {
        self.fetch_with_headers(url, HeaderMap::new()).await
    }

    pub async fn fetch_with_headers(
        &self,
        url: &str,
        headers: HeaderMap,
    ) -> Result<Html, FetchError> {
        let mut budget = RetryBudget::new(self.max_attempts, self.delay);

        while let Some(attempt) = budget.next_attempt() {
            tokio::time::sleep(budget.delay.sample()).await;

            match self.attempt(url, headers.clone()).await {
                Ok(body) => return Ok(Html::parse_document(&body)),
                Err(e) if e.is_timeout() => {
                    tracing::debug!(
                        "Timed out fetching {} (attempt {}/{})",
                        url,
                        attempt,
                        self.max_attempts
                    );
                }
                Err(source) => {
                    return Err(FetchError::Transport {
                        url: url.to_string(),
                        attempt,
                        source,
                    })
                }
            }
        }

        Err(FetchError::Exhausted {
            url: url.to_string(),
            attempts: self.max_attempts,
        })
    }

    async fn attempt(&self, url: &str, headers: HeaderMap) -> Result<String, reqwest::Error> {
        let response = self.client.get(url).headers(headers).send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("{} answered with status {}", url, status);
        }

        response.text().await
    }
}
