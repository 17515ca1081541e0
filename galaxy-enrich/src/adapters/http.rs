//! Shared HTTP transport for directory adapters
//!
//! One `reqwest` client (timeout, contact user agent), one token-bucket rate
//! limiter, and bounded exponential-backoff retries for idempotent GETs.

use galaxy_common::config::HttpSettings;
use governor::{Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;

/// Transport errors; adapters turn these into empty results
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("HTTP {0}: {1}")]
    Status(u16, String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Parse error: {0}")]
    Parse(String),
}

impl ClientError {
    /// Worth another attempt (429, 5xx gateway errors, timeouts)
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Timeout | ClientError::RateLimited => true,
            ClientError::Status(code, _) => is_retryable_status(*code),
            ClientError::Network(_) | ClientError::Parse(_) => false,
        }
    }
}

/// Statuses retried for GETs
pub fn is_retryable_status(code: u16) -> bool {
    matches!(code, 429 | 500 | 502 | 503 | 504)
}

/// Delay before retry `attempt` (1-based): `backoff * 2^(attempt-1)`
pub fn backoff_delay(backoff_secs: f64, attempt: u32) -> Duration {
    let factor = 2f64.powi(attempt.saturating_sub(1) as i32);
    Duration::from_secs_f64((backoff_secs * factor).max(0.0))
}

type DirectLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Rate-limited JSON GET client shared by all adapters
pub struct HttpFetcher {
    client: Client,
    rate_limiter: DirectLimiter,
    max_retries: u32,
    backoff_secs: f64,
}

impl HttpFetcher {
    pub fn new(settings: &HttpSettings, contact_email: &str) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(user_agent(contact_email))
            .build()
            .map_err(|e| ClientError::Network(format!("Failed to build HTTP client: {}", e)))?;

        let per_second = NonZeroU32::new(settings.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(per_second));

        Ok(Self {
            client,
            rate_limiter,
            max_retries: settings.max_retries,
            backoff_secs: settings.backoff_secs,
        })
    }

    /// GET `url` and parse the body as JSON
    pub async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, ClientError> {
        self.get_json_with_headers(url, query, &[]).await
    }

    /// GET with extra headers (API keys, `Accept` overrides)
    pub async fn get_json_with_headers(
        &self,
        url: &str,
        query: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<Value, ClientError> {
        let mut attempt = 0;
        loop {
            match self.send_once(url, query, headers).await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::debug!(url, attempt, "Request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = backoff_delay(self.backoff_secs, attempt);
                    tracing::warn!(
                        url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient HTTP failure, will retry after backoff"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(
        &self,
        url: &str,
        query: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<Value, ClientError> {
        self.rate_limiter.until_ready().await;

        let mut request = self
            .client
            .get(url)
            .query(query)
            .header(reqwest::header::ACCEPT, "application/json");
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        tracing::debug!(url, "GET");
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ClientError::Timeout
            } else {
                ClientError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ClientError::RateLimited);
        }
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("error").to_string();
            return Err(ClientError::Status(status.as_u16(), reason));
        }

        response.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                ClientError::Timeout
            } else {
                ClientError::Parse(e.to_string())
            }
        })
    }
}

/// `Galaxy/1.0 (mailto:…)`, as polite-pool APIs ask for
pub fn user_agent(contact_email: &str) -> String {
    format!("Galaxy/1.0 (mailto:{})", contact_email)
}

/// Log a failed directory call and substitute an empty result
pub(crate) fn or_empty<T: Default>(result: Result<T, ClientError>, directory: &str, operation: &str) -> T {
    match result {
        Ok(value) => value,
        Err(ClientError::Status(404, _)) => {
            tracing::debug!(directory, operation, "Not found");
            T::default()
        }
        Err(e) => {
            tracing::warn!(directory, operation, error = %e, "Directory unavailable, continuing without it");
            T::default()
        }
    }
}
