//! Outbound GET with a flat retry policy.
//!
//! Every non-2xx status and every transport error is retried the same way: wait a fixed
//! delay, try again, give up after `max_attempts`. No backoff growth, no jitter, no
//! distinction between 4xx and 5xx.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use reqwest::{header::HeaderMap, Client, Response};
use serde_json::Value;
use tokio_retry::{strategy::FixedInterval, Retry};
use tracing::{debug, warn};

use crate::blockchain::models::FetchError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    fn delays(&self) -> std::iter::Take<FixedInterval> {
        // one delay between each pair of attempts, none after the last
        FixedInterval::new(self.delay).take(self.max_attempts.max(1) as usize - 1)
    }
}

#[derive(Debug, Clone)]
pub struct ResilientFetcher {
    client: Client,
    policy: RetryPolicy,
}

impl ResilientFetcher {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_client(Client::new(), policy)
    }

    pub fn with_client(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Returns the first successful response.
    pub async fn get(&self, url: &str, headers: &HeaderMap) -> Result<Response, FetchError> {
        let attempts = AtomicU32::new(0);
        let max_attempts = self.policy.max_attempts.max(1);

        let result = Retry::spawn(self.policy.delays(), || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            let request = self.client.get(url).headers(headers.clone());
            async move {
                debug!("GET {} (attempt {}/{})", url, attempt, max_attempts);
                match request.send().await {
                    Ok(resp) if resp.status().is_success() => Ok(resp),
                    Ok(resp) => {
                        let status = resp.status();
                        warn!("GET {} returned {} (attempt {}/{})", url, status, attempt, max_attempts);
                        Err(format!("HTTP {}", status))
                    }
                    Err(e) => {
                        warn!("GET {} failed: {} (attempt {}/{})", url, e, attempt, max_attempts);
                        Err(e.to_string())
                    }
                }
            }
        })
        .await;

        result.map_err(|last_error| FetchError::FetchExhausted {
            attempts: attempts.load(Ordering::SeqCst),
            last_error,
        })
    }

    pub async fn get_json(&self, url: &str, headers: &HeaderMap) -> Result<Value, FetchError> {
        let response = self.get(url, headers).await?;
        response.json::<Value>().await.map_err(|e| FetchError::InvalidBody {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}
