//! Bounded retries with capped exponential backoff

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::{FetchError, FetchResult};
use crate::crawler::shutdown::Shutdown;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Per-task retry bookkeeping, discarded once the task finishes
#[derive(Debug, Default)]
pub struct RetryState {
    pub attempts: u32,
    pub last_error: Option<FetchError>,
}

/// Retry policy applied around each fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            base_delay: Duration::from_millis(config.retry_delay_ms),
            max_delay: Duration::from_millis(config.max_retry_delay_ms),
        }
    }

    /// Delay before attempt `attempt + 1`: `base * 2^(attempt - 1)`, capped
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// Runs `attempt_fn` until it succeeds, fails definitively, or runs out of attempts
    ///
    /// Cancellation observed before a retry ends the loop with the most
    /// recent failure. The returned result's `attempts` counts every call.
    pub async fn run<F, Fut>(&self, url: &Url, shutdown: &Shutdown, mut attempt_fn: F) -> FetchResult
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = FetchResult>,
    {
        let mut state = RetryState::default();

        loop {
            state.attempts += 1;
            let mut result = attempt_fn().await;
            result.attempts = state.attempts;

            let Some(error) = result.error.clone() else {
                return result;
            };

            if !error.is_retryable() {
                debug!(url = %url, kind = %error.kind, "Failure is not retryable");
                return result;
            }
            if state.attempts >= self.max_attempts {
                warn!(url = %url, attempts = state.attempts, error = %error, "Giving up");
                return result;
            }

            let delay = self.backoff(state.attempts);
            warn!(
                url = %url,
                attempt = state.attempts,
                kind = %error.kind,
                delay_ms = delay.as_millis() as u64,
                "Attempt failed, retrying"
            );
            state.last_error = Some(error);

            if shutdown.is_cancelled() {
                return result;
            }
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.cancelled() => {
                    debug!(url = %url, "Cancelled during backoff");
                    return result;
                }
            }
        }
    }
}
