//! Exponential backoff for HTTP fetches.

use std::future::Future;
use std::time::Duration;

use crate::error::{Error, Result};

/// How often and how patiently a fetch is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay after the first failure.
    pub initial_backoff: Duration,
    /// Upper bound for the doubling delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(16),
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub const NONE: Self = Self {
        max_attempts: 1,
        initial_backoff: Duration::ZERO,
        max_backoff: Duration::ZERO,
    };

    /// Delay before attempt `failed_attempt + 1`.
    #[must_use]
    pub fn backoff(&self, failed_attempt: u32) -> Duration {
        let factor = 1u32 << failed_attempt.saturating_sub(1).min(31);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempts are used up.
    ///
    /// The final retryable failure is wrapped in [`Error::RetryExhausted`].
    pub async fn run<T, F, Fut>(&self, url: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt >= self.max_attempts => {
                    tracing::warn!("Gave up on {} after {} attempts: {}", url, attempt, e);
                    return Err(Error::RetryExhausted {
                        url: url.to_owned(),
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    let delay = self.backoff(attempt);
                    tracing::warn!("Retrying {} in {:?} ({}): {}", url, delay, attempt, e);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
