//! Bounded retry with exponential backoff for provider calls.

use crate::provider::error::ProviderError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry policy applied around each backend invocation.
///
/// Only transient classifications are retried; everything else surfaces on
/// the first occurrence. The backoff delay doubles per attempt up to
/// `max_delay`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first (3 means up to 2 retries).
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Backoff before the retry following `attempt` (1-based).
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << (attempt - 1).min(16);
        self.base_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }

    /// Run `operation` under this policy.
    ///
    /// `label` identifies the backend in log output. Retries preserve call
    /// ordering: each attempt fully resolves before the next begins.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_transient() && attempt < self.max_attempts => {
                    let delay = self.backoff(attempt);
                    warn!(
                        backend = label,
                        attempt,
                        error = %error,
                        delay_ms = delay.as_millis() as u64,
                        "transient backend error, will retry"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
