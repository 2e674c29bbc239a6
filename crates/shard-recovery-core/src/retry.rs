//! Bounded retries for coordination service I/O.
//!
//! Delays start at the initial backoff and double per retry up to the
//! maximum. Only transient errors are retried; everything else is returned
//! on first occurrence.

use std::future::Future;
use std::time::Duration;

use prometheus::IntCounter;
use tracing::warn;

use crate::config::RetryConfig;
use crate::error::CoordinationResult;

/// Retry schedule for coordination requests.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
    retries: Option<IntCounter>,
}

impl RetryPolicy {
    /// Create a policy making at most `max_attempts` attempts (at least one).
    #[must_use]
    pub fn new(max_attempts: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            max_backoff: max_backoff.max(initial_backoff),
            retries: None,
        }
    }

    #[must_use]
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            config.initial_backoff(),
            config.max_backoff(),
        )
    }

    /// A policy that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Count every retry into `counter`.
    #[must_use]
    pub fn with_counter(mut self, counter: IntCounter) -> Self {
        self.retries = Some(counter);
        self
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before retry number `retry` (zero-based).
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .map_or(self.max_backoff, |delay| delay.min(self.max_backoff))
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// # Errors
    ///
    /// Returns the first non-transient error, or the last transient error once
    /// every attempt has been used.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> CoordinationResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = CoordinationResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt - 1);
                    warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "coordination request failed, retrying"
                    );
                    if let Some(counter) = &self.retries {
                        counter.inc();
                    }
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
