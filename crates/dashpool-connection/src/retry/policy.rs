//! Bounded retry loop

use std::future::Future;

use tracing::{debug, warn};

use super::BackoffStrategy;

/// How many times an operation is retried and how long to wait in between
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 = try once)
    retries: u32,
    backoff: BackoffStrategy,
}

/// Returned when every attempt failed
#[derive(Debug, thiserror::Error)]
#[error("gave up after {attempts} attempt(s): {last_error}")]
pub struct RetryExhausted {
    /// Number of attempts made
    pub attempts: u32,
    /// Error from the final attempt
    #[source]
    pub last_error: anyhow::Error,
}

impl RetryPolicy {
    pub fn new(retries: u32, backoff: BackoffStrategy) -> Self {
        Self { retries, backoff }
    }

    /// Try once, never retry.
    pub fn no_retry() -> Self {
        Self::default()
    }

    /// Get the number of retries after the first attempt
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Total attempts including the first one
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Get the backoff strategy
    pub fn backoff(&self) -> &BackoffStrategy {
        &self.backoff
    }

    /// Run `operation` until it succeeds or the attempts are used up.
    ///
    /// The loop is not cancellable from the pool's side; it always runs to
    /// success or exhaustion before returning.
    pub async fn run<T, F, Fut>(&self, what: &str, mut operation: F) -> Result<T, RetryExhausted>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(what, attempt, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    if attempt >= max_attempts {
                        warn!(what, attempt, max_attempts, error = %error, "giving up");
                        return Err(RetryExhausted {
                            attempts: attempt,
                            last_error: error,
                        });
                    }

                    let delay = self.backoff.calculate_delay(attempt - 1);
                    warn!(
                        what,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "attempt failed, retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }
}
