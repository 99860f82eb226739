//! Backoff calculator for connection retries
//!
//! Delays start at a fixed value and grow by a multiplier up to a cap.
//! A multiplier of 1.0 yields a constant delay.

use std::time::Duration;

use rand::Rng;

/// Backoff strategy for connection retries.
///
/// Calculates delays that grow with each attempt, up to a configurable
/// maximum. Optional jitter spreads retries of many pools apart.
///
/// # Example
///
/// ```
/// use dashpool_connection::retry::BackoffStrategy;
/// use std::time::Duration;
///
/// let backoff = BackoffStrategy::new(100, 30_000).with_multiplier(2.0);
///
/// assert_eq!(backoff.calculate_delay(0), Duration::from_millis(100));
/// assert_eq!(backoff.calculate_delay(1), Duration::from_millis(200));
///
/// let delay = backoff.calculate_delay(20);
/// assert!(delay <= Duration::from_millis(30_000));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffStrategy {
    /// Delay in milliseconds before the first retry
    initial_ms: u64,
    /// Maximum delay in milliseconds
    max_ms: u64,
    /// Growth factor per attempt (default: 1.0, constant delay)
    multiplier: f64,
    /// Whether to add jitter to delays
    jitter: bool,
}

impl BackoffStrategy {
    /// Create a backoff with the given initial and maximum delays.
    ///
    /// A zero initial delay retries immediately.
    pub fn new(initial_ms: u64, max_ms: u64) -> Self {
        Self {
            initial_ms,
            max_ms: max_ms.max(initial_ms),
            multiplier: 1.0,
            jitter: false,
        }
    }

    /// Constant delay between every attempt.
    pub fn constant(delay_ms: u64) -> Self {
        Self::new(delay_ms, delay_ms)
    }

    /// Set the multiplier for delay growth (clamped to at least 1.0).
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = if multiplier.is_finite() {
            multiplier.max(1.0)
        } else {
            1.0
        };
        self
    }

    /// Enable jitter of up to ±25% of each delay.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Calculate the delay before retry number `attempt` (0 = first retry).
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let delay_ms = (self.initial_ms as f64) * self.multiplier.powi(exponent);
        let capped_ms = delay_ms.min(self.max_ms as f64) as u64;

        let final_ms = if self.jitter && capped_ms > 0 {
            let jitter_range = capped_ms / 4;
            let offset = rand::thread_rng().gen_range(0..=jitter_range * 2);
            capped_ms.saturating_sub(jitter_range).saturating_add(offset)
        } else {
            capped_ms
        };

        Duration::from_millis(final_ms)
    }

    /// Get the initial delay.
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_ms)
    }

    /// Get the maximum delay.
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }

    /// Get the multiplier.
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Check if jitter is enabled.
    pub fn has_jitter(&self) -> bool {
        self.jitter
    }
}

impl Default for BackoffStrategy {
    /// No delay between attempts
    fn default() -> Self {
        Self::constant(0)
    }
}
