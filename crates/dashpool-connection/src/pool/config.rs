//! Pool configuration types

use std::time::Duration;

use dashpool_core::{ConnectionTarget, PoolError, Result};
use serde::{Deserialize, Serialize};

use crate::retry::{BackoffStrategy, RetryPolicy};

/// Configuration for a connection pool
///
/// Controls pool sizing, timeouts, health probing and connection retries.
/// Field names follow the camelCase keys used in configuration files
/// (`min`, `max`, `acquireTimeout`, ...). Durations are in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PoolConfig {
    /// Where connections are opened; passed through to the factory
    #[serde(flatten)]
    target: ConnectionTarget,
    /// Minimum number of warm connections
    #[serde(rename = "min")]
    min_size: usize,
    /// Hard cap on idle + active connections
    #[serde(rename = "max")]
    max_size: usize,
    /// How long `acquire` waits for a connection once the pool is at capacity
    #[serde(rename = "acquireTimeout")]
    acquire_timeout_ms: u64,
    /// Interval of the idle health sweep; 0 disables it
    #[serde(rename = "healthCheckInterval")]
    health_check_interval_ms: u64,
    /// Upper bound on a single health probe
    #[serde(rename = "healthCheckTimeout")]
    health_check_timeout_ms: u64,
    /// Extra attempts after a failed connection establishment
    retry_attempts: u32,
    /// Delay before the first retry
    #[serde(rename = "retryDelay")]
    retry_delay_ms: u64,
    /// Growth factor applied to the retry delay on each further attempt
    retry_backoff_multiplier: f64,
    /// Cap on the grown retry delay
    #[serde(rename = "retryMaxDelay")]
    retry_max_delay_ms: u64,
    /// Probe connections on release instead of trusting the cached flag
    validate_on_release: bool,
}

impl PoolConfig {
    /// Create a new pool configuration with the given min and max sizes
    ///
    /// The sizes are checked by [`PoolConfig::validate`], which the pool
    /// calls on construction.
    pub fn new(min_size: usize, max_size: usize) -> Self {
        Self {
            target: ConnectionTarget::default(),
            min_size,
            max_size,
            acquire_timeout_ms: 30_000, // 30 seconds default
            health_check_interval_ms: 0,
            health_check_timeout_ms: 5_000,
            retry_attempts: 0,
            retry_delay_ms: 0,
            retry_backoff_multiplier: 1.0,
            retry_max_delay_ms: 30_000,
            validate_on_release: true,
        }
    }

    /// Parse and validate a JSON configuration document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PoolError::config(format!("invalid pool config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a TOML configuration document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| PoolError::config(format!("invalid pool config TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the sizing and timeout constraints
    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(PoolError::config("max must be greater than 0"));
        }
        if self.min_size > self.max_size {
            return Err(PoolError::config(format!(
                "min ({}) cannot exceed max ({})",
                self.min_size, self.max_size
            )));
        }
        if self.health_check_timeout_ms == 0 {
            return Err(PoolError::config(
                "healthCheckTimeout must be greater than 0",
            ));
        }
        if !self.retry_backoff_multiplier.is_finite() || self.retry_backoff_multiplier < 1.0 {
            return Err(PoolError::config(format!(
                "retryBackoffMultiplier must be at least 1.0, got {}",
                self.retry_backoff_multiplier
            )));
        }
        Ok(())
    }

    /// Set the connection target passed to the factory
    pub fn with_target(mut self, target: ConnectionTarget) -> Self {
        self.target = target;
        self
    }

    /// Set the acquire timeout in milliseconds
    pub fn with_acquire_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.acquire_timeout_ms = timeout_ms;
        self
    }

    /// Set the idle health sweep interval in milliseconds (0 disables)
    pub fn with_health_check_interval_ms(mut self, interval_ms: u64) -> Self {
        self.health_check_interval_ms = interval_ms;
        self
    }

    /// Set the per-probe timeout in milliseconds
    pub fn with_health_check_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.health_check_timeout_ms = timeout_ms;
        self
    }

    /// Set how many times a failed connection attempt is retried
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    /// Set the delay between connection attempts in milliseconds
    pub fn with_retry_delay_ms(mut self, delay_ms: u64) -> Self {
        self.retry_delay_ms = delay_ms;
        self
    }

    /// Grow the retry delay by `multiplier` on each further attempt
    pub fn with_retry_backoff(mut self, multiplier: f64, max_delay_ms: u64) -> Self {
        self.retry_backoff_multiplier = multiplier;
        self.retry_max_delay_ms = max_delay_ms;
        self
    }

    /// Trust the cached health flag on release instead of probing
    pub fn with_validate_on_release(mut self, validate: bool) -> Self {
        self.validate_on_release = validate;
        self
    }

    /// Get the connection target
    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    /// Get the minimum pool size
    pub fn min_size(&self) -> usize {
        self.min_size
    }

    /// Get the maximum pool size
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Get the acquire timeout as a Duration
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// Get the sweep interval, or `None` when periodic probing is disabled
    pub fn health_check_interval(&self) -> Option<Duration> {
        (self.health_check_interval_ms > 0)
            .then(|| Duration::from_millis(self.health_check_interval_ms))
    }

    /// Get the per-probe timeout as a Duration
    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_millis(self.health_check_timeout_ms)
    }

    /// Get the number of retries after a failed connection attempt
    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    /// Get the delay before the first retry
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Whether release probes the connection
    pub fn validate_on_release(&self) -> bool {
        self.validate_on_release
    }

    /// The retry policy used for every connection establishment
    pub fn retry_policy(&self) -> RetryPolicy {
        let backoff = BackoffStrategy::new(self.retry_delay_ms, self.retry_max_delay_ms)
            .with_multiplier(self.retry_backoff_multiplier);
        RetryPolicy::new(self.retry_attempts, backoff)
    }
}

impl Default for PoolConfig {
    /// Create a default pool configuration
    ///
    /// Defaults:
    /// - min: 0
    /// - max: 10
    /// - acquireTimeout: 30 seconds
    /// - healthCheckInterval: disabled
    /// - retryAttempts: 0, retryDelay: 0ms
    fn default() -> Self {
        Self::new(0, 10)
    }
}
