//! Counters for health checking

use std::time::Instant;

/// Metrics for periodic and release-time health checks
#[derive(Debug, Default, Clone)]
pub struct HealthCheckMetrics {
    /// Number of idle sweeps run
    pub cycles_run: u64,
    /// Number of probes issued (sweeps and releases)
    pub connections_checked: u64,
    /// Number of probes that found a connection unhealthy
    pub connections_failed: u64,
    /// Number of connections created to replace evicted ones
    pub replacements_created: u64,
    /// When the last sweep finished
    pub last_sweep: Option<Instant>,
}

impl HealthCheckMetrics {
    /// Create a new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the result of one probe
    pub fn record_probe(&mut self, healthy: bool) {
        self.connections_checked += 1;
        if !healthy {
            self.connections_failed += 1;
        }
    }

    /// Record a finished sweep
    pub fn record_cycle(&mut self) {
        self.cycles_run += 1;
        self.last_sweep = Some(Instant::now());
    }

    /// Record a replacement connection
    pub fn record_replacement(&mut self) {
        self.replacements_created += 1;
    }

    /// Fraction of probes that failed (0.0 to 1.0)
    pub fn failure_rate(&self) -> f64 {
        if self.connections_checked == 0 {
            0.0
        } else {
            self.connections_failed as f64 / self.connections_checked as f64
        }
    }
}
