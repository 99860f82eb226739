//! Pool statistics types

use serde::{Deserialize, Serialize};

/// Snapshot of a connection pool's state
///
/// Taken under the pool lock, so `total == idle + active` and
/// `total_acquired - total_released == active` hold for every snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStats {
    /// Total number of connections (idle + active)
    pub total: usize,
    /// Number of idle connections available in the pool
    pub idle: usize,
    /// Number of connections currently checked out
    pub active: usize,
    /// Idle connections being probed by the health sweep, included in `idle`
    #[serde(default)]
    pub validating: usize,
    /// Number of acquirers queued for a connection
    pub waiting: usize,
    /// Connections successfully created by the factory
    pub total_created: u64,
    /// Connections handed to callers
    pub total_acquired: u64,
    /// Connections returned by callers
    pub total_released: u64,
    /// Connections evicted as unhealthy
    pub total_discarded: u64,
}

impl PoolStats {
    /// Calculate pool utilization as a fraction (0.0 to 1.0)
    ///
    /// Returns 0.0 if total is 0 to avoid division by zero.
    pub fn utilization(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.active as f64 / self.total as f64
        }
    }

    /// Check if every open connection is checked out
    pub fn is_full(&self) -> bool {
        self.idle == 0 && self.total > 0
    }

    /// Connections currently out with callers according to the counters
    pub fn outstanding(&self) -> u64 {
        self.total_acquired.saturating_sub(self.total_released)
    }
}
