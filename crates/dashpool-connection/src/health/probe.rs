//! Single connection probe
//!
//! Wraps the factory's health check with a timeout and classifies the result.

use std::fmt;
use std::time::{Duration, Instant};

use dashpool_core::ConnectionFactory;

/// Result of probing one connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The factory reported the connection usable
    Healthy { latency: Duration },
    /// The factory reported the connection unusable
    Unhealthy,
    /// The probe itself returned an error
    Failed(String),
    /// The probe did not answer in time
    TimedOut,
}

impl ProbeOutcome {
    /// Only `Healthy` keeps a connection in circulation.
    pub fn is_healthy(&self) -> bool {
        matches!(self, ProbeOutcome::Healthy { .. })
    }

    /// Round-trip time of a successful probe
    pub fn latency(&self) -> Option<Duration> {
        match self {
            ProbeOutcome::Healthy { latency } => Some(*latency),
            _ => None,
        }
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Healthy { latency } => write!(f, "healthy ({:?})", latency),
            ProbeOutcome::Unhealthy => write!(f, "unhealthy"),
            ProbeOutcome::Failed(msg) => write!(f, "probe failed: {}", msg),
            ProbeOutcome::TimedOut => write!(f, "probe timed out"),
        }
    }
}

/// Probe `conn` through `factory`, giving up after `timeout`.
///
/// Never fails: errors and timeouts are folded into the outcome.
pub async fn probe_connection<F: ConnectionFactory>(
    factory: &F,
    conn: &F::Connection,
    timeout: Duration,
) -> ProbeOutcome {
    let start = Instant::now();

    match tokio::time::timeout(timeout, factory.health_check(conn)).await {
        Ok(Ok(true)) => ProbeOutcome::Healthy {
            latency: start.elapsed(),
        },
        Ok(Ok(false)) => ProbeOutcome::Unhealthy,
        Ok(Err(e)) => ProbeOutcome::Failed(e.to_string()),
        Err(_) => ProbeOutcome::TimedOut,
    }
}
