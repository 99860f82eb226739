//! Health probing for pooled connections
//!
//! The pool probes connections on release and, when a sweep interval is
//! configured, probes idle connections periodically. Probes go through the
//! factory's `health_check` and are bounded by a timeout; any error or
//! timeout counts as unhealthy.
//!
//! # Example
//!
//! ```ignore
//! use dashpool_connection::health::probe_connection;
//!
//! let outcome = probe_connection(&factory, &conn, Duration::from_secs(5)).await;
//! if !outcome.is_healthy() {
//!     tracing::warn!(%outcome, "connection failed its probe");
//! }
//! ```

mod metrics;
mod probe;


pub use metrics::HealthCheckMetrics;
pub use probe::{ProbeOutcome, probe_connection};
