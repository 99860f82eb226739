//! Dashpool Connection - bounded, health-checked connection pooling
//!
//! This crate owns the pool lifecycle, health probing, connection retries,
//! and the registry of named pools. Connections themselves come from a
//! [`ConnectionFactory`] supplied by the caller.

pub mod health;
pub mod logging;
pub mod pool;
mod registry;
pub mod retry;

pub use dashpool_core::{ConnectionFactory, ConnectionId, ConnectionTarget, PoolError, Result};
pub use health::{HealthCheckMetrics, ProbeOutcome, probe_connection};
pub use logging::{LoggingConfig, init_test_logging};
pub use pool::{
    ConnectionInfo, ConnectionPool, PoolConfig, PoolPhase, PoolStats, PooledConnection,
    SweepReport,
};
pub use registry::PoolRegistry;
pub use retry::{BackoffStrategy, RetryExhausted, RetryPolicy};
