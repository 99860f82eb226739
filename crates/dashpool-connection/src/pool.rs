//! Bounded connection pooling
//!
//! A [`ConnectionPool`] hands out connections created by a
//! [`ConnectionFactory`](dashpool_core::ConnectionFactory), up to a
//! configured maximum. Acquirers beyond that wait in FIFO order and are
//! handed released connections directly. Released connections are
//! health-checked before reuse, and a background sweep can probe idle ones.
//!
//! # Example
//!
//! ```ignore
//! use dashpool_connection::pool::{ConnectionPool, PoolConfig};
//!
//! let config = PoolConfig::new(2, 10)
//!     .with_acquire_timeout_ms(5_000)
//!     .with_health_check_interval_ms(30_000);
//!
//! let pool = ConnectionPool::new(config, factory)?;
//! pool.connect().await?;
//!
//! let conn = pool.acquire().await?;
//! // Use connection...
//! pool.release(conn).await?;
//!
//! pool.close().await?;
//! ```

mod config;
mod connection;
#[allow(clippy::module_inception)]
mod pool;
mod state;
mod stats;
mod sweep;


pub use config::PoolConfig;
pub use connection::{ConnectionInfo, PooledConnection};
pub use pool::ConnectionPool;
pub use state::PoolPhase;
pub use stats::PoolStats;
pub use sweep::SweepReport;
