//! Error types for pool operations

use std::time::Duration;

use thiserror::Error;

use crate::ConnectionId;

/// Error type for connection pool operations
#[derive(Error, Debug)]
pub enum PoolError {
    /// The pool configuration is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// The factory could not establish a connection
    #[error("Connection error after {attempts} attempt(s): {source}")]
    Connection {
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },

    /// No connection became available before the acquire deadline
    #[error("Timed out waiting for connection (timeout: {0:?})")]
    AcquireTimeout(Duration),

    /// A handle that is not active in this pool was released
    #[error("Connection {0} is not active in this pool")]
    InvalidConnection(ConnectionId),

    /// The pool is closing or closed
    #[error("Pool is closed")]
    PoolClosed,
}

impl PoolError {
    /// Build a configuration error from any message.
    pub fn config(message: impl Into<String>) -> Self {
        PoolError::Config(message.into())
    }

    /// Whether the same request may succeed if retried later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PoolError::AcquireTimeout(_) | PoolError::Connection { .. }
        )
    }
}

/// Result type alias for pool operations
pub type Result<T> = std::result::Result<T, PoolError>;
