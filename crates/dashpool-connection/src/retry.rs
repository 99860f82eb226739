//! Retry with backoff for connection establishment
//!
//! Every connection the pool opens (pre-warming, lazy creation on acquire,
//! replacements after eviction) goes through a [`RetryPolicy`].
//!
//! # Example
//!
//! ```
//! use dashpool_connection::retry::{BackoffStrategy, RetryPolicy};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new(3, BackoffStrategy::new(100, 1_000));
//! assert_eq!(policy.max_attempts(), 4);
//! assert_eq!(policy.backoff().calculate_delay(0), Duration::from_millis(100));
//! ```

mod backoff;
mod policy;

#[cfg(test)]
mod tests;

pub use backoff::BackoffStrategy;
pub use policy::{RetryExhausted, RetryPolicy};
