//! Dashpool Core - Shared abstractions for the connection pool
//!
//! This crate provides the types every other dashpool crate depends on:
//!
//! - `ConnectionFactory` - Trait for the collaborator that opens, closes and
//!   probes connections
//! - `ConnectionTarget` - Opaque connection parameters handed to the factory
//! - `ConnectionId` - Pool-assigned connection identity
//! - `PoolError` - The error taxonomy surfaced by pool operations

mod connection;
mod error;

pub use connection::*;
pub use error::{PoolError, Result};
