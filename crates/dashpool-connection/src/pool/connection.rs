//! Pooled connection handle and per-connection metadata

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Weak;
use std::time::Instant;

use dashpool_core::{ConnectionFactory, ConnectionId};

use super::pool::PoolInner;

/// Metadata the pool keeps for every connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// Pool-assigned identity
    pub id: ConnectionId,
    /// When the factory created the connection
    pub created_at: Instant,
    /// When the connection was last handed to a caller
    pub last_used_at: Instant,
    /// Result of the most recent health probe
    pub healthy: bool,
}

/// A connection together with its metadata, as stored in the idle set
pub(super) struct Slot<C> {
    pub(super) info: ConnectionInfo,
    pub(super) conn: C,
}

impl<C> Slot<C> {
    pub(super) fn new(id: ConnectionId, conn: C) -> Self {
        let now = Instant::now();
        Self {
            info: ConnectionInfo {
                id,
                created_at: now,
                last_used_at: now,
                healthy: true,
            },
            conn,
        }
    }

    pub(super) fn touch(&mut self) {
        self.info.last_used_at = Instant::now();
    }
}

/// A connection checked out of a pool
///
/// Return it with [`ConnectionPool::release`](super::ConnectionPool::release).
/// A handle dropped without being released is reclaimed by its pool: the
/// release path runs on the current tokio runtime, or the connection is
/// discarded when no runtime is available.
pub struct PooledConnection<F: ConnectionFactory> {
    slot: Option<Slot<F::Connection>>,
    pool: Weak<PoolInner<F>>,
    pool_id: u64,
}

impl<F: ConnectionFactory> PooledConnection<F> {
    pub(super) fn new(slot: Slot<F::Connection>, pool: Weak<PoolInner<F>>, pool_id: u64) -> Self {
        Self {
            slot: Some(slot),
            pool,
            pool_id,
        }
    }

    // The slot is only taken by `release` and `Drop`, and both consume the
    // handle, so every reachable accessor finds it present.
    const PRESENT: &'static str = "pooled connection accessed after release";

    fn slot(&self) -> &Slot<F::Connection> {
        self.slot.as_ref().expect(Self::PRESENT)
    }

    fn slot_mut(&mut self) -> &mut Slot<F::Connection> {
        self.slot.as_mut().expect(Self::PRESENT)
    }

    pub(super) fn probe_target(&mut self) -> Option<&mut Slot<F::Connection>> {
        self.slot.as_mut()
    }

    pub(super) fn take_slot(&mut self) -> Option<Slot<F::Connection>> {
        self.slot.take()
    }

    pub(super) fn pool_id(&self) -> u64 {
        self.pool_id
    }

    /// Get the connection's pool-assigned id
    pub fn id(&self) -> ConnectionId {
        self.slot().info.id
    }

    /// Get a copy of the connection's metadata
    pub fn info(&self) -> ConnectionInfo {
        self.slot().info
    }

    pub fn created_at(&self) -> Instant {
        self.slot().info.created_at
    }

    pub fn last_used_at(&self) -> Instant {
        self.slot().info.last_used_at
    }

    /// Result of the most recent health probe on this connection
    pub fn is_healthy(&self) -> bool {
        self.slot().info.healthy
    }

    /// Get the factory payload
    pub fn connection(&self) -> &F::Connection {
        &self.slot().conn
    }
}

impl<F: ConnectionFactory> Deref for PooledConnection<F> {
    type Target = F::Connection;

    fn deref(&self) -> &Self::Target {
        &self.slot().conn
    }
}

impl<F: ConnectionFactory> DerefMut for PooledConnection<F> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.slot_mut().conn
    }
}

impl<F: ConnectionFactory> Drop for PooledConnection<F> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            match self.pool.upgrade() {
                Some(pool) => pool.reclaim_dropped(slot),
                None => {
                    tracing::debug!(connection_id = %slot.info.id, "pool gone, dropping connection");
                }
            }
        }
    }
}

impl<F: ConnectionFactory> fmt::Debug for PooledConnection<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("info", &self.slot.as_ref().map(|slot| slot.info))
            .field("pool_id", &self.pool_id)
            .finish()
    }
}
