//! Pool bookkeeping protected by the pool lock
//!
//! Nothing in here awaits. Every method runs with the lock held and leaves
//! the counters consistent before returning.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::Instant;

use dashpool_core::ConnectionId;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use super::connection::Slot;
use super::stats::PoolStats;
use crate::health::HealthCheckMetrics;

/// Lifecycle of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolPhase {
    /// Accepting acquires
    Open,
    /// `close()` is waiting for active connections to come back
    Closing,
    /// Terminal; no connections remain
    Closed,
}

impl fmt::Display for PoolPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolPhase::Open => write!(f, "open"),
            PoolPhase::Closing => write!(f, "closing"),
            PoolPhase::Closed => write!(f, "closed"),
        }
    }
}

/// An acquirer parked until a connection is handed to it
pub(super) struct Waiter<C> {
    pub(super) id: u64,
    pub(super) enqueued_at: Instant,
    pub(super) tx: oneshot::Sender<Slot<C>>,
}

pub(super) struct PoolState<C> {
    pub(super) phase: PoolPhase,
    /// Connections ready for reuse, oldest returned first
    pub(super) idle: VecDeque<Slot<C>>,
    /// Checked-out connections and when they were handed out
    pub(super) active: HashMap<ConnectionId, Instant>,
    /// Parked acquirers, served front to back
    pub(super) waiters: VecDeque<Waiter<C>>,
    /// Capacity reserved for connections being created, probed or
    /// destroyed outside the lock
    pub(super) in_transit: usize,
    /// Idle connections lifted out by the health sweep; also in transit
    pub(super) probing: usize,
    next_waiter_id: u64,
    pub(super) total_created: u64,
    pub(super) total_acquired: u64,
    pub(super) total_released: u64,
    pub(super) total_discarded: u64,
    pub(super) health: HealthCheckMetrics,
}

impl<C> PoolState<C> {
    pub(super) fn new() -> Self {
        Self {
            phase: PoolPhase::Open,
            idle: VecDeque::new(),
            active: HashMap::new(),
            waiters: VecDeque::new(),
            in_transit: 0,
            probing: 0,
            next_waiter_id: 0,
            total_created: 0,
            total_acquired: 0,
            total_released: 0,
            total_discarded: 0,
            health: HealthCheckMetrics::new(),
        }
    }

    pub(super) fn is_open(&self) -> bool {
        self.phase == PoolPhase::Open
    }

    /// Connections that exist or are about to
    pub(super) fn committed(&self) -> usize {
        self.idle.len() + self.active.len() + self.in_transit
    }

    /// Room left under `max` after counting in-transit reservations
    pub(super) fn open_slots(&self, max: usize) -> usize {
        max.saturating_sub(self.committed())
    }

    /// Reserve up to `wanted` slots for new connections, returning how many
    /// were reserved.
    pub(super) fn reserve(&mut self, wanted: usize, max: usize) -> usize {
        let granted = wanted.min(self.open_slots(max));
        self.in_transit += granted;
        granted
    }

    /// Give back one reservation.
    pub(super) fn finish_transit(&mut self) {
        debug_assert!(self.in_transit > 0, "in-transit count underflow");
        self.in_transit = self.in_transit.saturating_sub(1);
    }

    /// Record `slot` as handed to a caller.
    pub(super) fn checkout(&mut self, slot: &mut Slot<C>) {
        slot.touch();
        self.active.insert(slot.info.id, Instant::now());
        self.total_acquired += 1;
    }

    /// Pop an idle connection unless someone is already queued for one.
    pub(super) fn take_idle(&mut self) -> Option<Slot<C>> {
        if !self.waiters.is_empty() {
            return None;
        }
        let mut slot = self.idle.pop_front()?;
        self.checkout(&mut slot);
        Some(slot)
    }

    /// Remove `id` from the active set, counting it as released.
    ///
    /// Returns false if the id was not active, leaving state untouched.
    pub(super) fn check_in(&mut self, id: ConnectionId) -> bool {
        if self.active.remove(&id).is_some() {
            self.total_released += 1;
            true
        } else {
            false
        }
    }

    /// Hand `slot` to the oldest live waiter, or park it in the idle set.
    pub(super) fn place(&mut self, mut slot: Slot<C>) {
        while let Some(waiter) = self.waiters.pop_front() {
            let id = slot.info.id;
            slot.touch();
            match waiter.tx.send(slot) {
                Ok(()) => {
                    self.active.insert(id, Instant::now());
                    self.total_acquired += 1;
                    tracing::trace!(
                        connection_id = %id,
                        waited_ms = waiter.enqueued_at.elapsed().as_millis() as u64,
                        "handed connection to waiter"
                    );
                    return;
                }
                // The acquirer went away; try the next one.
                Err(returned) => slot = returned,
            }
        }

        self.idle.push_back(slot);
    }

    pub(super) fn enqueue_waiter(&mut self, tx: oneshot::Sender<Slot<C>>) -> u64 {
        self.next_waiter_id += 1;
        let id = self.next_waiter_id;
        self.waiters.push_back(Waiter {
            id,
            enqueued_at: Instant::now(),
            tx,
        });
        id
    }

    /// Remove waiter `id` from the queue.
    ///
    /// Returns false if it is no longer queued, meaning it was already
    /// served or failed.
    pub(super) fn remove_waiter(&mut self, id: u64) -> bool {
        // A timed-out waiter is usually near the front.
        match self.waiters.iter().position(|waiter| waiter.id == id) {
            Some(index) => {
                self.waiters.remove(index);
                true
            }
            None => false,
        }
    }

    /// Lift idle connection `id` out for a health probe.
    ///
    /// Returns `None` if it is no longer idle.
    pub(super) fn lift_for_probe(&mut self, id: ConnectionId) -> Option<Slot<C>> {
        let index = self.idle.iter().position(|slot| slot.info.id == id)?;
        let slot = self.idle.remove(index)?;
        self.in_transit += 1;
        self.probing += 1;
        Some(slot)
    }

    /// Stop reporting a lifted connection as idle.
    pub(super) fn end_probe(&mut self) {
        debug_assert!(self.probing > 0, "probing count underflow");
        self.probing = self.probing.saturating_sub(1);
    }

    /// Fail every queued acquirer by dropping its sender.
    pub(super) fn close_waiters(&mut self) -> usize {
        let count = self.waiters.len();
        self.waiters.clear();
        count
    }

    /// No connection is checked out or in flight.
    pub(super) fn is_drained(&self) -> bool {
        self.active.is_empty() && self.in_transit == 0
    }

    pub(super) fn stats(&self) -> PoolStats {
        // A connection under a sweep probe is still idle to callers.
        let idle = self.idle.len() + self.probing;
        let active = self.active.len();
        PoolStats {
            total: idle + active,
            idle,
            active,
            validating: self.probing,
            waiting: self.waiters.len(),
            total_created: self.total_created,
            total_acquired: self.total_acquired,
            total_released: self.total_released,
            total_discarded: self.total_discarded,
        }
    }
}

impl<C> fmt::Debug for PoolState<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolState")
            .field("phase", &self.phase)
            .field("idle", &self.idle.len())
            .field("active", &self.active.len())
            .field("waiters", &self.waiters.len())
            .field("in_transit", &self.in_transit)
            .field("probing", &self.probing)
            .finish()
    }
}
