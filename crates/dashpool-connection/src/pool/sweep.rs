//! Periodic idle health sweep

use std::sync::{Arc, Weak};
use std::time::Duration;

use dashpool_core::{ConnectionFactory, ConnectionId};
use serde::Serialize;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

use super::pool::PoolInner;
use super::state::PoolPhase;

/// Result of one pass over the idle set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    /// Idle connections probed
    pub checked: usize,
    /// Connections destroyed after failing their probe
    pub evicted: usize,
    /// Connections created to restore the minimum size
    pub replaced: usize,
}

/// Sweep loop run on its own task while the pool is alive and open.
pub(super) async fn run_sweeper<F: ConnectionFactory>(pool: Weak<PoolInner<F>>, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let Some(inner) = pool.upgrade() else {
            return;
        };
        if inner.phase() != PoolPhase::Open {
            return;
        }

        let report = inner.sweep_idle().await;
        if report.evicted > 0 {
            info!(
                pool = %inner.name(),
                checked = report.checked,
                evicted = report.evicted,
                replaced = report.replaced,
                "health sweep evicted connections"
            );
        }
    }
}

impl<F: ConnectionFactory> PoolInner<F> {
    /// Probe the idle connections one at a time, destroy failures, and top
    /// up to `min`.
    ///
    /// Only the connection under probe leaves the idle set, and it still
    /// counts as idle in stats. The sweep stops early, returning that
    /// connection unprobed, as soon as an acquirer has to wait.
    pub(super) async fn sweep_idle(self: &Arc<Self>) -> SweepReport {
        let candidates: Vec<ConnectionId> = {
            let state = self.state().lock();
            if !state.is_open() {
                return SweepReport::default();
            }
            state.idle.iter().map(|slot| slot.info.id).collect()
        };

        let mut checked = 0;
        let mut evicted = 0;
        for id in candidates {
            let demand = self.demand().notified();
            tokio::pin!(demand);
            let _ = demand.as_mut().enable();

            let lifted = {
                let mut state = self.state().lock();
                if !state.is_open() || !state.waiters.is_empty() {
                    break;
                }
                state.lift_for_probe(id)
            };
            // Taken by an acquirer since the sweep started.
            let Some(mut slot) = lifted else {
                continue;
            };

            let probed = tokio::select! {
                healthy = self.probe_slot(&mut slot) => Some(healthy),
                _ = demand.as_mut() => None,
            };

            if probed == Some(false) {
                debug!(pool = %self.name(), connection_id = %slot.info.id, "evicting idle connection");
                self.state().lock().end_probe();
                self.destroy(slot).await;
                self.finish_discard();
                checked += 1;
                evicted += 1;
                continue;
            }

            let leftover = {
                let mut state = self.state().lock();
                state.end_probe();
                if state.is_open() {
                    state.finish_transit();
                    state.place(slot);
                    None
                } else {
                    Some(slot)
                }
            };
            if let Some(slot) = leftover {
                self.destroy(slot).await;
                self.finish_transit();
            }

            if probed.is_none() {
                debug!(pool = %self.name(), "acquirer waiting, pausing health sweep");
                break;
            }
            checked += 1;
        }

        let replaced = self.top_up_min().await;
        if evicted > 0 {
            self.replenish_waiters();
        }

        self.state().lock().health.record_cycle();

        SweepReport {
            checked,
            evicted,
            replaced,
        }
    }
}
