//! Shared fixtures for pool integration tests

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashpool_connection::{ConnectionFactory, ConnectionPool, ConnectionTarget, PoolConfig};
use parking_lot::Mutex;

/// Connection handed out by [`ScriptedFactory`]
#[derive(Debug)]
pub struct FakeConn {
    pub serial: u64,
    pub target: String,
}

/// Factory whose behaviour is steered by the test
///
/// Creation and health checks can be delayed, creation can be made to fail
/// a number of times, and individual connections can be marked unhealthy by
/// serial.
#[derive(Default)]
pub struct ScriptedFactory {
    next_serial: AtomicU64,
    created: AtomicUsize,
    destroyed: AtomicUsize,
    failures_left: AtomicUsize,
    create_delay: Mutex<Duration>,
    health_check_delay: Mutex<Duration>,
    unhealthy: Mutex<HashSet<u64>>,
}

impl ScriptedFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail the next `times` creations
    pub fn fail_next(&self, times: usize) {
        self.failures_left.store(times, Ordering::SeqCst);
    }

    pub fn set_create_delay(&self, delay: Duration) {
        *self.create_delay.lock() = delay;
    }

    pub fn set_health_check_delay(&self, delay: Duration) {
        *self.health_check_delay.lock() = delay;
    }

    pub fn mark_unhealthy(&self, serial: u64) {
        self.unhealthy.lock().insert(serial);
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Connections created and not yet destroyed
    pub fn live(&self) -> usize {
        self.created() - self.destroyed()
    }
}

#[async_trait]
impl ConnectionFactory for ScriptedFactory {
    type Connection = FakeConn;

    async fn create(&self, target: &ConnectionTarget) -> anyhow::Result<FakeConn> {
        let delay = *self.create_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            anyhow::bail!("connection refused by {}", target.display_addr());
        }

        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(FakeConn {
            serial: self.next_serial.fetch_add(1, Ordering::SeqCst),
            target: target.display_addr(),
        })
    }

    async fn destroy(&self, _conn: FakeConn) -> anyhow::Result<()> {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn health_check(&self, conn: &FakeConn) -> anyhow::Result<bool> {
        let delay = *self.health_check_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(!self.unhealthy.lock().contains(&conn.serial))
    }
}

/// Build a named pool over a shared scripted factory
pub fn pool(
    config: PoolConfig,
) -> anyhow::Result<(Arc<ConnectionPool<ScriptedFactory>>, Arc<ScriptedFactory>)> {
    dashpool_connection::init_test_logging();
    let factory = ScriptedFactory::new();
    let pool = ConnectionPool::with_name("it", config, Arc::clone(&factory))?;
    Ok((Arc::new(pool), factory))
}

/// Check the bookkeeping invariants on a stats snapshot
pub fn assert_invariants(pool: &ConnectionPool<ScriptedFactory>) {
    let stats = pool.stats();
    let max = pool.config().max_size();
    assert_eq!(stats.total, stats.idle + stats.active, "total must be idle + active");
    assert!(stats.total <= max, "total {} exceeds max {}", stats.total, max);
    assert_eq!(
        stats.total_acquired - stats.total_released,
        stats.active as u64,
        "acquired - released must equal active"
    );
}
