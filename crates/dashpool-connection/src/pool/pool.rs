//! Connection pool implementation

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashpool_core::{ConnectionFactory, ConnectionId, PoolError, Result};
use futures::future::join_all;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{Notify, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::config::PoolConfig;
use super::connection::{PooledConnection, Slot};
use super::state::{PoolPhase, PoolState};
use super::stats::PoolStats;
use super::sweep::{SweepReport, run_sweeper};
use crate::health::{HealthCheckMetrics, probe_connection};
use crate::retry::RetryPolicy;

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// Shared pool internals
///
/// All bookkeeping lives in `state` behind a single lock. Factory calls
/// happen with the lock released and re-check the phase afterwards.
pub(crate) struct PoolInner<F: ConnectionFactory> {
    id: u64,
    name: String,
    config: PoolConfig,
    retry: RetryPolicy,
    factory: Arc<F>,
    state: Mutex<PoolState<F::Connection>>,
    next_connection_id: AtomicU64,
    /// Signalled whenever an active or in-transit connection goes away
    drained: Notify,
    /// Signalled when an acquirer starts waiting
    demand: Notify,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

/// A bounded pool of connections produced by a [`ConnectionFactory`]
///
/// Callers `acquire` a connection, use it, and `release` it. When every
/// slot is taken, acquirers queue in FIFO order and are handed released
/// connections directly, or fail after the configured acquire timeout.
pub struct ConnectionPool<F: ConnectionFactory> {
    inner: Arc<PoolInner<F>>,
}

impl<F: ConnectionFactory> ConnectionPool<F> {
    /// Create a new connection pool with the given configuration and factory
    pub fn new(config: PoolConfig, factory: F) -> Result<Self> {
        Self::with_name("default", config, Arc::new(factory))
    }

    /// Create a named pool sharing `factory` with other pools
    pub fn with_name(name: impl Into<String>, config: PoolConfig, factory: Arc<F>) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_validated(name.into(), config, factory))
    }

    pub(crate) fn from_validated(name: String, config: PoolConfig, factory: Arc<F>) -> Self {
        let retry = config.retry_policy();
        Self {
            inner: Arc::new(PoolInner {
                id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
                name,
                config,
                retry,
                factory,
                state: Mutex::new(PoolState::new()),
                next_connection_id: AtomicU64::new(1),
                drained: Notify::new(),
                demand: Notify::new(),
                sweeper: Mutex::new(None),
            }),
        }
    }

    /// Get the pool name used in log fields
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Get the pool configuration
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Get the lifecycle phase
    pub fn phase(&self) -> PoolPhase {
        self.inner.phase()
    }

    /// Get current pool statistics
    pub fn stats(&self) -> PoolStats {
        self.inner.state.lock().stats()
    }

    /// Get health check counters
    pub fn health_metrics(&self) -> HealthCheckMetrics {
        self.inner.state.lock().health.clone()
    }

    /// Establish the configured minimum of warm connections
    ///
    /// Only the shortfall below `min` is created, so calling this again
    /// tops the pool up. Connections that still fail after retries are
    /// skipped; an error is returned only when none could be established.
    /// Also starts the periodic health sweep if one is configured.
    #[tracing::instrument(skip(self), fields(pool = %self.inner.name))]
    pub async fn connect(&self) -> Result<usize> {
        let inner = &self.inner;
        let shortfall = {
            let mut state = inner.state.lock();
            if !state.is_open() {
                return Err(PoolError::PoolClosed);
            }
            let missing = inner.config.min_size().saturating_sub(state.committed());
            state.reserve(missing, inner.config.max_size())
        };

        inner.ensure_sweeper();

        if shortfall == 0 {
            debug!("pool already at minimum size");
            return Ok(0);
        }

        info!(shortfall, target = %inner.config.target().display_addr(), "pre-warming connections");

        let creations: Vec<_> = (0..shortfall).map(|_| inner.spawn_admit(false)).collect();

        let mut established = 0;
        let mut last_error = None;
        for result in join_all(creations).await {
            match result {
                Ok(Ok(true)) => established += 1,
                Ok(Ok(false)) => {}
                Ok(Err(err)) => last_error = Some(err),
                Err(e) => {
                    warn!(error = %e, "connection task failed");
                    inner.finish_transit();
                }
            }
        }

        info!(established, requested = shortfall, "pool pre-warmed");

        match last_error {
            Some(err) if established == 0 => Err(err),
            _ => Ok(established),
        }
    }

    /// Get a connection from the pool
    ///
    /// This will:
    /// 1. Hand out an idle connection if one is available
    /// 2. If none available and under max, create a new connection
    /// 3. If at max, queue behind earlier acquirers until a connection is
    ///    handed over or the acquire timeout elapses
    #[tracing::instrument(skip(self), fields(pool = %self.inner.name))]
    pub async fn acquire(&self) -> Result<PooledConnection<F>> {
        let inner = &self.inner;
        let deadline = Instant::now() + inner.config.acquire_timeout();
        inner.ensure_sweeper();

        enum Next<C> {
            Ready(Slot<C>),
            Create,
            Wait(u64, oneshot::Receiver<Slot<C>>, bool),
        }

        let next = {
            let mut state = inner.state.lock();
            if !state.is_open() {
                return Err(PoolError::PoolClosed);
            }
            if let Some(slot) = state.take_idle() {
                Next::Ready(slot)
            } else if state.waiters.is_empty() && state.reserve(1, inner.config.max_size()) == 1 {
                Next::Create
            } else {
                let (tx, rx) = oneshot::channel();
                let waiter_id = state.enqueue_waiter(tx);
                debug!(waiter_id, queued = state.waiters.len(), "pool exhausted, waiting");
                let spare = state.open_slots(inner.config.max_size()) > 0;
                Next::Wait(waiter_id, rx, spare)
            }
        };

        match next {
            Next::Ready(slot) => Ok(inner.hand_out(slot)),
            Next::Create => inner.create_for_caller().await,
            Next::Wait(waiter_id, rx, spare) => {
                inner.demand.notify_waiters();
                if spare {
                    // Capacity freed up while others were already queued.
                    inner.replenish_waiters();
                }
                inner.wait_for_handoff(waiter_id, rx, deadline).await
            }
        }
    }

    /// Return a connection to the pool
    ///
    /// The connection is probed (or its cached health consulted, see
    /// `validateOnRelease`). Healthy connections go to the oldest waiter or
    /// back to the idle set; unhealthy ones are destroyed. Cleanup failures
    /// are logged, never returned.
    ///
    /// Fails with [`PoolError::InvalidConnection`] if the handle is not
    /// active in this pool; the pool's state is left untouched.
    #[tracing::instrument(skip(self, conn), fields(pool = %self.inner.name, connection_id = %conn.id()))]
    pub async fn release(&self, mut conn: PooledConnection<F>) -> Result<()> {
        let inner = &self.inner;
        let id = conn.id();

        if conn.pool_id() != inner.id {
            warn!("release of a connection owned by another pool");
            return Err(PoolError::InvalidConnection(id));
        }

        let slot = {
            let mut state = inner.state.lock();
            if !state.active.contains_key(&id) {
                warn!("release of a connection that is not active");
                return Err(PoolError::InvalidConnection(id));
            }
            let Some(slot) = conn.take_slot() else {
                return Err(PoolError::InvalidConnection(id));
            };
            state.check_in(id);
            state.in_transit += 1;
            slot
        };

        // The check-in runs to completion even if this future is dropped.
        if let Err(e) = tokio::spawn(Arc::clone(inner).check_in(slot)).await {
            warn!(error = %e, "release task failed");
        }
        Ok(())
    }

    /// Probe a checked-out connection and record the result on it
    ///
    /// Never fails; probe errors and timeouts report `false`.
    pub async fn check_health(&self, conn: &mut PooledConnection<F>) -> bool {
        match conn.probe_target() {
            Some(slot) => self.inner.probe_slot(slot).await,
            None => false,
        }
    }

    /// Probe every idle connection once, evicting and replacing failures
    ///
    /// This is what the periodic sweep runs on each tick.
    pub async fn run_health_sweep(&self) -> SweepReport {
        let inner = Arc::clone(&self.inner);
        match tokio::spawn(async move { inner.sweep_idle().await }).await {
            Ok(report) => report,
            Err(e) => {
                warn!(pool = %self.inner.name, error = %e, "health sweep task failed");
                SweepReport::default()
            }
        }
    }

    /// Close the pool
    ///
    /// New and queued acquires fail with [`PoolError::PoolClosed`], idle
    /// connections are destroyed right away, and the call waits until every
    /// active connection has been released (each is destroyed on release).
    /// Closing a closed pool is a no-op.
    #[tracing::instrument(skip(self), fields(pool = %self.inner.name))]
    pub async fn close(&self) -> Result<()> {
        let inner = &self.inner;

        let idle: Vec<_> = {
            let mut state = inner.state.lock();
            match state.phase {
                PoolPhase::Closed => return Ok(()),
                PoolPhase::Closing => Vec::new(),
                PoolPhase::Open => {
                    state.phase = PoolPhase::Closing;
                    let failed = state.close_waiters();
                    if failed > 0 {
                        debug!(failed, "failed queued acquirers");
                    }
                    // Counted in transit so a concurrent close also waits
                    // for these.
                    let draining = state.idle.len();
                    state.in_transit += draining;
                    state.idle.drain(..).collect()
                }
            }
        };

        if !idle.is_empty() {
            debug!(count = idle.len(), "destroying idle connections");
            let retiring: Vec<_> = idle.into_iter().map(|slot| inner.retire(slot)).collect();
            for result in join_all(retiring).await {
                if let Err(e) = result {
                    warn!(error = %e, "idle connection teardown failed");
                }
            }
        }

        inner.wait_for_drain().await;

        inner.state.lock().phase = PoolPhase::Closed;
        if let Some(task) = inner.sweeper.lock().take() {
            task.abort();
        }

        info!("pool closed");
        Ok(())
    }
}

impl<F: ConnectionFactory> fmt::Debug for ConnectionPool<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("name", &self.inner.name)
            .field("config", &self.inner.config)
            .field("state", &*self.inner.state.lock())
            .finish()
    }
}

impl<F: ConnectionFactory> PoolInner<F> {
    pub(super) fn phase(&self) -> PoolPhase {
        self.state.lock().phase
    }

    pub(super) fn state(&self) -> &Mutex<PoolState<F::Connection>> {
        &self.state
    }

    fn factory(&self) -> &F {
        &self.factory
    }

    fn hand_out(self: &Arc<Self>, slot: Slot<F::Connection>) -> PooledConnection<F> {
        PooledConnection::new(slot, Arc::downgrade(self), self.id)
    }

    /// Create a connection through the retry policy.
    ///
    /// The caller must already hold an in-transit reservation for it.
    pub(super) async fn open_connection(&self) -> Result<Slot<F::Connection>> {
        let factory = self.factory();
        let target = self.config.target();

        let conn = self
            .retry
            .run("create connection", move |_| factory.create(target))
            .await
            .map_err(|exhausted| PoolError::Connection {
                attempts: exhausted.attempts,
                source: exhausted.last_error,
            })?;

        let id = ConnectionId::new(self.next_connection_id.fetch_add(1, Ordering::Relaxed));
        debug!(pool = %self.name, connection_id = %id, "connection created");
        Ok(Slot::new(id, conn))
    }

    /// Tear a connection down, logging rather than returning failures.
    pub(super) async fn destroy(&self, slot: Slot<F::Connection>) {
        let id = slot.info.id;
        match self.factory().destroy(slot.conn).await {
            Ok(()) => debug!(pool = %self.name, connection_id = %id, "connection destroyed"),
            Err(e) => warn!(
                pool = %self.name,
                connection_id = %id,
                error = %e,
                "failed to destroy connection"
            ),
        }
    }

    /// Probe `slot` and store the result on it.
    pub(super) async fn probe_slot(&self, slot: &mut Slot<F::Connection>) -> bool {
        let outcome = probe_connection(
            self.factory(),
            &slot.conn,
            self.config.health_check_timeout(),
        )
        .await;
        let healthy = outcome.is_healthy();
        slot.info.healthy = healthy;

        self.state.lock().health.record_probe(healthy);
        if !healthy {
            debug!(pool = %self.name, connection_id = %slot.info.id, %outcome, "health probe failed");
        }
        healthy
    }

    /// Give back an in-transit reservation and wake `close()`.
    pub(super) fn finish_transit(&self) {
        self.state.lock().finish_transit();
        self.drained.notify_waiters();
    }

    /// Give back the reservation of a connection evicted as unhealthy.
    pub(super) fn finish_discard(&self) {
        {
            let mut state = self.state.lock();
            state.finish_transit();
            state.total_discarded += 1;
        }
        self.drained.notify_waiters();
    }

    /// Move a freshly created connection into circulation.
    ///
    /// Consumes the caller's reservation. Returns false if the pool stopped
    /// accepting connections meanwhile, in which case it is destroyed.
    pub(super) async fn admit(&self, slot: Slot<F::Connection>, replacement: bool) -> bool {
        let leftover = {
            let mut state = self.state.lock();
            if state.is_open() {
                state.finish_transit();
                state.total_created += 1;
                if replacement {
                    state.health.record_replacement();
                }
                state.place(slot);
                None
            } else {
                Some(slot)
            }
        };

        match leftover {
            None => true,
            Some(slot) => {
                self.destroy(slot).await;
                self.finish_transit();
                false
            }
        }
    }

    /// Destroy `slot` on its own task and give back its reservation.
    fn retire(self: &Arc<Self>, slot: Slot<F::Connection>) -> JoinHandle<()> {
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            inner.destroy(slot).await;
            inner.finish_transit();
        })
    }

    /// Create a connection on its own task and move it into circulation.
    ///
    /// Consumes a reservation the caller already holds. The task runs to
    /// completion whether or not anyone awaits it; it yields whether the
    /// connection was admitted.
    fn spawn_admit(self: &Arc<Self>, replacement: bool) -> JoinHandle<Result<bool>> {
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            match inner.open_connection().await {
                Ok(slot) => Ok(inner.admit(slot, replacement).await),
                Err(err) => {
                    inner.finish_transit();
                    inner.replenish_waiters();
                    Err(err)
                }
            }
        })
    }

    async fn create_for_caller(self: &Arc<Self>) -> Result<PooledConnection<F>> {
        let task = {
            let inner = Arc::clone(self);
            tokio::spawn(async move { inner.open_connection().await })
        };
        let mut pending = PendingCreate {
            inner: Arc::clone(self),
            task: Some(task),
        };

        let Some(task) = pending.task.as_mut() else {
            return Err(PoolError::PoolClosed);
        };
        let joined = task.await;
        pending.task = None;

        let created = match joined {
            Ok(created) => created,
            Err(e) => Err(PoolError::Connection {
                attempts: 1,
                source: anyhow::Error::new(e).context("connection task failed"),
            }),
        };

        match created {
            Ok(mut slot) => {
                let admitted = {
                    let mut state = self.state.lock();
                    if state.is_open() {
                        state.finish_transit();
                        state.total_created += 1;
                        state.checkout(&mut slot);
                        true
                    } else {
                        false
                    }
                };

                if admitted {
                    Ok(self.hand_out(slot))
                } else {
                    self.retire(slot);
                    Err(PoolError::PoolClosed)
                }
            }
            Err(err) => {
                self.finish_transit();
                // Someone may have queued behind our reservation.
                self.replenish_waiters();
                Err(err)
            }
        }
    }

    /// Finish a creation whose acquirer went away.
    ///
    /// The connection goes to the oldest waiter or the idle set.
    async fn adopt_creation(self: Arc<Self>, task: JoinHandle<Result<Slot<F::Connection>>>) {
        match task.await {
            Ok(Ok(slot)) => {
                debug!(pool = %self.name, connection_id = %slot.info.id, "acquirer left, keeping new connection");
                self.admit(slot, false).await;
            }
            Ok(Err(e)) => {
                debug!(pool = %self.name, error = %e, "connection attempt for departed acquirer failed");
                self.finish_transit();
                self.replenish_waiters();
            }
            Err(e) => {
                warn!(pool = %self.name, error = %e, "connection task failed");
                self.finish_transit();
                self.replenish_waiters();
            }
        }
    }

    async fn wait_for_handoff(
        self: &Arc<Self>,
        waiter_id: u64,
        rx: oneshot::Receiver<Slot<F::Connection>>,
        deadline: Instant,
    ) -> Result<PooledConnection<F>> {
        let mut ticket = WaitTicket {
            inner: self,
            waiter_id,
            rx,
            armed: true,
        };

        let waited = tokio::time::timeout_at(deadline, &mut ticket.rx).await;
        ticket.armed = false;

        match waited {
            Ok(Ok(slot)) => Ok(self.hand_out(slot)),
            // Sender dropped: close() failed the queue.
            Ok(Err(_)) => Err(PoolError::PoolClosed),
            Err(_) => match self.cancel_wait(waiter_id, &mut ticket.rx) {
                // A hand-off raced the deadline; keep the connection.
                Some(slot) => Ok(self.hand_out(slot)),
                None if self.phase() != PoolPhase::Open => Err(PoolError::PoolClosed),
                None => {
                    debug!(waiter_id, "acquire timed out");
                    Err(PoolError::AcquireTimeout(self.config.acquire_timeout()))
                }
            },
        }
    }

    /// Take waiter `waiter_id` out of the queue.
    ///
    /// If it was already served, the handed-over connection is returned.
    /// Hand-offs are sent under the lock, so once the waiter is gone from
    /// the queue the connection is already in the channel.
    fn cancel_wait(
        &self,
        waiter_id: u64,
        rx: &mut oneshot::Receiver<Slot<F::Connection>>,
    ) -> Option<Slot<F::Connection>> {
        let removed = self.state.lock().remove_waiter(waiter_id);
        if removed { None } else { rx.try_recv().ok() }
    }

    /// Run the release path for a connection already removed from `active`.
    ///
    /// Consumes the reservation taken when it was checked in.
    pub(super) async fn check_in(self: Arc<Self>, mut slot: Slot<F::Connection>) {
        let id = slot.info.id;

        if self.phase() != PoolPhase::Open {
            self.destroy(slot).await;
            self.finish_transit();
            return;
        }

        let healthy = if !slot.info.healthy {
            false
        } else if self.config.validate_on_release() {
            self.probe_slot(&mut slot).await
        } else {
            true
        };

        if !healthy {
            self.destroy(slot).await;
            self.finish_discard();
            info!(pool = %self.name, connection_id = %id, "discarded unhealthy connection");
            self.replenish_waiters();
            return;
        }

        let leftover = {
            let mut state = self.state.lock();
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
    }

    /// Reclaim a connection whose handle was dropped without `release`.
    pub(super) fn reclaim_dropped(self: &Arc<Self>, slot: Slot<F::Connection>) {
        let id = slot.info.id;
        let runtime = Handle::try_current().ok();

        {
            let mut state = self.state.lock();
            if !state.check_in(id) {
                warn!(pool = %self.name, connection_id = %id, "dropped connection was not active");
                return;
            }
            if runtime.is_some() {
                state.in_transit += 1;
            } else {
                state.total_discarded += 1;
            }
        }

        match runtime {
            Some(handle) => {
                debug!(pool = %self.name, connection_id = %id, "connection dropped without release, reclaiming");
                handle.spawn(Arc::clone(self).check_in(slot));
            }
            None => {
                warn!(pool = %self.name, connection_id = %id, "connection dropped outside a runtime, discarding");
                drop(slot);
                self.drained.notify_waiters();
                self.replenish_waiters();
            }
        }
    }

    /// Start creating a connection for the oldest waiter if a slot is free.
    ///
    /// Creation uses the normal retry policy and gives up after it; the
    /// waiter then times out as usual.
    pub(super) fn replenish_waiters(self: &Arc<Self>) {
        let reserved = {
            let mut state = self.state.lock();
            state.is_open()
                && !state.waiters.is_empty()
                && state.reserve(1, self.config.max_size()) == 1
        };
        if !reserved {
            return;
        }

        let Ok(handle) = Handle::try_current() else {
            self.finish_transit();
            return;
        };

        let inner = Arc::clone(self);
        handle.spawn(async move {
            match inner.open_connection().await {
                Ok(slot) => {
                    inner.admit(slot, true).await;
                }
                Err(e) => {
                    warn!(pool = %inner.name, error = %e, "could not replace connection for waiter");
                    inner.finish_transit();
                }
            }
        });
    }

    /// Create connections until the pool is back at `min`.
    pub(super) async fn top_up_min(self: &Arc<Self>) -> usize {
        let wanted = {
            let mut state = self.state.lock();
            if !state.is_open() {
                return 0;
            }
            let missing = self.config.min_size().saturating_sub(state.committed());
            state.reserve(missing, self.config.max_size())
        };

        if wanted == 0 {
            return 0;
        }

        let creations: Vec<_> = (0..wanted).map(|_| self.spawn_admit(true)).collect();
        let mut created = 0;
        for result in join_all(creations).await {
            match result {
                Ok(Ok(true)) => created += 1,
                Ok(Ok(false)) => {}
                Ok(Err(e)) => {
                    warn!(pool = %self.name, error = %e, "could not restore minimum pool size");
                }
                Err(e) => {
                    warn!(pool = %self.name, error = %e, "connection task failed");
                    self.finish_transit();
                }
            }
        }
        created
    }

    /// Notified when an acquirer starts waiting.
    pub(super) fn demand(&self) -> &Notify {
        &self.demand
    }

    async fn wait_for_drain(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            let _ = notified.as_mut().enable();

            let remaining = {
                let state = self.state.lock();
                (!state.is_drained()).then(|| (state.active.len(), state.in_transit))
            };
            let Some((active, in_transit)) = remaining else {
                return;
            };

            debug!(pool = %self.name, active, in_transit, "waiting for connections to drain");
            notified.await;
        }
    }

    /// Spawn the periodic idle sweep if configured and not yet running.
    fn ensure_sweeper(self: &Arc<Self>) {
        let Some(period) = self.config.health_check_interval() else {
            return;
        };

        let mut sweeper = self.sweeper.lock();
        if sweeper.is_some() || self.phase() != PoolPhase::Open {
            return;
        }
        let Ok(handle) = Handle::try_current() else {
            return;
        };

        debug!(pool = %self.name, period_ms = period.as_millis() as u64, "starting health sweep");
        *sweeper = Some(handle.spawn(run_sweeper(Arc::downgrade(self), period)));
    }

    pub(super) fn name(&self) -> &str {
        &self.name
    }
}

impl<F: ConnectionFactory> Drop for PoolInner<F> {
    fn drop(&mut self) {
        if let Some(task) = self.sweeper.get_mut().take() {
            task.abort();
        }
    }
}

/// Hands an in-flight creation back to the pool if its acquirer goes away
struct PendingCreate<F: ConnectionFactory> {
    inner: Arc<PoolInner<F>>,
    task: Option<JoinHandle<Result<Slot<F::Connection>>>>,
}

impl<F: ConnectionFactory> Drop for PendingCreate<F> {
    fn drop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(Arc::clone(&self.inner).adopt_creation(task));
            }
            Err(_) => {
                task.abort();
                self.inner.finish_transit();
            }
        }
    }
}

/// Keeps a queued acquire honest if its future is dropped mid-wait
struct WaitTicket<'a, F: ConnectionFactory> {
    inner: &'a Arc<PoolInner<F>>,
    waiter_id: u64,
    rx: oneshot::Receiver<Slot<F::Connection>>,
    armed: bool,
}

impl<F: ConnectionFactory> Drop for WaitTicket<'_, F> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Some(slot) = self.inner.cancel_wait(self.waiter_id, &mut self.rx) {
            // Served just before the caller gave up; route it back through
            // the normal reclaim path.
            drop(self.inner.hand_out(slot));
        }
    }
}

