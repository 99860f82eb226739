//! Named, shared pools

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashpool_core::{ConnectionFactory, Result};
use futures::future::join_all;
use parking_lot::RwLock;

use crate::pool::{ConnectionPool, PoolConfig};

/// Keeps one pool per name, all sharing a single factory
///
/// Pools are created lazily with the registry's default configuration and
/// the same instance is returned for every later lookup of that name.
pub struct PoolRegistry<F: ConnectionFactory> {
    factory: Arc<F>,
    default_config: PoolConfig,
    pools: RwLock<HashMap<String, Arc<ConnectionPool<F>>>>,
}

impl<F: ConnectionFactory> PoolRegistry<F> {
    /// Create a registry whose pools use `default_config`
    pub fn new(factory: F, default_config: PoolConfig) -> Result<Self> {
        Self::with_shared_factory(Arc::new(factory), default_config)
    }

    pub fn with_shared_factory(factory: Arc<F>, default_config: PoolConfig) -> Result<Self> {
        default_config.validate()?;
        Ok(Self {
            factory,
            default_config,
            pools: RwLock::new(HashMap::new()),
        })
    }

    /// Get the pool registered under `name`, creating it on first use
    pub fn get_pool(&self, name: &str) -> Arc<ConnectionPool<F>> {
        if let Some(pool) = self.pools.read().get(name) {
            return Arc::clone(pool);
        }

        let mut pools = self.pools.write();
        let pool = pools.entry(name.to_string()).or_insert_with(|| {
            tracing::debug!(pool = name, "registering pool");
            Arc::new(ConnectionPool::from_validated(
                name.to_string(),
                self.default_config.clone(),
                Arc::clone(&self.factory),
            ))
        });
        Arc::clone(pool)
    }

    /// Like [`get_pool`](Self::get_pool), but a newly created pool uses
    /// `config`. An existing pool is returned unchanged.
    pub fn get_pool_with(&self, name: &str, config: PoolConfig) -> Result<Arc<ConnectionPool<F>>> {
        if let Some(pool) = self.pools.read().get(name) {
            return Ok(Arc::clone(pool));
        }

        config.validate()?;
        let mut pools = self.pools.write();
        let pool = pools.entry(name.to_string()).or_insert_with(|| {
            tracing::debug!(pool = name, "registering pool");
            Arc::new(ConnectionPool::from_validated(
                name.to_string(),
                config,
                Arc::clone(&self.factory),
            ))
        });
        Ok(Arc::clone(pool))
    }

    /// Check if a pool is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.pools.read().contains_key(name)
    }

    /// Names of all registered pools, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.pools.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.pools.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.read().is_empty()
    }

    /// Unregister a pool without closing it
    ///
    /// The next `get_pool(name)` creates a fresh pool.
    pub fn remove(&self, name: &str) -> Option<Arc<ConnectionPool<F>>> {
        self.pools.write().remove(name)
    }

    /// Close every registered pool and clear the registry
    ///
    /// Pools are closed concurrently; each close waits for its active
    /// connections to be released.
    #[tracing::instrument(skip(self))]
    pub async fn close_all_pools(&self) -> Result<()> {
        let pools: Vec<_> = self.pools.write().drain().collect();
        if pools.is_empty() {
            return Ok(());
        }

        tracing::info!(count = pools.len(), "closing all pools");
        let results = join_all(pools.iter().map(|(_, pool)| pool.close())).await;
        results.into_iter().collect()
    }
}

impl<F: ConnectionFactory> fmt::Debug for PoolRegistry<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolRegistry")
            .field("pools", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dashpool_core::ConnectionTarget;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::pool::PoolPhase;

    #[derive(Default)]
    struct CountingFactory {
        created: AtomicUsize,
    }

    #[async_trait]
    impl ConnectionFactory for CountingFactory {
        type Connection = usize;

        async fn create(&self, _target: &ConnectionTarget) -> anyhow::Result<usize> {
            Ok(self.created.fetch_add(1, Ordering::SeqCst))
        }
    }

    fn registry() -> PoolRegistry<CountingFactory> {
        PoolRegistry::new(CountingFactory::default(), PoolConfig::new(0, 2)).expect("registry")
    }

    #[test]
    fn test_get_pool_returns_same_instance() {
        let registry = registry();
        let a = registry.get_pool("main");
        let b = registry.get_pool("main");
        let other = registry.get_pool("analytics");

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &other));
        assert_eq!(a.name(), "main");
        assert_eq!(registry.names(), vec!["analytics".to_string(), "main".to_string()]);
    }

    #[test]
    fn test_invalid_default_config_rejected() {
        let result = PoolRegistry::new(CountingFactory::default(), PoolConfig::new(3, 1));
        assert!(matches!(result, Err(dashpool_core::PoolError::Config(_))));
    }

    #[test]
    fn test_get_pool_with_applies_on_first_creation_only() {
        let registry = registry();
        let pool = registry
            .get_pool_with("wide", PoolConfig::new(0, 8))
            .expect("create");
        assert_eq!(pool.config().max_size(), 8);

        let again = registry
            .get_pool_with("wide", PoolConfig::new(0, 3))
            .expect("lookup");
        assert!(Arc::ptr_eq(&pool, &again));
        assert_eq!(again.config().max_size(), 8);

        assert!(registry.get_pool_with("bad", PoolConfig::new(0, 0)).is_err());
        assert!(!registry.contains("bad"));
    }

    #[test]
    fn test_remove_unregisters() {
        let registry = registry();
        let first = registry.get_pool("main");
        assert!(registry.remove("main").is_some());
        assert!(registry.is_empty());

        let second = registry.get_pool("main");
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_close_all_pools() {
        let registry = registry();
        let main = registry.get_pool("main");
        let reports = registry.get_pool("reports");

        let conn = main.acquire().await.expect("acquire");
        main.release(conn).await.expect("release");

        registry.close_all_pools().await.expect("close all");

        assert_eq!(registry.len(), 0);
        assert_eq!(main.phase(), PoolPhase::Closed);
        assert_eq!(reports.phase(), PoolPhase::Closed);
        assert_eq!(main.stats().total, 0);

        // Closing an empty registry is fine too
        registry.close_all_pools().await.expect("close again");
    }
}
