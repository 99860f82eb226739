//! Connection identity, target parameters and the factory contract

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Identity assigned by a pool to every connection it creates.
///
/// Stable for the connection's lifetime and never reused within a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Parameters describing where connections should be opened.
///
/// The pool never interprets these; they are passed through to the
/// [`ConnectionFactory`] unchanged.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionTarget {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: Option<String>,
}

impl ConnectionTarget {
    /// Create a target for the given host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// `host:port/database`, suitable for log fields.
    pub fn display_addr(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }
}

impl Default for ConnectionTarget {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: String::new(),
            user: String::new(),
            password: None,
        }
    }
}

impl fmt::Debug for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Collaborator that opens, closes and probes connections for a pool.
///
/// The pool owns only the lifecycle bookkeeping; everything that touches
/// the network goes through this trait and is called without the pool
/// lock held.
#[async_trait]
pub trait ConnectionFactory: Send + Sync + 'static {
    /// The opaque payload handed to callers while a connection is active
    type Connection: Send + Sync + 'static;

    /// Establish a new connection to `target`.
    async fn create(&self, target: &ConnectionTarget) -> anyhow::Result<Self::Connection>;

    /// Tear down a connection. Best effort: the pool logs errors and moves on.
    async fn destroy(&self, conn: Self::Connection) -> anyhow::Result<()> {
        drop(conn);
        Ok(())
    }

    /// Probe an existing connection.
    ///
    /// Must not block indefinitely. An `Err` is treated as unhealthy.
    async fn health_check(&self, _conn: &Self::Connection) -> anyhow::Result<bool> {
        Ok(true)
    }
}

#[async_trait]
impl<T: ConnectionFactory> ConnectionFactory for Arc<T> {
    type Connection = T::Connection;

    async fn create(&self, target: &ConnectionTarget) -> anyhow::Result<Self::Connection> {
        (**self).create(target).await
    }

    async fn destroy(&self, conn: Self::Connection) -> anyhow::Result<()> {
        (**self).destroy(conn).await
    }

    async fn health_check(&self, conn: &Self::Connection) -> anyhow::Result<bool> {
        (**self).health_check(conn).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoFactory;

    #[async_trait]
    impl ConnectionFactory for EchoFactory {
        type Connection = String;

        async fn create(&self, target: &ConnectionTarget) -> anyhow::Result<String> {
            Ok(target.display_addr())
        }
    }

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId::new(42).to_string(), "conn-42");
        assert_eq!(ConnectionId::new(42).as_u64(), 42);
    }

    #[test]
    fn test_target_debug_redacts_password() {
        let target = ConnectionTarget::new("db.internal", 5433)
            .with_database("prices")
            .with_user("reader")
            .with_password("hunter2");

        let debug = format!("{:?}", target);
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("db.internal"));
    }

    #[test]
    fn test_target_deserializes_partial_json() {
        let target: ConnectionTarget =
            serde_json::from_str(r#"{"host":"10.0.0.5","database":"chain"}"#).expect("parse");
        assert_eq!(target.host, "10.0.0.5");
        assert_eq!(target.port, 5432);
        assert_eq!(target.database, "chain");
        assert!(target.password.is_none());
    }

    #[tokio::test]
    async fn test_factory_defaults_through_arc() {
        let factory = Arc::new(EchoFactory);
        let target = ConnectionTarget::new("localhost", 6543).with_database("blocks");

        let conn = factory.create(&target).await.expect("create");
        assert_eq!(conn, "localhost:6543/blocks");
        assert!(factory.health_check(&conn).await.expect("probe"));
        factory.destroy(conn).await.expect("destroy");
    }
}
