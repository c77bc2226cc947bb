//! Connection Pool Lifecycle
//!
//! The pool is the only shared state in the crate. It is an explicitly owned
//! object: created once at startup, handed to a store, closed at shutdown.
//!
//! Acquisition is always bounded. An operation that cannot get a connection
//! within [`PoolConfiguration::acquire_timeout`] fails with
//! [`StoreError::ConnectionTimeout`]; once [`ProbePool::close`] has run every
//! operation fails with [`StoreError::PoolClosed`]. Connections are returned
//! to the pool when their guard drops, on success and failure alike.

use crate::config::{ConfigurationError, DatabaseConfig};
use crate::error::{Result, StoreError};
use serde::Serialize;
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

/// Pool sizing and timeouts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfiguration {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Option<Duration>,
    pub test_before_acquire: bool,
}

impl Default for PoolConfiguration {
    fn default() -> Self {
        Self {
            max_connections: 20,
            min_connections: 0,
            acquire_timeout: Duration::from_secs(2),
            idle_timeout: Duration::from_secs(30),
            max_lifetime: Some(Duration::from_secs(1800)),
            test_before_acquire: false,
        }
    }
}

impl PoolConfiguration {
    /// Small pool, connections tested before use
    pub fn development() -> Self {
        Self {
            max_connections: 5,
            test_before_acquire: true,
            ..Self::default()
        }
    }

    /// Ingestion-heavy deployment with warm connections
    pub fn production() -> Self {
        Self {
            max_connections: 50,
            min_connections: 5,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(300),
            max_lifetime: Some(Duration::from_secs(3600)),
            test_before_acquire: false,
        }
    }

    /// Tight timeouts so tests fail fast
    pub fn test() -> Self {
        Self {
            max_connections: 4,
            min_connections: 0,
            acquire_timeout: Duration::from_millis(500),
            idle_timeout: Duration::from_secs(10),
            max_lifetime: None,
            test_before_acquire: false,
        }
    }

    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            acquire_timeout: config.acquire_timeout(),
            idle_timeout: config.idle_timeout(),
            max_lifetime: config.max_lifetime(),
            test_before_acquire: config.test_before_acquire,
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigurationError> {
        if self.max_connections == 0 {
            return Err(ConfigurationError::invalid_value(
                "max_connections",
                0,
                "pool must allow at least one connection",
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(ConfigurationError::invalid_value(
                "min_connections",
                self.min_connections,
                format!("exceeds max_connections ({})", self.max_connections),
            ));
        }
        if self.acquire_timeout.is_zero() {
            return Err(ConfigurationError::invalid_value(
                "acquire_timeout",
                "0s",
                "acquisition must be allowed to wait",
            ));
        }
        Ok(())
    }

    fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.acquire_timeout)
            .idle_timeout(self.idle_timeout)
            .max_lifetime(self.max_lifetime)
            .test_before_acquire(self.test_before_acquire)
    }
}

/// Point-in-time pool occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStatistics {
    /// Open connections, idle or in use
    pub size: u32,
    pub idle: u32,
    pub max_connections: u32,
    pub acquire_timeout_ms: u64,
    pub is_closed: bool,
}

/// Bounded Postgres connection pool
#[derive(Debug, Clone)]
pub struct ProbePool {
    pool: PgPool,
    config: PoolConfiguration,
}

impl ProbePool {
    /// Open the pool and verify the database answers
    pub async fn connect(database_url: &str, config: PoolConfiguration) -> Result<Self> {
        config.validate()?;
        info!(
            max_connections = config.max_connections,
            acquire_timeout_ms = config.acquire_timeout.as_millis() as u64,
            "🔌 POOL: connecting"
        );

        let pool = config
            .pool_options()
            .connect(database_url)
            .await
            .map_err(|e| StoreError::from_sqlx("connect", e, config.acquire_timeout))?;

        let probe_pool = Self { pool, config };
        probe_pool.health_check().await?;
        info!(size = probe_pool.pool.size(), "🔌 POOL: ready");
        Ok(probe_pool)
    }

    /// Create the pool without opening a connection
    pub fn connect_lazy(database_url: &str, config: PoolConfiguration) -> Result<Self> {
        config.validate()?;
        let pool = config
            .pool_options()
            .connect_lazy(database_url)
            .map_err(|e| StoreError::from_sqlx("connect", e, config.acquire_timeout))?;
        Ok(Self { pool, config })
    }

    /// Wrap an existing pool, e.g. one provisioned by `#[sqlx::test]`
    pub fn from_pool(pool: PgPool, config: PoolConfiguration) -> Self {
        Self { pool, config }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn config(&self) -> &PoolConfiguration {
        &self.config
    }

    /// Borrow a connection for one operation.
    ///
    /// The returned guard gives the connection back when dropped.
    pub async fn acquire(&self, operation: &'static str) -> Result<PoolConnection<Postgres>> {
        if self.pool.is_closed() {
            return Err(StoreError::PoolClosed { operation });
        }

        let timeout = self.config.acquire_timeout;
        let started = Instant::now();
        match tokio::time::timeout(timeout, self.pool.acquire()).await {
            Ok(Ok(connection)) => {
                debug!(
                    operation = operation,
                    waited_ms = started.elapsed().as_millis() as u64,
                    "Acquired pooled connection"
                );
                Ok(connection)
            }
            Ok(Err(error)) => Err(StoreError::from_sqlx(operation, error, timeout)),
            Err(_elapsed) => {
                warn!(
                    operation = operation,
                    timeout_ms = timeout.as_millis() as u64,
                    "⏳ POOL: acquisition timed out"
                );
                Err(StoreError::ConnectionTimeout { operation, timeout })
            }
        }
    }

    /// `SELECT 1` round trip
    pub async fn health_check(&self) -> Result<bool> {
        let mut connection = self.acquire("health_check").await?;
        let (health,): (i32,) = sqlx::query_as("SELECT 1")
            .fetch_one(&mut *connection)
            .await
            .map_err(|e| StoreError::from_sqlx("health_check", e, self.config.acquire_timeout))?;
        Ok(health == 1)
    }

    pub fn statistics(&self) -> PoolStatistics {
        PoolStatistics {
            size: self.pool.size(),
            idle: self.pool.num_idle() as u32,
            max_connections: self.config.max_connections,
            acquire_timeout_ms: self.config.acquire_timeout.as_millis() as u64,
            is_closed: self.pool.is_closed(),
        }
    }

    /// Wait for checked-out connections to return, then close them all
    pub async fn close(&self) {
        info!(size = self.pool.size(), "🔌 POOL: closing");
        self.pool.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

/// Admission control with pool semantics for backends without a real pool.
///
/// At most `capacity` operations hold a permit at once; further callers queue
/// until a permit is released or the acquisition timeout passes.
#[derive(Debug, Clone)]
pub struct PoolGate {
    semaphore: Arc<Semaphore>,
    capacity: u32,
    acquire_timeout: Duration,
}

/// A held slot; released on drop
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

impl PoolGate {
    pub fn new(capacity: u32, acquire_timeout: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity as usize)),
            capacity,
            acquire_timeout,
        }
    }

    pub fn from_config(config: &PoolConfiguration) -> Self {
        Self::new(config.max_connections, config.acquire_timeout)
    }

    pub async fn acquire(&self, operation: &'static str) -> Result<GatePermit> {
        let timeout = self.acquire_timeout;
        match tokio::time::timeout(timeout, self.semaphore.clone().acquire_owned()).await {
            Ok(Ok(permit)) => Ok(GatePermit { _permit: permit }),
            // acquire_owned only fails once the semaphore is closed
            Ok(Err(_closed)) => Err(StoreError::PoolClosed { operation }),
            Err(_elapsed) => Err(StoreError::ConnectionTimeout { operation, timeout }),
        }
    }

    /// Refuse new acquisitions; held permits stay valid until dropped
    pub fn close(&self) {
        self.semaphore.close();
    }

    /// Wait for every held permit to come back, then close.
    ///
    /// Callers that queue behind the drain are refused once it completes.
    /// Gives up waiting after the acquisition timeout and closes anyway.
    pub async fn drain(&self) {
        let all = self.semaphore.acquire_many(self.capacity);
        match tokio::time::timeout(self.acquire_timeout, all).await {
            Ok(Ok(_permits)) => self.semaphore.close(),
            Ok(Err(_closed)) => {}
            Err(_elapsed) => {
                warn!(
                    in_use = self.in_use(),
                    timeout_ms = self.acquire_timeout.as_millis() as u64,
                    "⏳ GATE: closing with permits still held"
                );
                self.semaphore.close();
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn available(&self) -> u32 {
        self.semaphore.available_permits() as u32
    }

    pub fn in_use(&self) -> u32 {
        self.capacity.saturating_sub(self.available())
    }

    pub fn statistics(&self) -> PoolStatistics {
        PoolStatistics {
            size: self.in_use(),
            idle: 0,
            max_connections: self.capacity,
            acquire_timeout_ms: self.acquire_timeout.as_millis() as u64,
            is_closed: self.is_closed(),
        }
    }
}
