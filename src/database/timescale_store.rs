//! TimescaleDB-backed [`ProbeStore`].
//!
//! One statement per operation on a connection borrowed from [`ProbePool`].
//! The connection guard lives only inside the operation, so it is returned
//! on every exit path, including early `?` returns.

use super::connection_pool::{PoolConfiguration, PoolStatistics, ProbePool};
use super::store::ProbeStore;
use super::RowCount;
use crate::config::MetricsConfig;
use crate::constants::tables;
use crate::constants::windows::DEFAULT_AUDIT_INTERVAL_DAYS;
use crate::error::{Result, StoreError};
use crate::logging::{log_error, log_store_operation};
use crate::models::insights::{
    AuditLogParams, AuditLogRow, HomeStats, HomeStatsParams, HttpListParams, HttpListRow,
    HttpMetrics, HttpMetricsParams, StatusBucket, StatusDay,
};
use crate::models::{AuditLogEntry, ProbeResult};
use crate::response::QueryResponse;
use async_trait::async_trait;
use chrono::Utc;
use std::future::Future;
use std::time::Instant;
use tracing::debug;

const BACKEND: &str = "timescale";

#[derive(Debug, Clone)]
pub struct TimescaleStore {
    pool: ProbePool,
    audit_default_days: u32,
}

impl TimescaleStore {
    pub fn new(pool: ProbePool) -> Self {
        Self {
            pool,
            audit_default_days: DEFAULT_AUDIT_INTERVAL_DAYS,
        }
    }

    /// Connect using loaded configuration
    pub async fn from_config(config: &MetricsConfig) -> Result<Self> {
        let url = config.database.database_url()?;
        let pool = ProbePool::connect(url, PoolConfiguration::from_config(&config.database)).await?;
        Ok(Self::new(pool).with_audit_default_days(config.audit.default_interval_days))
    }

    pub fn with_audit_default_days(mut self, days: u32) -> Self {
        self.audit_default_days = days;
        self
    }

    pub fn pool(&self) -> &ProbePool {
        &self.pool
    }

    pub fn statistics(&self) -> PoolStatistics {
        self.pool.statistics()
    }

    fn storage_error(&self, operation: &'static str, error: sqlx::Error) -> StoreError {
        StoreError::from_sqlx(operation, error, self.pool.config().acquire_timeout)
    }

    /// Run one operation, logging its outcome
    async fn observe<T, F>(&self, operation: &'static str, work: F) -> Result<T>
    where
        T: RowCount,
        F: Future<Output = Result<T>>,
    {
        let started = Instant::now();
        let outcome = work.await;
        match &outcome {
            Ok(value) => log_store_operation(BACKEND, operation, value.row_count(), started.elapsed()),
            Err(error) => log_error(BACKEND, operation, error),
        }
        outcome
    }
}

#[async_trait]
impl ProbeStore for TimescaleStore {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    fn capacity(&self) -> usize {
        self.pool.config().max_connections as usize
    }

    async fn insert(&self, result: &ProbeResult) -> Result<()> {
        const OPERATION: &str = "insert";
        self.observe(OPERATION, async {
            result.validate()?;
            let mut conn = self.pool.acquire(OPERATION).await?;
            debug!(table = result.table(), monitor_id = result.monitor_id(), "Appending probe result");
            result
                .insert(&mut conn)
                .await
                .map_err(|e| self.storage_error(OPERATION, e))
        })
        .await
    }

    async fn insert_audit_log(&self, entry: &AuditLogEntry) -> Result<()> {
        const OPERATION: &str = "insert_audit_log";
        self.observe(OPERATION, async {
            entry.validate()?;
            let mut conn = self.pool.acquire(OPERATION).await?;
            debug!(table = tables::AUDIT_LOGS, action = %entry.action, "Appending audit event");
            entry
                .insert(&mut conn)
                .await
                .map_err(|e| self.storage_error(OPERATION, e))
        })
        .await
    }

    async fn home_stats(&self, params: &HomeStatsParams) -> Result<QueryResponse<HomeStats>> {
        const OPERATION: &str = "home_stats";
        self.observe(OPERATION, async {
            let started = Instant::now();
            let mut conn = self.pool.acquire(OPERATION).await?;
            let stats = HomeStats::fetch(&mut conn, params.cutoff(Utc::now()))
                .await
                .map_err(|e| self.storage_error(OPERATION, e))?;
            Ok(QueryResponse::single(stats, started.elapsed()))
        })
        .await
    }

    async fn http_list_daily(
        &self,
        params: &HttpListParams,
    ) -> Result<QueryResponse<HttpListRow>> {
        const OPERATION: &str = "http_list_daily";
        self.observe(OPERATION, async {
            params.validate()?;
            let started = Instant::now();
            let mut conn = self.pool.acquire(OPERATION).await?;
            let records = HttpListRow::fetch(&mut conn, params, Utc::now())
                .await
                .map_err(|e| self.storage_error(OPERATION, e))?;
            let rows = records
                .into_iter()
                .map(HttpListRow::try_from)
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| StoreError::storage(OPERATION, e))?;
            Ok(QueryResponse::new(rows, started.elapsed()))
        })
        .await
    }

    async fn http_metrics(
        &self,
        params: &HttpMetricsParams,
    ) -> Result<QueryResponse<HttpMetrics>> {
        const OPERATION: &str = "http_metrics";
        self.observe(OPERATION, async {
            params.validate()?;
            let started = Instant::now();
            let mut conn = self.pool.acquire(OPERATION).await?;
            let metrics = HttpMetrics::fetch(&mut conn, params, Utc::now())
                .await
                .map_err(|e| self.storage_error(OPERATION, e))?;
            Ok(QueryResponse::single(metrics, started.elapsed()))
        })
        .await
    }

    async fn http_status_weekly(&self, monitor_id: &str) -> Result<QueryResponse<StatusDay>> {
        const OPERATION: &str = "http_status_weekly";
        self.observe(OPERATION, async {
            super::require_monitor_id(monitor_id)?;
            let started = Instant::now();
            let mut conn = self.pool.acquire(OPERATION).await?;
            let days = StatusDay::fetch(&mut conn, monitor_id, Utc::now())
                .await
                .map_err(|e| self.storage_error(OPERATION, e))?;
            Ok(QueryResponse::new(days, started.elapsed()))
        })
        .await
    }

    async fn http_status_45d(&self, monitor_id: &str) -> Result<QueryResponse<StatusBucket>> {
        const OPERATION: &str = "http_status_45d";
        self.observe(OPERATION, async {
            super::require_monitor_id(monitor_id)?;
            let started = Instant::now();
            let mut conn = self.pool.acquire(OPERATION).await?;
            let buckets = StatusBucket::fetch(&mut conn, monitor_id, Utc::now())
                .await
                .map_err(|e| self.storage_error(OPERATION, e))?;
            Ok(QueryResponse::new(buckets, started.elapsed()))
        })
        .await
    }

    async fn audit_log(&self, params: &AuditLogParams) -> Result<QueryResponse<AuditLogRow>> {
        const OPERATION: &str = "audit_log";
        self.observe(OPERATION, async {
            let days = params.resolve_interval(self.audit_default_days)?;
            let started = Instant::now();
            let mut conn = self.pool.acquire(OPERATION).await?;
            let records = AuditLogRow::fetch(&mut conn, params.monitor_id.as_deref(), days)
                .await
                .map_err(|e| self.storage_error(OPERATION, e))?;
            let rows = records.into_iter().map(AuditLogRow::from).collect();
            Ok(QueryResponse::new(rows, started.elapsed()))
        })
        .await
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}
