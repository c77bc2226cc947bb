//! In-process [`ProbeStore`] with the same semantics as the Postgres backend.
//!
//! Rows live in append-only vectors. Every operation holds a [`PoolGate`]
//! permit for its duration, so pool exhaustion, acquisition timeouts and
//! shutdown behave as they do against a real database.

use super::connection_pool::{PoolConfiguration, PoolGate, PoolStatistics};
use super::store::ProbeStore;
use super::RowCount;
use crate::constants::windows::DEFAULT_AUDIT_INTERVAL_DAYS;
use crate::error::Result;
use crate::logging::{log_error, log_store_operation};
use crate::models::insights::{
    AuditLogParams, AuditLogRow, HomeStats, HomeStatsParams, HttpListParams, HttpListRow,
    HttpMetrics, HttpMetricsParams, StatusBucket, StatusDay,
};
use crate::models::{AuditLogEntry, HttpResponse, ProbeResult, TcpResponse};
use crate::response::QueryResponse;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::future::Future;
use std::time::Instant;

const BACKEND: &str = "memory";

#[derive(Debug, Default)]
struct Tables {
    http_responses: Vec<HttpResponse>,
    tcp_responses: Vec<TcpResponse>,
    audit_logs: Vec<AuditLogEntry>,
}

#[derive(Debug)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    gate: PoolGate,
    audit_default_days: u32,
    /// Fixed "now" for reproducible windows; wall clock when `None`
    pinned_now: Option<DateTime<Utc>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(PoolConfiguration::default())
    }
}

impl MemoryStore {
    pub fn new(config: PoolConfiguration) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            gate: PoolGate::from_config(&config),
            audit_default_days: DEFAULT_AUDIT_INTERVAL_DAYS,
            pinned_now: None,
        }
    }

    /// Evaluate every window relative to `now` instead of the wall clock
    pub fn pinned_at(mut self, now: DateTime<Utc>) -> Self {
        self.pinned_now = Some(now);
        self
    }

    pub fn with_audit_default_days(mut self, days: u32) -> Self {
        self.audit_default_days = days;
        self
    }

    pub fn gate(&self) -> &PoolGate {
        &self.gate
    }

    pub fn statistics(&self) -> PoolStatistics {
        self.gate.statistics()
    }

    /// Stored row counts: HTTP, TCP, audit
    pub fn row_counts(&self) -> (usize, usize, usize) {
        let tables = self.tables.read();
        (
            tables.http_responses.len(),
            tables.tcp_responses.len(),
            tables.audit_logs.len(),
        )
    }

    fn now(&self) -> DateTime<Utc> {
        self.pinned_now.unwrap_or_else(Utc::now)
    }

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
impl ProbeStore for MemoryStore {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    fn capacity(&self) -> usize {
        self.gate.capacity() as usize
    }

    async fn insert(&self, result: &ProbeResult) -> Result<()> {
        const OPERATION: &str = "insert";
        self.observe(OPERATION, async {
            result.validate()?;
            let _permit = self.gate.acquire(OPERATION).await?;
            let mut tables = self.tables.write();
            match result {
                ProbeResult::Http(response) => tables.http_responses.push(response.clone()),
                ProbeResult::Tcp(response) => tables.tcp_responses.push(response.clone()),
            }
            Ok(())
        })
        .await
    }

    async fn insert_audit_log(&self, entry: &AuditLogEntry) -> Result<()> {
        const OPERATION: &str = "insert_audit_log";
        self.observe(OPERATION, async {
            entry.validate()?;
            let _permit = self.gate.acquire(OPERATION).await?;
            let mut stored = entry.clone();
            stored.version = entry.effective_version();
            self.tables.write().audit_logs.push(stored);
            Ok(())
        })
        .await
    }

    async fn home_stats(&self, params: &HomeStatsParams) -> Result<QueryResponse<HomeStats>> {
        const OPERATION: &str = "home_stats";
        self.observe(OPERATION, async {
            let started = Instant::now();
            let _permit = self.gate.acquire(OPERATION).await?;
            let tables = self.tables.read();
            let times = tables
                .http_responses
                .iter()
                .map(|r| r.time)
                .chain(tables.tcp_responses.iter().map(|r| r.time));
            let stats = HomeStats::project(times, params.cutoff(self.now()));
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
            let _permit = self.gate.acquire(OPERATION).await?;
            let rows = HttpListRow::project(&self.tables.read().http_responses, params, self.now());
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
            let _permit = self.gate.acquire(OPERATION).await?;
            let metrics = HttpMetrics::project(&self.tables.read().http_responses, params, self.now());
            Ok(QueryResponse::single(metrics, started.elapsed()))
        })
        .await
    }

    async fn http_status_weekly(&self, monitor_id: &str) -> Result<QueryResponse<StatusDay>> {
        const OPERATION: &str = "http_status_weekly";
        self.observe(OPERATION, async {
            super::require_monitor_id(monitor_id)?;
            let started = Instant::now();
            let _permit = self.gate.acquire(OPERATION).await?;
            let days = StatusDay::project(&self.tables.read().http_responses, monitor_id, self.now());
            Ok(QueryResponse::new(days, started.elapsed()))
        })
        .await
    }

    async fn http_status_45d(&self, monitor_id: &str) -> Result<QueryResponse<StatusBucket>> {
        const OPERATION: &str = "http_status_45d";
        self.observe(OPERATION, async {
            super::require_monitor_id(monitor_id)?;
            let started = Instant::now();
            let _permit = self.gate.acquire(OPERATION).await?;
            let buckets =
                StatusBucket::project(&self.tables.read().http_responses, monitor_id, self.now());
            Ok(QueryResponse::new(buckets, started.elapsed()))
        })
        .await
    }

    async fn audit_log(&self, params: &AuditLogParams) -> Result<QueryResponse<AuditLogRow>> {
        const OPERATION: &str = "audit_log";
        self.observe(OPERATION, async {
            let days = params.resolve_interval(self.audit_default_days)?;
            let started = Instant::now();
            let _permit = self.gate.acquire(OPERATION).await?;
            let rows = AuditLogRow::project(
                &self.tables.read().audit_logs,
                params.monitor_id.as_deref(),
                days,
                self.now(),
            );
            Ok(QueryResponse::new(rows, started.elapsed()))
        })
        .await
    }

    async fn close(&self) {
        self.gate.drain().await;
    }

    fn is_closed(&self) -> bool {
        self.gate.is_closed()
    }
}
