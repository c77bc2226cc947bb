//! The store seam: one trait, one method per ingestion operation and per
//! catalog query.
//!
//! Rows are append-only. The trait has no update or delete method, and no
//! implementation may add one.

use crate::error::Result;
use crate::models::insights::{
    AuditLogParams, AuditLogRow, HomeStats, HomeStatsParams, HttpListParams, HttpListRow,
    HttpMetrics, HttpMetricsParams, StatusBucket, StatusDay,
};
use crate::models::{AuditLogEntry, ProbeResult};
use crate::response::QueryResponse;
use async_trait::async_trait;

/// Storage backend for probe results and audit events.
///
/// Every method borrows a pooled connection (or gate permit) for its own
/// duration only and validates its input before touching storage.
#[async_trait]
pub trait ProbeStore: Send + Sync {
    /// Short backend name used in logs
    fn backend(&self) -> &'static str;

    /// Most operations that can hold a connection (or permit) at once
    fn capacity(&self) -> usize;

    /// Append one probe result to the table its variant selects
    async fn insert(&self, result: &ProbeResult) -> Result<()>;

    /// Append one audit event
    async fn insert_audit_log(&self, entry: &AuditLogEntry) -> Result<()>;

    /// HTTP plus TCP run count in a rolling window
    async fn home_stats(&self, params: &HomeStatsParams) -> Result<QueryResponse<HomeStats>>;

    /// One monitor's HTTP runs, newest first
    async fn http_list_daily(&self, params: &HttpListParams)
        -> Result<QueryResponse<HttpListRow>>;

    /// Percentiles and status counts over `params.period`
    async fn http_metrics(&self, params: &HttpMetricsParams)
        -> Result<QueryResponse<HttpMetrics>>;

    /// [`ProbeStore::http_metrics`] pinned to the trailing day
    async fn http_metrics_daily(
        &self,
        monitor_id: &str,
        regions: &[crate::constants::Region],
    ) -> Result<QueryResponse<HttpMetrics>> {
        let params = HttpMetricsParams::new(monitor_id).with_regions(regions.iter().copied());
        self.http_metrics(&params).await
    }

    /// Runs per UTC day over the trailing week
    async fn http_status_weekly(&self, monitor_id: &str) -> Result<QueryResponse<StatusDay>>;

    /// Runs per second over the trailing 45 days
    async fn http_status_45d(&self, monitor_id: &str) -> Result<QueryResponse<StatusBucket>>;

    /// Recent audit events, newest first
    async fn audit_log(&self, params: &AuditLogParams) -> Result<QueryResponse<AuditLogRow>>;

    /// Drain and refuse further work
    async fn close(&self);

    fn is_closed(&self) -> bool;
}
