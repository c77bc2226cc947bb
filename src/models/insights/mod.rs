//! # Aggregation Query Catalog
//!
//! Row shapes of the fixed read-side catalog. Each query lives in its own
//! module and comes in two renditions that must agree:
//!
//! - `fetch`: one SQL statement against the `http_responses`, `tcp_responses`
//!   and `audit_logs` tables, run on a borrowed pooled connection
//! - `project`: the same computation over in-memory rows, used by
//!   [`MemoryStore`](crate::database::MemoryStore)
//!
//! ## Queries
//!
//! - [`HomeStats`]: probe runs across both protocols in a rolling window
//! - [`HttpListRow`]: one monitor's HTTP runs, newest first
//! - [`HttpMetrics`]: latency percentiles and status counts
//! - [`StatusDay`] / [`StatusBucket`]: daily and per-second availability
//! - [`AuditLogRow`]: recent audit events
//!
//! None of these are tables; rows are computed on every call and nothing is
//! cached.

pub mod audit_trail;
pub mod classification;
pub mod home_stats;
pub mod http_list;
pub mod http_metrics;
pub mod status_rollup;

pub use audit_trail::{AuditLogParams, AuditLogRow};
pub use classification::{RequestStatus, StatusCounts};
pub use home_stats::{HomeStats, HomeStatsParams};
pub use http_list::{HttpListParams, HttpListRow, TimeRange};
pub use http_metrics::{HttpMetrics, HttpMetricsParams};
pub use status_rollup::{StatusBucket, StatusDay};

/// Continuous percentile of ascending `sorted` values.
///
/// Position `p * (n - 1)`, linearly interpolated. Empty input yields `0.0`,
/// matching `COALESCE(PERCENTILE_CONT(p), 0)`.
pub fn percentile_cont(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let p = p.clamp(0.0, 1.0);
    let position = p * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}
