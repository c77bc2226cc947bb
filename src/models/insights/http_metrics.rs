//! # Per-Monitor HTTP Metrics
//!
//! Latency percentiles and status counts for one monitor over a rolling
//! period, optionally restricted to a set of regions. Always exactly one row:
//! an empty window yields zero counts, zero percentiles and a null
//! `lastTimestamp`.
//!
//! Percentiles are continuous (`PERCENTILE_CONT`): the value at position
//! `p * (n - 1)` in the ascending latencies, linearly interpolated between the
//! two neighbouring samples.

use super::classification::{
    RequestStatus, StatusCounts, DEGRADED_PREDICATE, ERROR_PREDICATE, SUCCESS_PREDICATE,
};
use super::percentile_cont;
use crate::constants::{Period, Region};
use crate::models::probe_result::HttpResponse;
use crate::validation::{IssueKind, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpMetricsParams {
    pub monitor_id: String,
    #[serde(default)]
    pub period: Period,
    /// Empty means every region
    #[serde(default)]
    pub regions: Vec<Region>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct HttpMetrics {
    pub p50_latency: f64,
    pub p75_latency: f64,
    pub p90_latency: f64,
    pub p95_latency: f64,
    pub p99_latency: f64,
    pub count: i64,
    pub success: i64,
    pub degraded: i64,
    pub error: i64,
    /// Epoch milliseconds of the newest run in the window
    pub last_timestamp: Option<i64>,
}

impl HttpMetricsParams {
    pub fn new(monitor_id: impl Into<String>) -> Self {
        Self {
            monitor_id: monitor_id.into(),
            period: Period::default(),
            regions: Vec::new(),
        }
    }

    pub fn with_period(mut self, period: Period) -> Self {
        self.period = period;
        self
    }

    pub fn with_regions(mut self, regions: impl IntoIterator<Item = Region>) -> Self {
        self.regions = regions.into_iter().collect();
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.monitor_id.trim().is_empty() {
            return Err(ValidationError::parameter("monitorId", IssueKind::Empty));
        }
        Ok(())
    }

    fn includes(&self, region: Region) -> bool {
        self.regions.is_empty() || self.regions.contains(&region)
    }

    /// Region codes to bind, `None` when unrestricted
    fn region_codes(&self) -> Option<Vec<String>> {
        if self.regions.is_empty() {
            None
        } else {
            Some(self.regions.iter().map(|r| r.as_str().to_string()).collect())
        }
    }
}

impl HttpMetrics {
    pub fn empty() -> Self {
        Self {
            p50_latency: 0.0,
            p75_latency: 0.0,
            p90_latency: 0.0,
            p95_latency: 0.0,
            p99_latency: 0.0,
            count: 0,
            success: 0,
            degraded: 0,
            error: 0,
            last_timestamp: None,
        }
    }

    pub fn ok(&self) -> i64 {
        self.success + self.degraded
    }

    pub fn project<'a, I>(responses: I, params: &HttpMetricsParams, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = &'a HttpResponse>,
    {
        let cutoff = params.period.cutoff(now);
        let matching: Vec<&HttpResponse> = responses
            .into_iter()
            .filter(|r| {
                r.monitor_id == params.monitor_id && r.time >= cutoff && params.includes(r.region)
            })
            .collect();

        let mut latencies: Vec<f64> = matching.iter().map(|r| r.latency as f64).collect();
        latencies.sort_by(f64::total_cmp);

        let counts: StatusCounts = matching
            .iter()
            .map(|r| RequestStatus::classify(r.error, r.status_code))
            .collect();

        Self {
            p50_latency: percentile_cont(&latencies, 0.50),
            p75_latency: percentile_cont(&latencies, 0.75),
            p90_latency: percentile_cont(&latencies, 0.90),
            p95_latency: percentile_cont(&latencies, 0.95),
            p99_latency: percentile_cont(&latencies, 0.99),
            count: counts.count,
            success: counts.success,
            degraded: counts.degraded,
            error: counts.error,
            last_timestamp: matching.iter().map(|r| r.time.timestamp_millis()).max(),
        }
    }

    pub async fn fetch(
        conn: &mut PgConnection,
        params: &HttpMetricsParams,
        now: DateTime<Utc>,
    ) -> Result<HttpMetrics, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT
                COALESCE(PERCENTILE_CONT(0.50) WITHIN GROUP (ORDER BY latency), 0)::float8 AS p50_latency,
                COALESCE(PERCENTILE_CONT(0.75) WITHIN GROUP (ORDER BY latency), 0)::float8 AS p75_latency,
                COALESCE(PERCENTILE_CONT(0.90) WITHIN GROUP (ORDER BY latency), 0)::float8 AS p90_latency,
                COALESCE(PERCENTILE_CONT(0.95) WITHIN GROUP (ORDER BY latency), 0)::float8 AS p95_latency,
                COALESCE(PERCENTILE_CONT(0.99) WITHIN GROUP (ORDER BY latency), 0)::float8 AS p99_latency,
                COUNT(*) AS count,
                COUNT(*) FILTER (WHERE {SUCCESS_PREDICATE}) AS success,
                COUNT(*) FILTER (WHERE {DEGRADED_PREDICATE}) AS degraded,
                COUNT(*) FILTER (WHERE {ERROR_PREDICATE}) AS error,
                FLOOR(EXTRACT(EPOCH FROM MAX(time)) * 1000)::int8 AS last_timestamp
            FROM http_responses
            WHERE monitor_id = $1
              AND time >= $2
              AND ($3::text[] IS NULL OR region = ANY($3))
            "#
        );
        sqlx::query_as::<_, HttpMetrics>(&sql)
            .bind(&params.monitor_id)
            .bind(params.period.cutoff(now))
            .bind(params.region_codes())
            .fetch_one(conn)
            .await
    }
}
