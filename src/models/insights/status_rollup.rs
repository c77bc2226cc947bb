//! # Status Rollups
//!
//! Two per-monitor availability histograms over HTTP runs:
//!
//! - [`StatusDay`]: trailing 7 days, one row per UTC calendar day that has runs
//! - [`StatusBucket`]: trailing 45 days, one row per second that has runs
//!
//! Both are ascending and sparse; empty days or seconds produce no row.

use super::classification::{
    RequestStatus, StatusCounts, DEGRADED_PREDICATE, ERROR_PREDICATE, OK_PREDICATE,
};
use crate::constants::windows;
use crate::models::probe_result::HttpResponse;
use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection};
use std::collections::BTreeMap;

/// Runs of one UTC calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct StatusDay {
    /// Midnight UTC of the day
    pub day: DateTime<Utc>,
    pub count: i64,
    /// Success plus degraded
    pub ok: i64,
}

/// Runs that started within the same second
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct StatusBucket {
    pub timestamp: DateTime<Utc>,
    pub count: i64,
    pub ok: i64,
    pub error: i64,
    pub degraded: i64,
}

fn start_of_day(time: DateTime<Utc>) -> DateTime<Utc> {
    time.duration_trunc(Duration::days(1)).unwrap_or(time)
}

fn start_of_second(time: DateTime<Utc>) -> DateTime<Utc> {
    time.duration_trunc(Duration::seconds(1)).unwrap_or(time)
}

/// Group matching runs by `bucket`, ascending
fn tally<'a, I>(
    responses: I,
    monitor_id: &str,
    cutoff: DateTime<Utc>,
    bucket: fn(DateTime<Utc>) -> DateTime<Utc>,
) -> BTreeMap<DateTime<Utc>, StatusCounts>
where
    I: IntoIterator<Item = &'a HttpResponse>,
{
    let mut buckets: BTreeMap<DateTime<Utc>, StatusCounts> = BTreeMap::new();
    for response in responses {
        if response.monitor_id != monitor_id || response.time < cutoff {
            continue;
        }
        buckets
            .entry(bucket(response.time))
            .or_default()
            .record(RequestStatus::classify(response.error, response.status_code));
    }
    buckets
}

impl StatusDay {
    pub fn project<'a, I>(responses: I, monitor_id: &str, now: DateTime<Utc>) -> Vec<Self>
    where
        I: IntoIterator<Item = &'a HttpResponse>,
    {
        let cutoff = now - windows::weekly_status();
        tally(responses, monitor_id, cutoff, start_of_day)
            .into_iter()
            .map(|(day, counts)| StatusDay {
                day,
                count: counts.count,
                ok: counts.ok(),
            })
            .collect()
    }

    pub async fn fetch(
        conn: &mut PgConnection,
        monitor_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<StatusDay>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT
                date_trunc('day', time AT TIME ZONE 'UTC') AT TIME ZONE 'UTC' AS day,
                COUNT(*) AS count,
                COUNT(*) FILTER (WHERE {OK_PREDICATE}) AS ok
            FROM http_responses
            WHERE monitor_id = $1 AND time >= $2
            GROUP BY 1
            ORDER BY 1
            "#
        );
        sqlx::query_as::<_, StatusDay>(&sql)
            .bind(monitor_id)
            .bind(now - windows::weekly_status())
            .fetch_all(conn)
            .await
    }
}

impl StatusBucket {
    pub fn project<'a, I>(responses: I, monitor_id: &str, now: DateTime<Utc>) -> Vec<Self>
    where
        I: IntoIterator<Item = &'a HttpResponse>,
    {
        let cutoff = now - windows::status_histogram();
        tally(responses, monitor_id, cutoff, start_of_second)
            .into_iter()
            .map(|(timestamp, counts)| StatusBucket {
                timestamp,
                count: counts.count,
                ok: counts.ok(),
                error: counts.error,
                degraded: counts.degraded,
            })
            .collect()
    }

    pub async fn fetch(
        conn: &mut PgConnection,
        monitor_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<StatusBucket>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT
                date_trunc('second', time) AS timestamp,
                COUNT(*) AS count,
                COUNT(*) FILTER (WHERE {OK_PREDICATE}) AS ok,
                COUNT(*) FILTER (WHERE {ERROR_PREDICATE}) AS error,
                COUNT(*) FILTER (WHERE {DEGRADED_PREDICATE}) AS degraded
            FROM http_responses
            WHERE monitor_id = $1 AND time >= $2
            GROUP BY 1
            ORDER BY 1
            "#
        );
        sqlx::query_as::<_, StatusBucket>(&sql)
            .bind(monitor_id)
            .bind(now - windows::status_histogram())
            .fetch_all(conn)
            .await
    }
}
