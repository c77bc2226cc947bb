//! # Per-Monitor HTTP Run List
//!
//! Every HTTP run of one monitor inside a time window, newest first, with the
//! timing block decomposed into phases and the run classified.
//!
//! The default window is the trailing 24 hours. A caller may pass an explicit
//! [`TimeRange`], whose bounds are both inclusive.

use super::classification::RequestStatus;
use crate::constants::{windows, JobType, Region, Trigger, UnknownVariant};
use crate::models::probe_result::HttpResponse;
use crate::models::timing::{decompose_value, TimingPhases};
use crate::validation::{IssueKind, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection};

/// Inclusive `[from, to]` window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpListParams {
    pub monitor_id: String,
    pub range: Option<TimeRange>,
}

/// Resolved bounds of a list query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListWindow {
    pub from: DateTime<Utc>,
    /// `None` means open-ended
    pub to: Option<DateTime<Utc>>,
}

/// One row of the list, shaped like the analytics API's `http_list` pipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpListRow {
    /// Always `http`
    #[serde(rename = "type")]
    pub kind: JobType,
    /// Always null; kept for shape compatibility
    pub id: Option<String>,
    pub monitor_id: String,
    pub latency: i64,
    pub status_code: Option<i32>,
    pub region: Region,
    pub cron_timestamp: i64,
    /// Epoch milliseconds
    pub timestamp: i64,
    /// `None` when the run had no timing or it could not be decomposed
    pub timing: Option<TimingPhases>,
    pub request_status: RequestStatus,
    pub trigger: Trigger,
}

/// Raw `http_responses` columns read by the list query
#[derive(Debug, Clone, FromRow)]
pub struct HttpListRecord {
    pub time: DateTime<Utc>,
    pub monitor_id: String,
    pub latency: i64,
    pub status_code: Option<i32>,
    pub region: String,
    pub cron_timestamp: i64,
    pub timing: Option<Json<Value>>,
    pub error: bool,
    pub trigger: Option<String>,
}

impl TimeRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        self.from <= time && time <= self.to
    }
}

impl HttpListParams {
    pub fn new(monitor_id: impl Into<String>) -> Self {
        Self {
            monitor_id: monitor_id.into(),
            range: None,
        }
    }

    pub fn with_range(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.range = Some(TimeRange::new(from, to));
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.monitor_id.trim().is_empty() {
            return Err(ValidationError::parameter("monitorId", IssueKind::Empty));
        }
        if let Some(range) = &self.range {
            if range.from > range.to {
                return Err(ValidationError::parameter(
                    "range",
                    IssueKind::OutOfRange {
                        reason: format!("from ({}) is after to ({})", range.from, range.to),
                    },
                ));
            }
        }
        Ok(())
    }

    pub fn window(&self, now: DateTime<Utc>) -> ListWindow {
        match self.range {
            Some(range) => ListWindow {
                from: range.from,
                to: Some(range.to),
            },
            None => ListWindow {
                from: now - windows::daily_list(),
                to: None,
            },
        }
    }
}

impl ListWindow {
    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        time >= self.from && self.to.map_or(true, |to| time <= to)
    }
}

impl HttpListRow {
    /// Project a stored response into a list row
    pub fn from_response(response: &HttpResponse) -> Self {
        Self {
            kind: JobType::Http,
            id: None,
            monitor_id: response.monitor_id.clone(),
            latency: response.latency,
            status_code: response.status_code,
            region: response.region,
            cron_timestamp: response.cron_timestamp,
            timestamp: response.time.timestamp_millis(),
            timing: response.timing.as_ref().map(|timing| timing.phases()),
            request_status: RequestStatus::classify(response.error, response.status_code),
            trigger: response.effective_trigger(),
        }
    }

    /// Rows for one monitor inside the window, newest first
    pub fn project<'a, I>(responses: I, params: &HttpListParams, now: DateTime<Utc>) -> Vec<Self>
    where
        I: IntoIterator<Item = &'a HttpResponse>,
    {
        let window = params.window(now);
        let mut matching: Vec<&HttpResponse> = responses
            .into_iter()
            .filter(|r| r.monitor_id == params.monitor_id && window.contains(r.time))
            .collect();
        matching.sort_by(|a, b| b.time.cmp(&a.time));
        matching.into_iter().map(Self::from_response).collect()
    }

    pub async fn fetch(
        conn: &mut PgConnection,
        params: &HttpListParams,
        now: DateTime<Utc>,
    ) -> Result<Vec<HttpListRecord>, sqlx::Error> {
        let window = params.window(now);
        sqlx::query_as::<_, HttpListRecord>(
            r#"
            SELECT time, monitor_id, latency, status_code, region, cron_timestamp,
                   timing, error, trigger
            FROM http_responses
            WHERE monitor_id = $1
              AND time >= $2
              AND ($3::timestamptz IS NULL OR time <= $3)
            ORDER BY time DESC
            "#,
        )
        .bind(&params.monitor_id)
        .bind(window.from)
        .bind(window.to)
        .fetch_all(conn)
        .await
    }
}

impl TryFrom<HttpListRecord> for HttpListRow {
    type Error = UnknownVariant;

    fn try_from(record: HttpListRecord) -> Result<Self, Self::Error> {
        let region = record.region.parse::<Region>()?;
        let trigger = match record.trigger.as_deref() {
            Some(raw) => raw.parse::<Trigger>()?,
            None => Trigger::default(),
        };
        Ok(Self {
            kind: JobType::Http,
            id: None,
            monitor_id: record.monitor_id,
            latency: record.latency,
            status_code: record.status_code,
            region,
            cron_timestamp: record.cron_timestamp,
            timestamp: record.time.timestamp_millis(),
            timing: record.timing.as_ref().and_then(|Json(value)| decompose_value(value)),
            request_status: RequestStatus::classify(record.error, record.status_code),
            trigger,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;
    use url::Url;

    fn response(monitor: &str, time: DateTime<Utc>, status: i32) -> HttpResponse {
        HttpResponse::new(
            monitor,
            "1",
            Region::Ams,
            Url::parse("https://example.com").unwrap(),
            50,
        )
        .with_time(time)
        .with_status_code(status)
    }

    #[test]
    fn test_project_filters_and_orders_newest_first() {
        let now = Utc::now();
        let rows = vec![
            response("m1", now - Duration::hours(3), 200),
            response("m1", now - Duration::hours(1), 404),
            response("m2", now - Duration::hours(1), 200),
            response("m1", now - Duration::hours(30), 200),
        ];
        let listed = HttpListRow::project(&rows, &HttpListParams::new("m1"), now);
        assert_eq!(listed.len(), 2);
        assert!(listed[0].timestamp > listed[1].timestamp);
        assert_eq!(listed[0].request_status, RequestStatus::Error);
    }

    #[test]
    fn test_explicit_range_is_inclusive() {
        let now = Utc::now();
        let from = now - Duration::days(3);
        let to = now - Duration::days(2);
        let rows = vec![response("m1", from, 200), response("m1", to, 200), response("m1", now, 200)];
        let params = HttpListParams::new("m1").with_range(from, to);
        assert_eq!(HttpListRow::project(&rows, &params, now).len(), 2);
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let now = Utc::now();
        let params = HttpListParams::new("m1").with_range(now, now - Duration::hours(1));
        assert!(params.validate().unwrap_err().has_issue_for("range"));
        assert!(HttpListParams::new(" ").validate().is_err());
    }

    #[test]
    fn test_row_shape() {
        let time = "2024-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let row = HttpListRow::from_response(&response("m1", time, 301));
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["type"], "http");
        assert_eq!(value["id"], Value::Null);
        assert_eq!(value["monitorId"], "m1");
        assert_eq!(value["timestamp"], 1_704_067_200_000i64);
        assert_eq!(value["requestStatus"], "degraded");
        assert_eq!(value["trigger"], "cron");
        assert_eq!(value["timing"], Value::Null);
    }

    #[test]
    fn test_record_with_malformed_timing_still_lists() {
        let record = HttpListRecord {
            time: Utc::now(),
            monitor_id: "m1".to_string(),
            latency: 10,
            status_code: Some(200),
            region: "fra".to_string(),
            cron_timestamp: 0,
            timing: Some(Json(json!("{broken"))),
            error: false,
            trigger: None,
        };
        let row = HttpListRow::try_from(record).unwrap();
        assert_eq!(row.timing, None);
        assert_eq!(row.trigger, Trigger::Cron);
        assert_eq!(row.region, Region::Fra);
    }
}
