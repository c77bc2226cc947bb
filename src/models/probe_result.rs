use crate::constants::{tables, JobType, Region, Trigger};
use crate::models::timing::HttpTiming;
use crate::validation::{FieldIssue, IssueKind, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::PgConnection;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use url::Url;

/// Status codes accepted from a probe
pub const STATUS_CODE_RANGE: RangeInclusive<i32> = 100..=599;

/// One HTTP check execution.
/// Maps to the `http_responses` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponse {
    #[serde(rename = "timestamp", with = "chrono::serde::ts_milliseconds")]
    pub time: DateTime<Utc>,
    pub monitor_id: String,
    pub workspace_id: String,
    pub region: Region,
    pub url: Url,
    /// Milliseconds
    pub latency: i64,
    pub status_code: Option<i32>,
    /// Explicit probe failure flag, independent of the status code
    pub error: bool,
    pub cron_timestamp: i64,
    pub message: Option<String>,
    pub timing: Option<HttpTiming>,
    pub headers: Option<BTreeMap<String, String>>,
    pub assertions: Option<Map<String, Value>>,
    pub body: Option<String>,
    pub trigger: Option<Trigger>,
}

/// One TCP check execution.
/// Maps to the `tcp_responses` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TcpResponse {
    #[serde(rename = "timestamp", with = "chrono::serde::ts_milliseconds")]
    pub time: DateTime<Utc>,
    pub monitor_id: String,
    pub workspace_id: String,
    pub region: Region,
    pub uri: Option<String>,
    /// Milliseconds
    pub latency: i64,
    pub error: bool,
    pub cron_timestamp: i64,
    pub error_message: Option<String>,
    pub trigger: Option<Trigger>,
}

/// A probe result of either protocol. The variant selects the table.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeResult {
    Http(HttpResponse),
    Tcp(TcpResponse),
}

impl HttpResponse {
    /// New scheduled result stamped with the current time
    pub fn new(
        monitor_id: impl Into<String>,
        workspace_id: impl Into<String>,
        region: Region,
        url: Url,
        latency: i64,
    ) -> Self {
        let time = Utc::now();
        Self {
            time,
            monitor_id: monitor_id.into(),
            workspace_id: workspace_id.into(),
            region,
            url,
            latency,
            status_code: None,
            error: false,
            cron_timestamp: time.timestamp_millis(),
            message: None,
            timing: None,
            headers: None,
            assertions: None,
            body: None,
            trigger: None,
        }
    }

    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = time;
        self
    }

    pub fn with_status_code(mut self, status_code: i32) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn with_error(mut self, error: bool) -> Self {
        self.error = error;
        self
    }

    pub fn with_timing(mut self, timing: HttpTiming) -> Self {
        self.timing = Some(timing);
        self
    }

    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Trigger as persisted: absent means scheduled
    pub fn effective_trigger(&self) -> Trigger {
        self.trigger.unwrap_or_default()
    }

    /// Re-check invariants of a value built in code rather than parsed
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = identity_issues(&self.monitor_id, &self.workspace_id, self.latency);
        if let Some(code) = self.status_code {
            if !STATUS_CODE_RANGE.contains(&code) {
                issues.push(FieldIssue::new(
                    "statusCode",
                    IssueKind::OutOfRange {
                        reason: format!("{code} is not an HTTP status code"),
                    },
                ));
            }
        }
        ValidationError::check("http response", issues)
    }

    /// Append this result as one `http_responses` row
    pub async fn insert(&self, conn: &mut PgConnection) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO http_responses (
                time, monitor_id, workspace_id, region, url, latency, status_code, error,
                cron_timestamp, message, timing, headers, assertions, body, trigger
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(self.time)
        .bind(&self.monitor_id)
        .bind(&self.workspace_id)
        .bind(self.region.as_str())
        .bind(self.url.as_str())
        .bind(self.latency)
        .bind(self.status_code)
        .bind(self.error)
        .bind(self.cron_timestamp)
        .bind(self.message.as_deref())
        .bind(self.timing.as_ref().map(Json))
        .bind(self.headers.as_ref().map(Json))
        .bind(self.assertions.as_ref().map(Json))
        .bind(self.body.as_deref())
        .bind(self.effective_trigger().as_str())
        .execute(conn)
        .await?;
        Ok(())
    }
}

impl TcpResponse {
    /// New scheduled result stamped with the current time
    pub fn new(
        monitor_id: impl Into<String>,
        workspace_id: impl Into<String>,
        region: Region,
        latency: i64,
    ) -> Self {
        let time = Utc::now();
        Self {
            time,
            monitor_id: monitor_id.into(),
            workspace_id: workspace_id.into(),
            region,
            uri: None,
            latency,
            error: false,
            cron_timestamp: time.timestamp_millis(),
            error_message: None,
            trigger: None,
        }
    }

    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = time;
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error = true;
        self.error_message = Some(message.into());
        self
    }

    pub fn effective_trigger(&self) -> Trigger {
        self.trigger.unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let issues = identity_issues(&self.monitor_id, &self.workspace_id, self.latency);
        ValidationError::check("tcp response", issues)
    }

    /// Append this result as one `tcp_responses` row
    pub async fn insert(&self, conn: &mut PgConnection) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO tcp_responses (
                time, monitor_id, workspace_id, region, uri, latency, error,
                cron_timestamp, error_message, trigger
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(self.time)
        .bind(&self.monitor_id)
        .bind(&self.workspace_id)
        .bind(self.region.as_str())
        .bind(self.uri.as_deref())
        .bind(self.latency)
        .bind(self.error)
        .bind(self.cron_timestamp)
        .bind(self.error_message.as_deref())
        .bind(self.effective_trigger().as_str())
        .execute(conn)
        .await?;
        Ok(())
    }
}

impl ProbeResult {
    pub fn job_type(&self) -> JobType {
        match self {
            Self::Http(_) => JobType::Http,
            Self::Tcp(_) => JobType::Tcp,
        }
    }

    /// Destination table for this result
    pub fn table(&self) -> &'static str {
        match self {
            Self::Http(_) => tables::HTTP_RESPONSES,
            Self::Tcp(_) => tables::TCP_RESPONSES,
        }
    }

    pub fn monitor_id(&self) -> &str {
        match self {
            Self::Http(r) => &r.monitor_id,
            Self::Tcp(r) => &r.monitor_id,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Http(r) => r.validate(),
            Self::Tcp(r) => r.validate(),
        }
    }

    pub async fn insert(&self, conn: &mut PgConnection) -> Result<(), sqlx::Error> {
        match self {
            Self::Http(r) => r.insert(conn).await,
            Self::Tcp(r) => r.insert(conn).await,
        }
    }
}

impl From<HttpResponse> for ProbeResult {
    fn from(response: HttpResponse) -> Self {
        Self::Http(response)
    }
}

impl From<TcpResponse> for ProbeResult {
    fn from(response: TcpResponse) -> Self {
        Self::Tcp(response)
    }
}

fn identity_issues(monitor_id: &str, workspace_id: &str, latency: i64) -> Vec<FieldIssue> {
    let mut issues = Vec::new();
    if monitor_id.trim().is_empty() {
        issues.push(FieldIssue::new("monitorId", IssueKind::Empty));
    }
    if workspace_id.trim().is_empty() {
        issues.push(FieldIssue::new("workspaceId", IssueKind::Empty));
    }
    if latency < 0 {
        issues.push(FieldIssue::new(
            "latency",
            IssueKind::OutOfRange {
                reason: format!("latency must be non-negative, got {latency}"),
            },
        ));
    }
    issues
}
