//! Audit trail: recent audit events, optionally narrowed to one monitor.

use crate::constants::windows::{DEFAULT_AUDIT_INTERVAL_DAYS, MAX_AUDIT_INTERVAL_DAYS};
use crate::models::audit_log::AuditLogEntry;
use crate::validation::{IssueKind, ValidationError};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogParams {
    /// Matched against `metadata.monitorId`; `None` returns every event
    pub monitor_id: Option<String>,
    /// Look-back in days, `1..=365`
    #[serde(rename = "interval")]
    pub interval_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogRow {
    pub action: String,
    pub id: String,
    /// `{}` when the event carried none
    pub metadata: Map<String, Value>,
    /// Epoch milliseconds
    pub timestamp: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct AuditLogRecord {
    pub action: String,
    pub id: String,
    pub metadata: Option<Json<Map<String, Value>>>,
    pub time: DateTime<Utc>,
}

impl AuditLogParams {
    pub fn for_monitor(monitor_id: impl Into<String>) -> Self {
        Self {
            monitor_id: Some(monitor_id.into()),
            interval_days: None,
        }
    }

    pub fn with_interval_days(mut self, days: u32) -> Self {
        self.interval_days = Some(days);
        self
    }

    /// Validated look-back, falling back to `default_days`
    pub fn resolve_interval(&self, default_days: u32) -> Result<u32, ValidationError> {
        let days = self.interval_days.unwrap_or(default_days);
        if (1..=MAX_AUDIT_INTERVAL_DAYS).contains(&days) {
            Ok(days)
        } else {
            Err(ValidationError::parameter(
                "interval",
                IssueKind::OutOfRange {
                    reason: format!("{days} days is outside 1..={MAX_AUDIT_INTERVAL_DAYS}"),
                },
            ))
        }
    }

    pub fn interval(&self) -> Result<u32, ValidationError> {
        self.resolve_interval(DEFAULT_AUDIT_INTERVAL_DAYS)
    }
}

impl AuditLogRow {
    pub fn from_entry(entry: &AuditLogEntry) -> Self {
        Self {
            action: entry.action.clone(),
            id: entry.id.clone(),
            metadata: entry.metadata.clone().unwrap_or_default(),
            timestamp: entry.time.timestamp_millis(),
        }
    }

    /// Matching events inside the look-back, newest first
    pub fn project<'a, I>(
        entries: I,
        monitor_id: Option<&str>,
        interval_days: u32,
        now: DateTime<Utc>,
    ) -> Vec<Self>
    where
        I: IntoIterator<Item = &'a AuditLogEntry>,
    {
        let cutoff = now - Duration::days(i64::from(interval_days));
        let mut matching: Vec<&AuditLogEntry> = entries
            .into_iter()
            .filter(|entry| entry.time >= cutoff)
            .filter(|entry| monitor_id.map_or(true, |id| entry.monitor_id().as_deref() == Some(id)))
            .collect();
        matching.sort_by(|a, b| b.time.cmp(&a.time));
        matching.into_iter().map(Self::from_entry).collect()
    }

    /// The interval is bound as an `int4`, never spliced into the statement
    pub async fn fetch(
        conn: &mut PgConnection,
        monitor_id: Option<&str>,
        interval_days: u32,
    ) -> Result<Vec<AuditLogRecord>, sqlx::Error> {
        let days = i32::try_from(interval_days).unwrap_or(i32::MAX);
        sqlx::query_as::<_, AuditLogRecord>(
            r#"
            SELECT action, id, metadata, time
            FROM audit_logs
            WHERE time >= NOW() - make_interval(days => $1)
              AND ($2::text IS NULL OR metadata->>'monitorId' = $2)
            ORDER BY time DESC
            "#,
        )
        .bind(days)
        .bind(monitor_id)
        .fetch_all(conn)
        .await
    }
}

impl From<AuditLogRecord> for AuditLogRow {
    fn from(record: AuditLogRecord) -> Self {
        Self {
            action: record.action,
            id: record.id,
            metadata: record.metadata.map(|Json(map)| map).unwrap_or_default(),
            timestamp: record.time.timestamp_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_interval_bounds() {
        assert_eq!(AuditLogParams::default().interval().unwrap(), 30);
        assert_eq!(AuditLogParams::default().with_interval_days(365).interval().unwrap(), 365);
        assert!(AuditLogParams::default().with_interval_days(0).interval().is_err());
        assert!(AuditLogParams::default()
            .with_interval_days(366)
            .interval()
            .unwrap_err()
            .has_issue_for("interval"));
    }

    #[test]
    fn test_project_filters_by_monitor_and_window() {
        let now = Utc::now();
        let entries = vec![
            AuditLogEntry::new("monitor.failed", "system")
                .for_monitor("m1")
                .with_time(now - Duration::days(1)),
            AuditLogEntry::new("monitor.recovered", "system")
                .for_monitor("m1")
                .with_time(now - Duration::hours(1)),
            AuditLogEntry::new("monitor.failed", "system")
                .for_monitor("m2")
                .with_time(now),
            AuditLogEntry::new("monitor.failed", "system")
                .for_monitor("m1")
                .with_time(now - Duration::days(10)),
        ];

        let rows = AuditLogRow::project(&entries, Some("m1"), 7, now);
        let actions: Vec<_> = rows.iter().map(|r| r.action.as_str()).collect();
        assert_eq!(actions, vec!["monitor.recovered", "monitor.failed"]);

        assert_eq!(AuditLogRow::project(&entries, None, 30, now).len(), 4);
        assert!(AuditLogRow::project(&entries, Some("m9"), 7, now).is_empty());
    }

    #[test]
    fn test_missing_metadata_becomes_empty_object() {
        let entry = AuditLogEntry::new("workspace.created", "user:1");
        let value = serde_json::to_value(AuditLogRow::from_entry(&entry)).unwrap();
        assert_eq!(value["metadata"], json!({}));
    }

    #[test]
    fn test_params_use_interval_wire_name() {
        let params: AuditLogParams =
            serde_json::from_str(r#"{"monitorId":"m1","interval":7}"#).unwrap();
        assert_eq!(params.interval_days, Some(7));
    }
}
