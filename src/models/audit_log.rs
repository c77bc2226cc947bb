use crate::validation::{FieldIssue, IssueKind, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::PgConnection;
use std::borrow::Cow;
use uuid::Uuid;

/// Metadata key that correlates an audit event with a monitor
pub const MONITOR_ID_KEY: &str = "monitorId";

/// Version written when the producer does not send one
pub const DEFAULT_AUDIT_VERSION: i32 = 1;

/// AuditLogEntry records one workspace action.
/// Maps to the `audit_logs` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    #[serde(rename = "timestamp", with = "chrono::serde::ts_milliseconds")]
    pub time: DateTime<Utc>,
    pub id: String,
    pub action: String,
    pub actor: String,
    pub targets: Option<Map<String, Value>>,
    pub metadata: Option<Map<String, Value>>,
    #[serde(default = "default_version")]
    pub version: i32,
}

fn default_version() -> i32 {
    DEFAULT_AUDIT_VERSION
}

impl AuditLogEntry {
    /// New entry with a generated id, stamped with the current time
    pub fn new(action: impl Into<String>, actor: impl Into<String>) -> Self {
        Self {
            time: Utc::now(),
            id: Uuid::new_v4().to_string(),
            action: action.into(),
            actor: actor.into(),
            targets: None,
            metadata: None,
            version: DEFAULT_AUDIT_VERSION,
        }
    }

    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = time;
        self
    }

    /// Attach the monitor correlation key to the metadata map
    pub fn for_monitor(mut self, monitor_id: impl Into<String>) -> Self {
        self.metadata
            .get_or_insert_with(Map::new)
            .insert(MONITOR_ID_KEY.to_string(), Value::String(monitor_id.into()));
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    pub fn with_targets(mut self, targets: Map<String, Value>) -> Self {
        self.targets = Some(targets);
        self
    }

    /// Monitor this event is correlated with, if any.
    ///
    /// Read with the text semantics of `metadata->>'monitorId'`: strings as
    /// they are, numbers and booleans in their JSON spelling. Null and nested
    /// values never correlate.
    pub fn monitor_id(&self) -> Option<Cow<'_, str>> {
        match self.metadata.as_ref()?.get(MONITOR_ID_KEY)? {
            Value::String(id) => Some(Cow::Borrowed(id.as_str())),
            scalar @ (Value::Number(_) | Value::Bool(_)) => Some(Cow::Owned(scalar.to_string())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Version as persisted; zero is treated as absent
    pub fn effective_version(&self) -> i32 {
        if self.version == 0 {
            DEFAULT_AUDIT_VERSION
        } else {
            self.version
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();
        for (field, value) in [("id", &self.id), ("action", &self.action), ("actor", &self.actor)] {
            if value.trim().is_empty() {
                issues.push(FieldIssue::new(field, IssueKind::Empty));
            }
        }
        if self.version < 0 {
            issues.push(FieldIssue::new(
                "version",
                IssueKind::OutOfRange {
                    reason: format!("version must be non-negative, got {}", self.version),
                },
            ));
        }
        ValidationError::check("audit log entry", issues)
    }

    /// Append this event as one `audit_logs` row
    pub async fn insert(&self, conn: &mut PgConnection) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (time, id, action, actor, targets, metadata, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(self.time)
        .bind(&self.id)
        .bind(&self.action)
        .bind(&self.actor)
        .bind(self.targets.as_ref().map(Json))
        .bind(self.metadata.as_ref().map(Json))
        .bind(self.effective_version())
        .execute(conn)
        .await?;
        Ok(())
    }
}
