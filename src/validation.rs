//! Schema boundary for probe results, audit events and timing blocks.
//!
//! Turns untyped JSON records, as the probe runner and the API layer send
//! them, into strongly-typed values. Every problem in a record is collected
//! into one [`ValidationError`] naming the offending field and the violated
//! constraint, so a caller can fix all of them at once. Nothing here touches
//! storage.

use crate::constants::{JobType, Region, Trigger, UnknownVariant};
use crate::models::audit_log::{AuditLogEntry, DEFAULT_AUDIT_VERSION};
use crate::models::probe_result::{HttpResponse, ProbeResult, TcpResponse, STATUS_CODE_RANGE};
use crate::models::timing::{HttpTiming, TIMING_FIELDS};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Largest integer a JSON number can carry without losing precision
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// The constraint a field violated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum IssueKind {
    /// Required field absent or null
    Missing,
    /// Present but blank
    Empty,
    WrongType { expected: &'static str },
    NotInEnumeration { enumeration: &'static str, value: String },
    MalformedUrl { reason: String },
    OutOfRange { reason: String },
    /// The record itself is not a JSON object
    NotAnObject,
}

/// One violated constraint on one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    /// Dotted path of the field, e.g. `timing.dnsDone`
    pub field: String,
    pub kind: IssueKind,
}

/// A record failed validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// What kind of record was being validated
    pub record: &'static str,
    pub issues: Vec<FieldIssue>,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, kind: IssueKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = if self.field.is_empty() {
            "<record>"
        } else {
            &self.field
        };
        match &self.kind {
            IssueKind::Missing => write!(f, "{field}: required"),
            IssueKind::Empty => write!(f, "{field}: must not be empty"),
            IssueKind::WrongType { expected } => write!(f, "{field}: expected {expected}"),
            IssueKind::NotInEnumeration { enumeration, value } => {
                write!(f, "{field}: '{value}' is not a valid {enumeration}")
            }
            IssueKind::MalformedUrl { reason } => write!(f, "{field}: malformed URL ({reason})"),
            IssueKind::OutOfRange { reason } => write!(f, "{field}: {reason}"),
            IssueKind::NotAnObject => write!(f, "{field}: expected an object"),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation error: invalid {}", self.record)?;
        for (index, issue) in self.issues.iter().enumerate() {
            let separator = if index == 0 { ": " } else { "; " };
            write!(f, "{separator}{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    pub fn new(record: &'static str, issues: Vec<FieldIssue>) -> Self {
        Self { record, issues }
    }

    /// Single-issue error for a query parameter
    pub fn parameter(field: &str, kind: IssueKind) -> Self {
        Self::new("query parameters", vec![FieldIssue::new(field, kind)])
    }

    /// `Ok(())` when `issues` is empty
    pub fn check(record: &'static str, issues: Vec<FieldIssue>) -> Result<(), Self> {
        if issues.is_empty() {
            Ok(())
        } else {
            Err(Self::new(record, issues))
        }
    }

    /// Whether any issue concerns `field`
    pub fn has_issue_for(&self, field: &str) -> bool {
        self.issues.iter().any(|issue| issue.field == field)
    }
}

/// Reads typed fields out of one JSON object, collecting issues as it goes
struct FieldReader<'a> {
    object: &'a Map<String, Value>,
    prefix: String,
    issues: Vec<FieldIssue>,
}

impl<'a> FieldReader<'a> {
    fn new(object: &'a Map<String, Value>, prefix: &str) -> Self {
        Self {
            object,
            prefix: prefix.to_string(),
            issues: Vec::new(),
        }
    }

    fn path(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.prefix, key)
        }
    }

    fn push(&mut self, key: &str, kind: IssueKind) {
        let field = self.path(key);
        self.issues.push(FieldIssue::new(field, kind));
    }

    /// Present and not null
    fn present(&self, key: &str) -> Option<&'a Value> {
        self.object.get(key).filter(|value| !value.is_null())
    }

    fn required(&mut self, key: &str) -> Option<&'a Value> {
        let value = self.present(key);
        if value.is_none() {
            self.push(key, IssueKind::Missing);
        }
        value
    }

    fn integer_from(&mut self, key: &str, value: &Value) -> Option<i64> {
        let parsed = value.as_i64().or_else(|| {
            value
                .as_f64()
                .filter(|n| n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER)
                .map(|n| n as i64)
        });
        if parsed.is_none() {
            self.push(key, IssueKind::WrongType { expected: "integer" });
        }
        parsed
    }

    fn required_i64(&mut self, key: &str) -> Option<i64> {
        let value = self.required(key)?;
        self.integer_from(key, value)
    }

    fn optional_i64(&mut self, key: &str) -> Option<i64> {
        let value = self.present(key)?;
        self.integer_from(key, value)
    }

    fn required_bool(&mut self, key: &str) -> Option<bool> {
        let value = self.required(key)?;
        let parsed = value.as_bool();
        if parsed.is_none() {
            self.push(key, IssueKind::WrongType { expected: "boolean" });
        }
        parsed
    }

    fn optional_string(&mut self, key: &str) -> Option<String> {
        let value = self.present(key)?;
        match value.as_str() {
            Some(s) => Some(s.to_string()),
            None => {
                self.push(key, IssueKind::WrongType { expected: "string" });
                None
            }
        }
    }

    fn required_string(&mut self, key: &str) -> Option<String> {
        if self.present(key).is_none() {
            self.push(key, IssueKind::Missing);
            return None;
        }
        let value = self.optional_string(key)?;
        if value.trim().is_empty() {
            self.push(key, IssueKind::Empty);
            return None;
        }
        Some(value)
    }

    fn parse_variant<T>(&mut self, key: &str, raw: &str) -> Option<T>
    where
        T: FromStr<Err = UnknownVariant>,
    {
        match raw.parse::<T>() {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                self.push(
                    key,
                    IssueKind::NotInEnumeration {
                        enumeration: err.enumeration,
                        value: err.value,
                    },
                );
                None
            }
        }
    }

    fn required_enum<T>(&mut self, key: &str) -> Option<T>
    where
        T: FromStr<Err = UnknownVariant>,
    {
        let raw = self.required_string(key)?;
        self.parse_variant(key, &raw)
    }

    fn optional_enum<T>(&mut self, key: &str) -> Option<T>
    where
        T: FromStr<Err = UnknownVariant>,
    {
        let raw = self.optional_string(key)?;
        self.parse_variant(key, &raw)
    }

    fn required_timestamp(&mut self, key: &str) -> Option<DateTime<Utc>> {
        let millis = self.required_i64(key)?;
        let time = DateTime::from_timestamp_millis(millis);
        if time.is_none() {
            self.push(
                key,
                IssueKind::OutOfRange {
                    reason: format!("{millis} is not a representable epoch millisecond"),
                },
            );
        }
        time
    }

    fn non_negative(&mut self, key: &str, value: Option<i64>) -> Option<i64> {
        match value {
            Some(n) if n < 0 => {
                self.push(
                    key,
                    IssueKind::OutOfRange {
                        reason: format!("must be non-negative, got {n}"),
                    },
                );
                None
            }
            other => other,
        }
    }

    fn required_url(&mut self, key: &str) -> Option<Url> {
        let raw = self.required_string(key)?;
        match Url::parse(&raw) {
            Ok(url) => Some(url),
            Err(err) => {
                self.push(
                    key,
                    IssueKind::MalformedUrl {
                        reason: err.to_string(),
                    },
                );
                None
            }
        }
    }

    fn optional_object(&mut self, key: &str) -> Option<&'a Map<String, Value>> {
        let value = self.present(key)?;
        let object = value.as_object();
        if object.is_none() {
            self.push(key, IssueKind::WrongType { expected: "object" });
        }
        object
    }

    fn optional_string_map(&mut self, key: &str) -> Option<BTreeMap<String, String>> {
        let object = self.optional_object(key)?;
        let mut map = BTreeMap::new();
        let mut valid = true;
        for (name, value) in object {
            match value.as_str() {
                Some(s) => {
                    map.insert(name.clone(), s.to_string());
                }
                None => {
                    valid = false;
                    self.push(&format!("{key}.{name}"), IssueKind::WrongType { expected: "string" });
                }
            }
        }
        valid.then_some(map)
    }

    fn optional_timing(&mut self, key: &str) -> Option<HttpTiming> {
        let value = self.present(key)?;
        let path = self.path(key);
        match read_timing(value, &path) {
            Ok(timing) => Some(timing),
            Err(issues) => {
                self.issues.extend(issues);
                None
            }
        }
    }

    fn finish<T>(self, record: &'static str, value: Option<T>) -> Result<T, ValidationError> {
        match value {
            Some(value) if self.issues.is_empty() => Ok(value),
            _ => Err(ValidationError::new(record, self.issues)),
        }
    }
}

fn as_object<'a>(record: &'static str, value: &'a Value) -> Result<&'a Map<String, Value>, ValidationError> {
    value
        .as_object()
        .ok_or_else(|| ValidationError::new(record, vec![FieldIssue::new("", IssueKind::NotAnObject)]))
}

fn read_timing(value: &Value, path: &str) -> Result<HttpTiming, Vec<FieldIssue>> {
    let Some(object) = value.as_object() else {
        return Err(vec![FieldIssue::new(path, IssueKind::NotAnObject)]);
    };
    let mut reader = FieldReader::new(object, path);
    let mut instants = [0i64; 10];
    let mut complete = true;
    for (slot, field) in instants.iter_mut().zip(TIMING_FIELDS) {
        match reader.required_i64(field) {
            Some(instant) => *slot = instant,
            None => complete = false,
        }
    }
    if complete && reader.issues.is_empty() {
        Ok(HttpTiming::from_instants(instants))
    } else {
        Err(reader.issues)
    }
}

/// Validate a standalone timing block; partial timing is invalid
pub fn parse_timing(value: &Value) -> Result<HttpTiming, ValidationError> {
    read_timing(value, "").map_err(|issues| ValidationError::new("timing", issues))
}

/// Validate an HTTP probe result record
pub fn parse_http_response(value: &Value) -> Result<HttpResponse, ValidationError> {
    const RECORD: &str = "http response";
    let object = as_object(RECORD, value)?;
    let mut reader = FieldReader::new(object, "");

    let time = reader.required_timestamp("timestamp");
    let monitor_id = reader.required_string("monitorId");
    let workspace_id = reader.required_string("workspaceId");
    let region = reader.required_enum::<Region>("region");
    let url = reader.required_url("url");
    let latency = reader.required_i64("latency");
    let latency = reader.non_negative("latency", latency);
    let status_code = reader.optional_i64("statusCode");
    let status_code = status_code.and_then(|code| match i32::try_from(code) {
        Ok(code) if STATUS_CODE_RANGE.contains(&code) => Some(code),
        _ => {
            reader.push(
                "statusCode",
                IssueKind::OutOfRange {
                    reason: format!("{code} is not an HTTP status code"),
                },
            );
            None
        }
    });
    let error = reader.required_bool("error");
    let cron_timestamp = reader.required_i64("cronTimestamp");
    let message = reader.optional_string("message");
    let timing = reader.optional_timing("timing");
    let headers = reader.optional_string_map("headers");
    let assertions = reader.optional_object("assertions").cloned();
    let body = reader.optional_string("body");
    let trigger = reader.optional_enum::<Trigger>("trigger");

    let built = (|| {
        Some(HttpResponse {
            time: time?,
            monitor_id: monitor_id?,
            workspace_id: workspace_id?,
            region: region?,
            url: url?,
            latency: latency?,
            status_code,
            error: error?,
            cron_timestamp: cron_timestamp?,
            message,
            timing,
            headers,
            assertions,
            body,
            trigger,
        })
    })();

    let response = reader.finish(RECORD, built)?;
    response.validate()?;
    Ok(response)
}

/// Validate a TCP probe result record
pub fn parse_tcp_response(value: &Value) -> Result<TcpResponse, ValidationError> {
    const RECORD: &str = "tcp response";
    let object = as_object(RECORD, value)?;
    let mut reader = FieldReader::new(object, "");

    let time = reader.required_timestamp("timestamp");
    let monitor_id = reader.required_string("monitorId");
    let workspace_id = reader.required_string("workspaceId");
    let region = reader.required_enum::<Region>("region");
    let uri = reader.optional_string("uri");
    let latency = reader.required_i64("latency");
    let latency = reader.non_negative("latency", latency);
    let error = reader.required_bool("error");
    let cron_timestamp = reader.required_i64("cronTimestamp");
    let error_message = reader.optional_string("errorMessage");
    let trigger = reader.optional_enum::<Trigger>("trigger");

    let built = (|| {
        Some(TcpResponse {
            time: time?,
            monitor_id: monitor_id?,
            workspace_id: workspace_id?,
            region: region?,
            uri,
            latency: latency?,
            error: error?,
            cron_timestamp: cron_timestamp?,
            error_message,
            trigger,
        })
    })();

    reader.finish(RECORD, built)
}

/// Validate a probe result record of the given job type.
///
/// Only HTTP and TCP results are persisted; other job types are rejected.
pub fn parse_probe_result(job_type: JobType, value: &Value) -> Result<ProbeResult, ValidationError> {
    if !job_type.is_persisted() {
        return Err(ValidationError::new(
            "probe result",
            vec![FieldIssue::new(
                "jobType",
                IssueKind::OutOfRange {
                    reason: format!("'{job_type}' results are not persisted"),
                },
            )],
        ));
    }
    if job_type == JobType::Tcp {
        parse_tcp_response(value).map(ProbeResult::Tcp)
    } else {
        parse_http_response(value).map(ProbeResult::Http)
    }
}

/// Validate an audit log record
pub fn parse_audit_log(value: &Value) -> Result<AuditLogEntry, ValidationError> {
    const RECORD: &str = "audit log entry";
    let object = as_object(RECORD, value)?;
    let mut reader = FieldReader::new(object, "");

    let time = reader.required_timestamp("timestamp");
    let id = reader.required_string("id");
    let action = reader.required_string("action");
    let actor = reader.required_string("actor");
    let targets = reader.optional_object("targets").cloned();
    let metadata = reader.optional_object("metadata").cloned();
    let version = reader.optional_i64("version");
    let version = reader.non_negative("version", version);
    let version = version
        .map(|v| i32::try_from(v).unwrap_or(i32::MAX))
        .filter(|v| *v != 0)
        .unwrap_or(DEFAULT_AUDIT_VERSION);

    let built = (|| {
        Some(AuditLogEntry {
            time: time?,
            id: id?,
            action: action?,
            actor: actor?,
            targets,
            metadata,
            version,
        })
    })();

    reader.finish(RECORD, built)
}
