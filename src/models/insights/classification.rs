//! # Request Status Classification
//!
//! Probe rows are stored exactly as the probe reported them. Whether a run
//! counts as a success, a degradation or an error is decided here, at read
//! time, from two columns only: the explicit `error` flag and the HTTP status
//! code.
//!
//! | error | status code    | status     |
//! |-------|----------------|------------|
//! | true  | any            | `error`    |
//! | false | `>= 400`       | `error`    |
//! | false | `300..400`     | `degraded` |
//! | false | `< 300` / null | `success`  |
//!
//! The SQL predicates below encode the same partition so that aggregate
//! counts always satisfy `success + degraded + error == count`.
//!
//! A run without a status code and without the error flag is a success, and
//! so counts as ok in the weekly and 45-day rollups. A bare
//! `NOT error AND status_code < 400` would drop it under SQL `NULL`
//! comparison; [`OK_PREDICATE`] and [`SUCCESS_PREDICATE`] test for `NULL`
//! explicitly to keep the SQL and in-memory counts identical.

use serde::{Deserialize, Serialize};
use std::fmt;

/// `FILTER` predicate matching [`RequestStatus::Error`]
pub const ERROR_PREDICATE: &str = "(error OR status_code >= 400)";

/// `FILTER` predicate matching [`RequestStatus::Degraded`]
pub const DEGRADED_PREDICATE: &str =
    "(NOT error AND status_code >= 300 AND status_code < 400)";

/// `FILTER` predicate matching [`RequestStatus::Success`]
pub const SUCCESS_PREDICATE: &str = "(NOT error AND (status_code IS NULL OR status_code < 300))";

/// `FILTER` predicate for runs that reached the target: success or degraded
pub const OK_PREDICATE: &str = "(NOT error AND (status_code IS NULL OR status_code < 400))";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Success,
    Degraded,
    Error,
}

impl RequestStatus {
    /// Classify one probe run. Pure: same inputs, same answer.
    pub fn classify(error: bool, status_code: Option<i32>) -> Self {
        match status_code {
            _ if error => Self::Error,
            Some(code) if code >= 400 => Self::Error,
            Some(code) if code >= 300 => Self::Degraded,
            _ => Self::Success,
        }
    }

    /// Success or degraded
    pub fn is_ok(&self) -> bool {
        !matches!(self, Self::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Degraded => "degraded",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-status tallies over a set of probe runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub count: i64,
    pub success: i64,
    pub degraded: i64,
    pub error: i64,
}

impl StatusCounts {
    pub fn record(&mut self, status: RequestStatus) {
        self.count += 1;
        match status {
            RequestStatus::Success => self.success += 1,
            RequestStatus::Degraded => self.degraded += 1,
            RequestStatus::Error => self.error += 1,
        }
    }

    pub fn ok(&self) -> i64 {
        self.success + self.degraded
    }
}

impl FromIterator<RequestStatus> for StatusCounts {
    fn from_iter<I: IntoIterator<Item = RequestStatus>>(iter: I) -> Self {
        let mut counts = Self::default();
        for status in iter {
            counts.record(status);
        }
        counts
    }
}
