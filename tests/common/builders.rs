//! Test data builders for probe results and audit events.

#![allow(dead_code)]

use super::unique_name;
use chrono::{DateTime, Duration, Utc};
use uptime_metrics::models::{AuditLogEntry, HttpResponse, HttpTiming, ProbeResult, TcpResponse};
use uptime_metrics::{Region, Trigger};
use url::Url;

/// Builder for HTTP probe results, timed relative to a reference instant
pub struct HttpResponseBuilder {
    monitor_id: String,
    region: Region,
    latency: i64,
    status_code: Option<i32>,
    error: bool,
    time: DateTime<Utc>,
    timing: Option<HttpTiming>,
    trigger: Option<Trigger>,
}

impl HttpResponseBuilder {
    pub fn new(monitor_id: &str) -> Self {
        Self {
            monitor_id: monitor_id.to_string(),
            region: Region::Ams,
            latency: 100,
            status_code: Some(200),
            error: false,
            time: Utc::now(),
            timing: None,
            trigger: None,
        }
    }

    pub fn region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    pub fn latency(mut self, latency: i64) -> Self {
        self.latency = latency;
        self
    }

    pub fn status(mut self, status_code: i32) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn no_status(mut self) -> Self {
        self.status_code = None;
        self
    }

    pub fn failed(mut self) -> Self {
        self.error = true;
        self
    }

    pub fn at(mut self, time: DateTime<Utc>) -> Self {
        self.time = time;
        self
    }

    pub fn ago(self, age: Duration) -> Self {
        let time = Utc::now() - age;
        self.at(time)
    }

    pub fn timing(mut self, timing: HttpTiming) -> Self {
        self.timing = Some(timing);
        self
    }

    pub fn trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    pub fn build(self) -> HttpResponse {
        let mut response = HttpResponse::new(
            self.monitor_id,
            "workspace-1",
            self.region,
            Url::parse("https://status.example.com/health").expect("static url"),
            self.latency,
        )
        .with_time(self.time)
        .with_error(self.error);
        response.status_code = self.status_code;
        response.timing = self.timing;
        response.trigger = self.trigger;
        response
    }

    pub fn result(self) -> ProbeResult {
        self.build().into()
    }
}

/// TCP result for `monitor_id` at `time`
pub fn tcp_result(monitor_id: &str, time: DateTime<Utc>) -> ProbeResult {
    TcpResponse::new(monitor_id, "workspace-1", Region::Fra, 8)
        .with_time(time)
        .with_uri("db.internal:5432")
        .into()
}

/// Audit event for `monitor_id` at `time`
pub fn audit_event(action: &str, monitor_id: &str, time: DateTime<Utc>) -> AuditLogEntry {
    AuditLogEntry::new(action, "system")
        .for_monitor(monitor_id)
        .with_time(time)
}

/// A fresh monitor id, so tests sharing a database never see each other's rows
pub fn monitor_id() -> String {
    unique_name("monitor")
}

/// Timing block whose phases are dns 5, connect 10, tls 20, ttfb 40, transfer 8
pub fn sample_timing() -> HttpTiming {
    HttpTiming::from_instants([0, 5, 5, 15, 15, 35, 35, 75, 75, 83])
}
