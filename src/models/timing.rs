//! # HTTP Timing Decomposition
//!
//! A probe records ten raw instants while it runs: start and end of DNS
//! resolution, connection establishment, TLS handshake, the wait for the first
//! byte and the body transfer. Consumers never see those instants directly;
//! they see five phase durations, each `done - start`.
//!
//! Decomposition on the read path is best-effort. A stored timing blob that
//! does not parse yields `None` ("unavailable") instead of an error, so one
//! malformed row cannot fail a list query over thousands of rows. Negative
//! durations caused by clock skew in the source data are passed through as-is.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire names of the ten raw sub-timestamps, in phase order
pub const TIMING_FIELDS: [&str; 10] = [
    "dnsStart",
    "dnsDone",
    "connectStart",
    "connectDone",
    "tlsHandshakeStart",
    "tlsHandshakeDone",
    "firstByteStart",
    "firstByteDone",
    "transferStart",
    "transferDone",
];

/// Raw sub-timestamps captured by the probe. All ten are required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpTiming {
    pub dns_start: i64,
    pub dns_done: i64,
    pub connect_start: i64,
    pub connect_done: i64,
    pub tls_handshake_start: i64,
    pub tls_handshake_done: i64,
    pub first_byte_start: i64,
    pub first_byte_done: i64,
    pub transfer_start: i64,
    pub transfer_done: i64,
}

/// Named latency phases derived from [`HttpTiming`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingPhases {
    pub dns: i64,
    pub connect: i64,
    pub tls: i64,
    pub ttfb: i64,
    pub transfer: i64,
}

impl HttpTiming {
    /// Build a timing block from the ten instants in [`TIMING_FIELDS`] order
    pub fn from_instants(instants: [i64; 10]) -> Self {
        let [dns_start, dns_done, connect_start, connect_done, tls_handshake_start, tls_handshake_done, first_byte_start, first_byte_done, transfer_start, transfer_done] =
            instants;
        Self {
            dns_start,
            dns_done,
            connect_start,
            connect_done,
            tls_handshake_start,
            tls_handshake_done,
            first_byte_start,
            first_byte_done,
            transfer_start,
            transfer_done,
        }
    }

    /// Decompose into phase durations.
    ///
    /// Subtraction saturates so that absurd instants cannot abort a read.
    pub fn phases(&self) -> TimingPhases {
        TimingPhases {
            dns: self.dns_done.saturating_sub(self.dns_start),
            connect: self.connect_done.saturating_sub(self.connect_start),
            tls: self
                .tls_handshake_done
                .saturating_sub(self.tls_handshake_start),
            ttfb: self.first_byte_done.saturating_sub(self.first_byte_start),
            transfer: self.transfer_done.saturating_sub(self.transfer_start),
        }
    }
}

impl TimingPhases {
    /// Sum of all phases
    pub fn total(&self) -> i64 {
        [self.dns, self.connect, self.tls, self.ttfb, self.transfer]
            .into_iter()
            .fold(0i64, i64::saturating_add)
    }

    /// True when any phase came out negative (clock skew in the source data)
    pub fn has_negative_phase(&self) -> bool {
        [self.dns, self.connect, self.tls, self.ttfb, self.transfer]
            .iter()
            .any(|phase| *phase < 0)
    }
}

/// Decompose a serialized timing block. Malformed input is "unavailable".
pub fn decompose_str(raw: &str) -> Option<TimingPhases> {
    serde_json::from_str::<HttpTiming>(raw)
        .ok()
        .map(|timing| timing.phases())
}

/// Decompose a stored timing value.
///
/// Accepts the JSON object itself or a string holding its serialized form
/// (older rows were written as text). Anything else is "unavailable".
pub fn decompose_value(value: &Value) -> Option<TimingPhases> {
    match value {
        Value::String(raw) => decompose_str(raw),
        Value::Object(_) => HttpTiming::deserialize(value)
            .ok()
            .map(|timing| timing.phases()),
        _ => None,
    }
}
