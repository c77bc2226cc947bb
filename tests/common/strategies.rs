#![allow(dead_code)]

use proptest::prelude::*;
use uptime_metrics::models::HttpTiming;

/// Strategy for plausible and implausible status codes, including absent
pub fn status_code_strategy() -> impl Strategy<Value = Option<i32>> {
    prop::option::of(prop_oneof![100i32..600, any::<i32>()])
}

/// Strategy for latency samples in milliseconds
pub fn latencies_strategy() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(0i64..120_000, 0..64)
}

/// Strategy for percentile ranks
pub fn percentile_strategy() -> impl Strategy<Value = f64> {
    prop_oneof![Just(0.5), Just(0.75), Just(0.9), Just(0.95), Just(0.99), 0.0f64..=1.0]
}

/// Strategy for arbitrary timing blocks, clock skew included
pub fn timing_strategy() -> impl Strategy<Value = HttpTiming> {
    prop::array::uniform10(any::<i64>()).prop_map(HttpTiming::from_instants)
}

/// Strategy for JSON that is mostly not a valid timing block
pub fn junk_timing_strategy() -> impl Strategy<Value = serde_json::Value> {
    prop_oneof![
        Just(serde_json::Value::Null),
        any::<i64>().prop_map(serde_json::Value::from),
        ".{0,40}".prop_map(serde_json::Value::from),
        Just(serde_json::json!({"dnsStart": 1})),
        Just(serde_json::json!({"dnsStart": "1", "dnsDone": "2"})),
        Just(serde_json::json!([1, 2, 3])),
    ]
}
