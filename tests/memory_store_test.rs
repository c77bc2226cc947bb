//! End-to-end behavior of the query catalog against the in-memory backend.

mod common;

use chrono::{DateTime, Duration, DurationRound, Utc};
use common::*;
use serde_json::json;
use uptime_metrics::database::{MemoryStore, PoolConfiguration, ProbeStore};
use uptime_metrics::models::insights::{
    AuditLogParams, HomeStatsParams, HttpListParams, HttpMetricsParams, RequestStatus,
};
use uptime_metrics::{AuditLogEntry, Period, Region, RollingWindow, StoreError, Trigger};

fn now() -> DateTime<Utc> {
    "2024-06-15T12:00:00Z".parse().unwrap()
}

fn store() -> MemoryStore {
    MemoryStore::default().pinned_at(now())
}

#[tokio::test]
async fn test_empty_metrics_are_zero() {
    let store = store();
    let response = store
        .http_metrics(&HttpMetricsParams::new("nobody"))
        .await
        .unwrap();

    assert_eq!(response.rows, 1);
    let metrics = response.first().unwrap();
    for percentile in [
        metrics.p50_latency,
        metrics.p75_latency,
        metrics.p90_latency,
        metrics.p95_latency,
        metrics.p99_latency,
    ] {
        assert_eq!(percentile, 0.0);
    }
    assert_eq!(metrics.count, 0);
    assert_eq!(metrics.last_timestamp, None);
}

#[tokio::test]
async fn test_404_lists_as_error() {
    let store = store();
    store
        .insert(&HttpResponseBuilder::new("m1").status(404).at(now() - Duration::minutes(1)).result())
        .await
        .unwrap();

    let listed = store.http_list_daily(&HttpListParams::new("m1")).await.unwrap();
    assert_eq!(listed.rows, 1);
    assert_eq!(listed.data[0].request_status, RequestStatus::Error);
}

#[tokio::test]
async fn test_301_lists_as_degraded() {
    let store = store();
    store
        .insert(&HttpResponseBuilder::new("m1").status(301).at(now() - Duration::minutes(1)).result())
        .await
        .unwrap();

    let listed = store.http_list_daily(&HttpListParams::new("m1")).await.unwrap();
    assert_eq!(listed.data[0].request_status, RequestStatus::Degraded);
}

#[tokio::test]
async fn test_error_flag_overrides_success_status() {
    let store = store();
    store
        .insert(&HttpResponseBuilder::new("m1").status(200).failed().at(now()).result())
        .await
        .unwrap();

    let listed = store.http_list_daily(&HttpListParams::new("m1")).await.unwrap();
    assert_eq!(listed.data[0].request_status, RequestStatus::Error);
    assert_eq!(listed.data[0].status_code, Some(200));
}

#[tokio::test]
async fn test_timing_round_trips_as_phases() {
    let store = store();
    store
        .insert(
            &HttpResponseBuilder::new("m1")
                .timing(sample_timing())
                .at(now() - Duration::minutes(5))
                .result(),
        )
        .await
        .unwrap();

    let listed = store.http_list_daily(&HttpListParams::new("m1")).await.unwrap();
    let phases = listed.data[0].timing.expect("timing present");
    assert_eq!(
        (phases.dns, phases.connect, phases.tls, phases.ttfb, phases.transfer),
        (5, 10, 20, 40, 8)
    );
}

#[tokio::test]
async fn test_list_defaults_to_trailing_day_newest_first() {
    let store = store();
    for hours in [1, 5, 23, 25] {
        store
            .insert(&HttpResponseBuilder::new("m1").at(now() - Duration::hours(hours)).result())
            .await
            .unwrap();
    }
    store
        .insert(&HttpResponseBuilder::new("m2").at(now()).result())
        .await
        .unwrap();

    let listed = store.http_list_daily(&HttpListParams::new("m1")).await.unwrap();
    assert_eq!(listed.rows, 3);
    let timestamps: Vec<i64> = listed.data.iter().map(|r| r.timestamp).collect();
    let mut sorted = timestamps.clone();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    assert_eq!(timestamps, sorted);
    assert!(listed.data.iter().all(|r| r.trigger == Trigger::Cron));
}

#[tokio::test]
async fn test_list_with_explicit_range() {
    let store = store();
    let from = now() - Duration::days(10);
    let to = now() - Duration::days(9);
    for time in [from, from + Duration::hours(3), to, to + Duration::seconds(1)] {
        store
            .insert(&HttpResponseBuilder::new("m1").at(time).result())
            .await
            .unwrap();
    }

    let params = HttpListParams::new("m1").with_range(from, to);
    assert_eq!(store.http_list_daily(&params).await.unwrap().rows, 3);
}

#[tokio::test]
async fn test_metrics_partition_and_region_filter() {
    let store = store();
    let runs = [
        (Region::Ams, 100, Some(200), false),
        (Region::Ams, 200, Some(302), false),
        (Region::Fra, 300, Some(503), false),
        (Region::Fra, 400, None, false),
        (Region::Gru, 500, Some(200), true),
    ];
    for (offset, (region, latency, status, failed)) in runs.into_iter().enumerate() {
        let mut builder = HttpResponseBuilder::new("m1")
            .region(region)
            .latency(latency)
            .at(now() - Duration::minutes(offset as i64 + 1));
        builder = match status {
            Some(code) => builder.status(code),
            None => builder.no_status(),
        };
        if failed {
            builder = builder.failed();
        }
        store.insert(&builder.result()).await.unwrap();
    }

    let all = store.http_metrics(&HttpMetricsParams::new("m1")).await.unwrap();
    let metrics = all.first().unwrap();
    assert_eq!(metrics.count, 5);
    assert_eq!((metrics.success, metrics.degraded, metrics.error), (2, 1, 2));
    assert_eq!(metrics.success + metrics.degraded + metrics.error, metrics.count);
    assert_eq!(metrics.p50_latency, 300.0);
    assert_eq!(
        metrics.last_timestamp,
        Some((now() - Duration::minutes(1)).timestamp_millis())
    );

    let fra = HttpMetricsParams::new("m1").with_regions([Region::Fra]);
    let metrics = store.http_metrics(&fra).await.unwrap().data[0];
    assert_eq!(metrics.count, 2);
    assert_eq!(metrics.p50_latency, 350.0);
}

#[tokio::test]
async fn test_metrics_daily_matches_one_day_period() {
    let store = store();
    store
        .insert(&HttpResponseBuilder::new("m1").at(now() - Duration::hours(2)).result())
        .await
        .unwrap();
    store
        .insert(&HttpResponseBuilder::new("m1").at(now() - Duration::days(2)).result())
        .await
        .unwrap();

    let daily = store.http_metrics_daily("m1", &[]).await.unwrap();
    assert_eq!(daily.data[0].count, 1);

    let week = HttpMetricsParams::new("m1").with_period(Period::SevenDays);
    assert_eq!(store.http_metrics(&week).await.unwrap().data[0].count, 2);
}

#[tokio::test]
async fn test_weekly_rollup_has_one_row_per_day_present() {
    let store = store();
    let today = now().duration_trunc(Duration::days(1)).unwrap();
    let day_one = today - Duration::days(5);
    let day_three = today - Duration::days(3);
    for time in [day_one + Duration::hours(1), day_three + Duration::hours(4), day_three + Duration::hours(9)] {
        store
            .insert(&HttpResponseBuilder::new("m1").at(time).result())
            .await
            .unwrap();
    }

    let weekly = store.http_status_weekly("m1").await.unwrap();
    assert_eq!(weekly.rows, 2);
    assert_eq!(weekly.data[0].day, day_one);
    assert_eq!(weekly.data[1].day, day_three);
    assert_eq!(weekly.data[1].count, 2);
    assert_eq!(weekly.data[1].ok, 2);
}

#[tokio::test]
async fn test_status_histogram_covers_45_days() {
    let store = store();
    for days in [1, 30, 44, 46] {
        store
            .insert(&HttpResponseBuilder::new("m1").status(500).at(now() - Duration::days(days)).result())
            .await
            .unwrap();
    }

    let buckets = store.http_status_45d("m1").await.unwrap();
    assert_eq!(buckets.rows, 3);
    assert!(buckets.data.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    assert!(buckets.data.iter().all(|b| b.error == 1 && b.ok == 0));
}

#[tokio::test]
async fn test_home_stats_counts_both_protocols() {
    let store = store();
    store
        .insert(&HttpResponseBuilder::new("m1").at(now() - Duration::minutes(3)).result())
        .await
        .unwrap();
    store
        .insert(&tcp_result("m2", now() - Duration::minutes(4)))
        .await
        .unwrap();
    store
        .insert(&tcp_result("m2", now() - Duration::days(3)))
        .await
        .unwrap();

    let recent = store
        .home_stats(&HomeStatsParams::new(RollingWindow::TenMinutes))
        .await
        .unwrap();
    assert_eq!(recent.data[0].count, 2);

    let all_time = store.home_stats(&HomeStatsParams::all_time()).await.unwrap();
    assert_eq!(all_time.data[0].count, 3);
    assert_eq!(all_time.rows, 1);
}

#[tokio::test]
async fn test_audit_log_with_no_matching_monitor_is_empty() {
    let store = store();
    store
        .insert_audit_log(&audit_event("monitor.failed", "m1", now() - Duration::days(1)))
        .await
        .unwrap();

    let params = AuditLogParams::for_monitor("m-unknown").with_interval_days(7);
    let response = store.audit_log(&params).await.unwrap();
    assert!(response.is_empty());
    assert_eq!(response.rows, 0);
}

#[tokio::test]
async fn test_audit_log_window_and_order() {
    let store = store();
    for (action, days) in [("monitor.created", 40), ("monitor.failed", 3), ("monitor.recovered", 1)] {
        store
            .insert_audit_log(&audit_event(action, "m1", now() - Duration::days(days)))
            .await
            .unwrap();
    }

    let default_window = store.audit_log(&AuditLogParams::for_monitor("m1")).await.unwrap();
    let actions: Vec<_> = default_window.data.iter().map(|r| r.action.as_str()).collect();
    assert_eq!(actions, vec!["monitor.recovered", "monitor.failed"]);
    assert_eq!(default_window.data[0].metadata["monitorId"], json!("m1"));

    let everything = store
        .audit_log(&AuditLogParams::default().with_interval_days(365))
        .await
        .unwrap();
    assert_eq!(everything.rows, 3);
}

#[tokio::test]
async fn test_audit_log_matches_numeric_monitor_id_as_text() {
    let store = store();
    let entry = AuditLogEntry::new("monitor.failed", "checker")
        .with_metadata("monitorId", json!(42))
        .with_time(now() - Duration::hours(2));
    store.insert_audit_log(&entry).await.unwrap();

    let response = store.audit_log(&AuditLogParams::for_monitor("42")).await.unwrap();
    assert_eq!(response.rows, 1);
    assert_eq!(response.data[0].metadata["monitorId"], json!(42));
}

#[tokio::test]
async fn test_rollups_count_missing_status_as_ok() {
    let store = store();
    let when = now() - Duration::hours(1);
    store
        .insert(&HttpResponseBuilder::new("m1").no_status().at(when).result())
        .await
        .unwrap();

    let weekly = store.http_status_weekly("m1").await.unwrap();
    assert_eq!((weekly.data[0].count, weekly.data[0].ok), (1, 1));

    let buckets = store.http_status_45d("m1").await.unwrap();
    let bucket = buckets.data[0];
    assert_eq!((bucket.ok, bucket.error, bucket.degraded), (1, 0, 0));
}

#[tokio::test]
async fn test_audit_interval_out_of_range_is_rejected() {
    let store = store();
    let err = store
        .audit_log(&AuditLogParams::default().with_interval_days(1000))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
}

#[tokio::test]
async fn test_blank_monitor_id_is_rejected_before_storage() {
    let store = store();
    assert!(matches!(
        store.http_status_weekly("  ").await,
        Err(StoreError::Validation(_))
    ));
    assert!(matches!(
        store.http_list_daily(&HttpListParams::new("")).await,
        Err(StoreError::Validation(_))
    ));
}

#[tokio::test]
async fn test_envelope_serializes_like_analytics_api() {
    let store = store();
    let response = store.home_stats(&HomeStatsParams::all_time()).await.unwrap();
    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(value["data"], json!([{"count": 0}]));
    assert_eq!(value["meta"], json!({}));
    assert_eq!(value["rows"], json!(1));
    assert!(value["statistics"]["elapsed"].as_f64().unwrap() >= 0.0);
}

#[tokio::test]
async fn test_shared_store_serves_concurrent_callers() {
    let store = std::sync::Arc::new(MemoryStore::new(PoolConfiguration::test()).pinned_at(now()));
    let mut handles = Vec::new();
    for i in 0..16 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let result = HttpResponseBuilder::new("m1")
                .latency(i)
                .at(now() - Duration::seconds(i))
                .result();
            store.insert(&result).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let metrics = store.http_metrics(&HttpMetricsParams::new("m1")).await.unwrap();
    assert_eq!(metrics.data[0].count, 16);
    assert_eq!(store.gate().in_use(), 0);
}
