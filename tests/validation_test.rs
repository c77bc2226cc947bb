//! Record validation at the ingest boundary.

mod common;

use serde_json::{json, Value};
use uptime_metrics::database::{MemoryStore, ProbeStore};
use uptime_metrics::validation::{parse_audit_log, parse_probe_result, IssueKind};
use uptime_metrics::{ingest_audit_record, ingest_record, JobType, ProbeResult, StoreError};

fn http_record() -> Value {
    json!({
        "timestamp": 1_718_445_600_000i64,
        "monitorId": "m1",
        "workspaceId": "w1",
        "region": "ams",
        "url": "https://status.example.com/health",
        "latency": 120,
        "statusCode": 200,
        "error": false,
        "cronTimestamp": 1_718_445_600_000i64,
        "timing": {
            "dnsStart": 0, "dnsDone": 5,
            "connectStart": 5, "connectDone": 15,
            "tlsHandshakeStart": 15, "tlsHandshakeDone": 35,
            "firstByteStart": 35, "firstByteDone": 75,
            "transferStart": 75, "transferDone": 83
        },
        "headers": {"content-type": "text/html"},
        "trigger": "api"
    })
}

#[test]
fn test_valid_http_record_parses() {
    let parsed = parse_probe_result(JobType::Http, &http_record()).unwrap();
    let ProbeResult::Http(response) = parsed else {
        panic!("expected an http result");
    };
    assert_eq!(response.monitor_id, "m1");
    assert_eq!(response.status_code, Some(200));
    assert_eq!(response.timing.unwrap().phases().ttfb, 40);
    assert_eq!(response.time.timestamp_millis(), 1_718_445_600_000);
}

#[test]
fn test_every_issue_is_reported_at_once() {
    let mut record = http_record();
    record["region"] = json!("mars");
    record["url"] = json!("not a url");
    record["latency"] = json!(-3);
    record.as_object_mut().unwrap().remove("monitorId");

    let err = parse_probe_result(JobType::Http, &record).unwrap_err();
    for field in ["region", "url", "latency", "monitorId"] {
        assert!(err.has_issue_for(field), "missing issue for {field}: {err}");
    }
    assert_eq!(err.issues.len(), 4);
}

#[test]
fn test_unknown_region_names_the_enumeration() {
    let mut record = http_record();
    record["region"] = json!("xyz");

    let err = parse_probe_result(JobType::Http, &record).unwrap_err();
    assert_eq!(
        err.issues[0].kind,
        IssueKind::NotInEnumeration {
            enumeration: "region",
            value: "xyz".to_string()
        }
    );
}

#[test]
fn test_partial_timing_is_rejected_with_dotted_path() {
    let mut record = http_record();
    record["timing"] = json!({"dnsStart": 0, "dnsDone": 5});

    let err = parse_probe_result(JobType::Http, &record).unwrap_err();
    assert!(err.has_issue_for("timing.connectStart"));
    assert!(err.has_issue_for("timing.transferDone"));
}

#[test]
fn test_status_code_outside_http_range_is_rejected() {
    let mut record = http_record();
    record["statusCode"] = json!(42);
    let err = parse_probe_result(JobType::Http, &record).unwrap_err();
    assert!(err.has_issue_for("statusCode"));
}

#[test]
fn test_status_code_is_reported_alongside_other_issues() {
    let mut record = http_record();
    record["region"] = json!("mars");
    record["statusCode"] = json!(999);

    let err = parse_probe_result(JobType::Http, &record).unwrap_err();
    assert!(err.has_issue_for("region"));
    assert!(err.has_issue_for("statusCode"));
    assert_eq!(err.issues.len(), 2);
}

#[test]
fn test_only_http_and_tcp_results_are_persisted() {
    let err = parse_probe_result(JobType::Dns, &http_record()).unwrap_err();
    assert!(err.has_issue_for("jobType"));
}

#[test]
fn test_tcp_record_without_uri() {
    let record = json!({
        "timestamp": 1_718_445_600_000i64,
        "monitorId": "m2",
        "workspaceId": "w1",
        "region": "fra",
        "latency": 7,
        "error": true,
        "cronTimestamp": 1_718_445_600_000i64,
        "errorMessage": "connection refused"
    });
    let ProbeResult::Tcp(response) = parse_probe_result(JobType::Tcp, &record).unwrap() else {
        panic!("expected a tcp result");
    };
    assert!(response.uri.is_none());
    assert!(response.error);
}

#[test]
fn test_audit_version_defaults_to_one() {
    let record = json!({
        "timestamp": 1_718_445_600_000i64,
        "id": "evt-1",
        "action": "monitor.failed",
        "actor": "checker",
        "metadata": {"monitorId": "m1"}
    });
    let entry = parse_audit_log(&record).unwrap();
    assert_eq!(entry.version, 1);
    assert_eq!(entry.monitor_id().as_deref(), Some("m1"));
}

#[test]
fn test_non_object_record() {
    let err = parse_audit_log(&json!([1, 2])).unwrap_err();
    assert_eq!(err.issues[0].kind, IssueKind::NotAnObject);
    assert!(err.to_string().contains("<record>"));
}

#[tokio::test]
async fn test_rejected_record_never_reaches_storage() {
    let store = MemoryStore::default();
    let mut record = http_record();
    record["error"] = json!("no");

    let err = ingest_record(&store, JobType::Http, &record).await.unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
    assert_eq!(store.row_counts(), (0, 0, 0));

    ingest_record(&store, JobType::Http, &http_record()).await.unwrap();
    ingest_audit_record(
        &store,
        &json!({
            "timestamp": 1_718_445_600_000i64,
            "id": "evt-2",
            "action": "monitor.created",
            "actor": "user-1"
        }),
    )
    .await
    .unwrap();
    assert_eq!(store.row_counts(), (1, 0, 1));
    assert_eq!(store.backend(), "memory");
}
