//! Raw ingestion path used by the probe runner: validate an untyped record,
//! then append it through any [`ProbeStore`].
//!
//! [`ingest_batch`] keeps at most [`ProbeStore::capacity`] inserts in flight,
//! so a batch never waits on connections it holds itself. A rejected record
//! does not stop the others.

use crate::constants::JobType;
use crate::database::ProbeStore;
use crate::error::Result;
use crate::models::{AuditLogEntry, ProbeResult};
use crate::validation::{parse_audit_log, parse_probe_result};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::debug;

/// Validate and insert one probe result record of `job_type`
pub async fn ingest_record<S>(store: &S, job_type: JobType, record: &Value) -> Result<ProbeResult>
where
    S: ProbeStore + ?Sized,
{
    let result = parse_probe_result(job_type, record)?;
    store.insert(&result).await?;
    Ok(result)
}

/// Validate and insert one audit event record
pub async fn ingest_audit_record<S>(store: &S, record: &Value) -> Result<AuditLogEntry>
where
    S: ProbeStore + ?Sized,
{
    let entry = parse_audit_log(record)?;
    store.insert_audit_log(&entry).await?;
    Ok(entry)
}

/// Validate and insert many records of one job type.
///
/// Outcomes are returned in input order, one per record.
pub async fn ingest_batch<S>(store: &S, job_type: JobType, records: &[Value]) -> Vec<Result<ProbeResult>>
where
    S: ProbeStore + ?Sized,
{
    let in_flight = store.capacity().max(1);
    let outcomes: Vec<Result<ProbeResult>> = stream::iter(records)
        .map(|record| ingest_record(store, job_type, record))
        .buffered(in_flight)
        .collect()
        .await;
    let rejected = outcomes.iter().filter(|outcome| outcome.is_err()).count();
    debug!(
        job_type = %job_type,
        records = records.len(),
        rejected = rejected,
        in_flight = in_flight,
        "Batch ingested"
    );
    outcomes
}
