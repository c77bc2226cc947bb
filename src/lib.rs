#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Uptime Metrics
//!
//! Data-access layer for uptime monitoring: ingests HTTP and TCP probe results
//! and audit events into a TimescaleDB table family, and serves a fixed
//! catalog of aggregation queries whose output is a drop-in replacement for
//! the hosted analytics API (`{data, meta, rows, statistics}`).
//!
//! ## Module Organization
//!
//! - [`constants`] - closed enumerations (job types, periods, regions, windows)
//! - [`models`] - probe results, audit events, timing and the query catalog rows
//! - [`validation`] - untyped record to typed model, all issues collected
//! - [`database`] - the [`ProbeStore`] trait, both backends and the pool lifecycle
//! - [`ingest`] - validate-then-insert for raw records
//! - [`response`] - the shared result envelope
//! - [`config`] - layered configuration
//! - [`error`] - structured error handling
//! - [`logging`] - `tracing` setup and operation events
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use uptime_metrics::config::ConfigManager;
//! use uptime_metrics::database::{ProbeStore, TimescaleStore};
//! use uptime_metrics::logging::init_structured_logging;
//! use uptime_metrics::models::insights::HttpMetricsParams;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! init_structured_logging(&manager.config().logging);
//!
//! let store = TimescaleStore::from_config(manager.config()).await?;
//! let metrics = store.http_metrics(&HttpMetricsParams::new("monitor-42")).await?;
//! println!("{}", serde_json::to_string(&metrics)?);
//!
//! store.close().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! Everything except the Postgres backend is exercised against
//! [`MemoryStore`](database::MemoryStore). The Postgres suite runs with
//! `--features timescale-tests` and a reachable `DATABASE_URL`.

pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod models;
pub mod response;
pub mod test_utils;
pub mod validation;

pub use config::{ConfigManager, ConfigurationError, MetricsConfig};
pub use constants::{JobType, Period, Region, RollingWindow, Trigger};
pub use database::{MemoryStore, PoolConfiguration, ProbePool, ProbeStore, TimescaleStore};
pub use error::{Result, StoreError};
pub use ingest::{ingest_audit_record, ingest_batch, ingest_record};
pub use models::{AuditLogEntry, HttpResponse, HttpTiming, ProbeResult, TcpResponse, TimingPhases};
pub use response::QueryResponse;
pub use validation::{FieldIssue, IssueKind, ValidationError};
