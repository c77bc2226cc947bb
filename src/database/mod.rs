//! # Database Operations
//!
//! Storage backends behind the [`ProbeStore`] trait and the pool lifecycle
//! they share.
//!
//! ## Key Components
//!
//! - [`connection_pool`] - bounded pool configuration, [`ProbePool`] and [`PoolGate`]
//! - [`store`] - the [`ProbeStore`] trait
//! - [`timescale_store`] - Postgres/TimescaleDB backend over `sqlx`
//! - [`memory_store`] - in-process backend for tests and local development
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use uptime_metrics::database::{PoolConfiguration, ProbePool, ProbeStore, TimescaleStore};
//! use uptime_metrics::models::insights::HttpListParams;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = ProbePool::connect("postgres://localhost/uptime", PoolConfiguration::default()).await?;
//! let store = TimescaleStore::new(pool);
//!
//! let runs = store.http_list_daily(&HttpListParams::new("monitor-42")).await?;
//! println!("{} runs in the last 24h", runs.rows);
//!
//! store.close().await;
//! # Ok(())
//! # }
//! ```

pub mod connection_pool;
pub mod memory_store;
pub mod store;
pub mod timescale_store;

pub use connection_pool::{GatePermit, PoolConfiguration, PoolGate, PoolStatistics, ProbePool};
pub use memory_store::MemoryStore;
pub use store::ProbeStore;
pub use timescale_store::TimescaleStore;

use crate::response::QueryResponse;
use crate::validation::{IssueKind, ValidationError};

/// Rows an operation produced, for the operation log
pub(crate) trait RowCount {
    fn row_count(&self) -> usize;
}

impl RowCount for () {
    fn row_count(&self) -> usize {
        1
    }
}

impl<T> RowCount for QueryResponse<T> {
    fn row_count(&self) -> usize {
        self.rows
    }
}

pub(crate) fn require_monitor_id(monitor_id: &str) -> Result<(), ValidationError> {
    if monitor_id.trim().is_empty() {
        Err(ValidationError::parameter("monitorId", IssueKind::Empty))
    } else {
        Ok(())
    }
}
