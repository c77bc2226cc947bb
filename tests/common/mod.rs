pub mod builders;
pub mod strategies;

pub use builders::*;
pub use strategies::*;

use std::sync::atomic::{AtomicU64, Ordering};

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Identifier unique within the test process
pub fn unique_name(prefix: &str) -> String {
    format!("{prefix}-{}", COUNTER.fetch_add(1, Ordering::Relaxed))
}
