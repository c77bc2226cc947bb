//! Result envelope shared by every aggregation query.
//!
//! Serializes as `{data, meta, rows, statistics}`, the shape consumers of the
//! hosted analytics API already parse.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Rows returned by one catalog query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse<T> {
    pub data: Vec<T>,
    pub meta: ResponseMeta,
    /// Always `data.len()`
    pub rows: usize,
    pub statistics: QueryStatistics,
}

/// Column metadata slot. Always serialized as `{}`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMeta {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryStatistics {
    /// Wall-clock seconds spent on the query
    pub elapsed: f64,
}

impl<T> QueryResponse<T> {
    pub fn new(data: Vec<T>, elapsed: Duration) -> Self {
        Self {
            rows: data.len(),
            data,
            meta: ResponseMeta::default(),
            statistics: QueryStatistics {
                elapsed: elapsed.as_secs_f64(),
            },
        }
    }

    /// Envelope around exactly one row
    pub fn single(row: T, elapsed: Duration) -> Self {
        Self::new(vec![row], elapsed)
    }

    pub fn first(&self) -> Option<&T> {
        self.data.first()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_shape() {
        let response = QueryResponse::new(vec![json!({"count": 3})], Duration::from_millis(250));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({
                "data": [{"count": 3}],
                "meta": {},
                "rows": 1,
                "statistics": {"elapsed": 0.25}
            })
        );
    }

    #[test]
    fn test_empty_envelope() {
        let response: QueryResponse<u8> = QueryResponse::new(Vec::new(), Duration::ZERO);
        assert_eq!(response.rows, 0);
        assert!(response.is_empty());
        assert_eq!(response.first(), None);
    }
}
