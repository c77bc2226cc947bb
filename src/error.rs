use crate::config::ConfigurationError;
use crate::validation::ValidationError;
use std::time::Duration;
use thiserror::Error;

/// Failure of a store operation.
///
/// Every variant except [`StoreError::Validation`] carries the name of the
/// operation that failed, so callers can tell which insert or query broke.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Input rejected before any storage access
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No pooled connection became available within the acquisition timeout
    #[error("Connection timeout in {operation}: no connection available within {timeout:?}")]
    ConnectionTimeout {
        operation: &'static str,
        timeout: Duration,
    },

    /// The database rejected or failed the statement
    #[error("Storage error in {operation}: {reason}")]
    Storage {
        operation: &'static str,
        reason: String,
    },

    /// The pool was closed before or during the operation
    #[error("Pool closed: {operation} cannot run after shutdown")]
    PoolClosed { operation: &'static str },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

impl StoreError {
    pub fn storage(operation: &'static str, reason: impl ToString) -> Self {
        Self::Storage {
            operation,
            reason: reason.to_string(),
        }
    }

    /// Map a driver error, keeping the operation identity.
    ///
    /// `timeout` is the configured acquisition timeout, reported when the
    /// pool gave up waiting.
    pub fn from_sqlx(operation: &'static str, error: sqlx::Error, timeout: Duration) -> Self {
        match error {
            sqlx::Error::PoolTimedOut => Self::ConnectionTimeout { operation, timeout },
            sqlx::Error::PoolClosed => Self::PoolClosed { operation },
            other => Self::storage(operation, other),
        }
    }

    /// Only acquisition timeouts are worth retrying; nothing retries automatically
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConnectionTimeout { .. })
    }

    /// The failing operation, when the error came from one
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            Self::ConnectionTimeout { operation, .. }
            | Self::Storage { operation, .. }
            | Self::PoolClosed { operation } => Some(operation),
            Self::Validation(_) | Self::Configuration(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
