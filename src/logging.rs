//! # Structured Logging Module
//!
//! Environment-aware `tracing` setup plus the uniform events both store
//! backends emit for every operation.

use crate::config::LoggingConfig;
use crate::error::StoreError;
use std::sync::OnceLock;
use std::time::Duration;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging once per process.
///
/// `RUST_LOG` wins over the configured level, which wins over the
/// environment default. Safe to call repeatedly and alongside a subscriber
/// installed by the host application.
pub fn init_structured_logging(config: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let directive = config
            .level
            .clone()
            .unwrap_or_else(|| get_log_level(&environment).to_string());
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directive));

        let layer = if config.json {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .json()
                .boxed()
        } else {
            fmt::layer().with_target(true).with_ansi(true).boxed()
        };

        if tracing_subscriber::registry()
            .with(layer.with_filter(filter))
            .try_init()
            .is_err()
        {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            environment = %environment,
            level = %directive,
            json = config.json,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Get current environment from environment variables
pub fn get_environment() -> String {
    std::env::var("UPTIME_METRICS_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
pub fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

/// Log a completed store operation
pub fn log_store_operation(backend: &str, operation: &str, rows: usize, elapsed: Duration) {
    tracing::debug!(
        backend = backend,
        operation = operation,
        rows = rows,
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        "📈 STORE_OPERATION"
    );
}

/// Log a failed store operation with its classification
pub fn log_error(backend: &str, operation: &str, error: &StoreError) {
    match error {
        StoreError::Validation(validation) => tracing::warn!(
            backend = backend,
            operation = operation,
            record = validation.record,
            issues = validation.issues.len(),
            error = %error,
            "🚫 STORE_REJECTED"
        ),
        _ => tracing::error!(
            backend = backend,
            operation = operation,
            retryable = error.is_retryable(),
            error = %error,
            "❌ STORE_ERROR"
        ),
    }
}
