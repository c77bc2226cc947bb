//! # Metrics Store Configuration
//!
//! Layered configuration for the store client: built-in defaults, then
//! optional files under `config/`, then `UPTIME_METRICS__*` environment
//! variables. See [`ConfigManager`] for the lookup order.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use uptime_metrics::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let database = &manager.config().database;
//! println!("pool cap {}", database.max_connections);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::constants::windows::{DEFAULT_AUDIT_INTERVAL_DAYS, MAX_AUDIT_INTERVAL_DAYS};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Connection and pooling settings
    pub database: DatabaseConfig,

    pub logging: LoggingConfig,

    /// Defaults for the audit trail query
    pub audit: AuditConfig,
}

/// Database connection and pool sizing
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection string; falls back to TIMESCALE_URL, then DATABASE_URL
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long an operation may wait for a pooled connection
    pub acquire_timeout_ms: u64,
    pub idle_timeout_seconds: u64,
    pub max_lifetime_seconds: Option<u64>,
    pub test_before_acquire: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 20,
            min_connections: 0,
            acquire_timeout_ms: 2_000,
            idle_timeout_seconds: 30,
            max_lifetime_seconds: Some(1_800),
            test_before_acquire: false,
        }
    }
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }

    pub fn max_lifetime(&self) -> Option<Duration> {
        self.max_lifetime_seconds.map(Duration::from_secs)
    }

    /// The configured URL, or an error when none was resolved
    pub fn database_url(&self) -> ConfigResult<&str> {
        self.url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ConfigurationError::missing("database.url", "database configuration"))
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_connections == 0 {
            return Err(ConfigurationError::invalid_value(
                "database.max_connections",
                self.max_connections,
                "pool must allow at least one connection",
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(ConfigurationError::invalid_value(
                "database.min_connections",
                self.min_connections,
                format!("exceeds max_connections ({})", self.max_connections),
            ));
        }
        if self.acquire_timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "database.acquire_timeout_ms",
                0,
                "acquisition must be allowed to wait",
            ));
        }
        if self.idle_timeout_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "database.idle_timeout_seconds",
                0,
                "must be positive",
            ));
        }
        if let Some(url) = &self.url {
            if url.trim().is_empty() {
                return Err(ConfigurationError::missing(
                    "database.url",
                    "database configuration",
                ));
            }
            Url::parse(url).map_err(|e| ConfigurationError::InvalidDatabaseUrl {
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}

/// Log output settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive; environment-based default when absent
    pub level: Option<String>,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AuditConfig {
    pub default_interval_days: u32,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            default_interval_days: DEFAULT_AUDIT_INTERVAL_DAYS,
        }
    }
}

impl MetricsConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        self.database.validate()?;
        let days = self.audit.default_interval_days;
        if !(1..=MAX_AUDIT_INTERVAL_DAYS).contains(&days) {
            return Err(ConfigurationError::invalid_value(
                "audit.default_interval_days",
                days,
                format!("must be between 1 and {MAX_AUDIT_INTERVAL_DAYS}"),
            ));
        }
        Ok(())
    }

    /// Configuration as JSON with the database password masked
    pub fn sanitized(&self) -> serde_json::Value {
        let mut copy = self.clone();
        copy.database.url = copy.database.url.as_deref().map(mask_password);
        serde_json::to_value(copy).unwrap_or(serde_json::Value::Null)
    }
}

/// Replace the password of a connection string with `***`
pub fn mask_password(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) if url.password().is_some() => {
            // set_password only fails for cannot-be-a-base URLs, which carry no password
            let _ = url.set_password(Some("***"));
            url.to_string()
        }
        Ok(_) => raw.to_string(),
        Err(_) => "[unparseable url]".to_string(),
    }
}
