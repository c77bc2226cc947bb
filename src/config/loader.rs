//! Configuration Loader
//!
//! Environment-aware loading built on the `config` crate. Layers, lowest
//! precedence first:
//!
//! 1. built-in defaults ([`MetricsConfig::default`])
//! 2. `config/uptime-metrics.{toml,yaml,...}`
//! 3. `config/uptime-metrics.<environment>.{toml,yaml,...}`
//! 4. `UPTIME_METRICS__SECTION__KEY` environment variables
//!
//! When no layer sets `database.url`, `TIMESCALE_URL` and then `DATABASE_URL`
//! are consulted.

use super::error::{ConfigResult, ConfigurationError};
use super::MetricsConfig;
use config::{Config, Environment, File};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "UPTIME_METRICS";

/// Base name of configuration files
pub const CONFIG_FILE_STEM: &str = "uptime-metrics";

const SUPPORTED_EXTENSIONS: [&str; 4] = ["toml", "yaml", "yml", "json"];

/// Loaded, validated configuration plus where it came from
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: MetricsConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            environment = environment,
            directory = %config_directory.display(),
            "Loading configuration"
        );

        let mut config = Self::build(&config_directory, environment)?;
        if config.database.url.is_none() {
            config.database.url = Self::fallback_database_url();
        }
        config.validate()?;

        debug!(config = %config.sanitized(), "Configuration loaded");
        info!(
            environment = environment,
            max_connections = config.database.max_connections,
            acquire_timeout_ms = config.database.acquire_timeout_ms,
            "⚙️ CONFIG: loaded"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    fn build(directory: &Path, environment: &str) -> ConfigResult<MetricsConfig> {
        let load_error = |error: config::ConfigError| ConfigurationError::LoadError {
            environment: environment.to_string(),
            error: error.to_string(),
        };

        let defaults = Config::try_from(&MetricsConfig::default()).map_err(load_error)?;
        let mut builder = Config::builder().add_source(defaults);
        for stem in [
            CONFIG_FILE_STEM.to_string(),
            format!("{CONFIG_FILE_STEM}.{environment}"),
        ] {
            for path in Self::candidate_files(directory, &stem) {
                debug!(file = %path.display(), "Adding configuration layer");
                builder = builder.add_source(File::from(path));
            }
        }

        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|layered| layered.try_deserialize::<MetricsConfig>())
            .map_err(load_error)
    }

    /// Existing files named `<stem>.<ext>` for the supported formats
    fn candidate_files(directory: &Path, stem: &str) -> Vec<PathBuf> {
        SUPPORTED_EXTENSIONS
            .iter()
            .map(|ext| directory.join(format!("{stem}.{ext}")))
            .filter(|path| path.is_file())
            .collect()
    }

    fn fallback_database_url() -> Option<String> {
        env::var("TIMESCALE_URL")
            .or_else(|_| env::var("DATABASE_URL"))
            .ok()
            .filter(|url| !url.trim().is_empty())
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Configuration as JSON with secrets masked, for diagnostics
    pub fn debug_config(&self) -> serde_json::Value {
        self.config.sanitized()
    }

    /// Detect the current environment
    pub fn detect_environment() -> String {
        env::var("UPTIME_METRICS_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }

    fn default_config_directory() -> PathBuf {
        PathBuf::from("config")
    }
}
