//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod analytics;
pub mod logging;
pub mod retention;
pub mod retry;
pub mod scheduler;

use serde::{Deserialize, Serialize};

pub use self::analytics::AnalyticsConfig;
pub use self::logging::LoggingConfig;
pub use self::retention::RetentionConfig;
pub use self::retry::{BackoffStrategy, RetryConfig};
pub use self::scheduler::SchedulerConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Sweep intervals and limits.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Retry backoff policy.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Retention cleanup settings.
    #[serde(default)]
    pub retention: RetentionConfig,
    /// Health-score weights.
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database connection pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL.
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    /// How long SQLite waits on a locked database, in milliseconds.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            connect_timeout_seconds: default_connect_timeout(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges `config/default.toml` (or the file given by `path`), the
    /// overlay named by `FITPULSE_ENV`, and environment variables prefixed
    /// with `FITPULSE__`.
    pub fn load(path: Option<&str>) -> Result<Self, AppError> {
        let base = path.unwrap_or("config/default");
        let env = std::env::var("FITPULSE_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name(base).required(path.is_some()))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("FITPULSE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.database.url.trim().is_empty() {
            return Err(AppError::configuration("database.url must not be empty"));
        }
        if self.database.max_connections == 0 {
            return Err(AppError::configuration(
                "database.max_connections must be greater than zero",
            ));
        }
        if self.scheduler.due_sweep_interval_seconds == 0
            || self.scheduler.retry_sweep_interval_seconds == 0
        {
            return Err(AppError::configuration(
                "scheduler sweep intervals must be greater than zero",
            ));
        }
        if self.scheduler.batch_limit == 0 {
            return Err(AppError::configuration(
                "scheduler.batch_limit must be greater than zero",
            ));
        }
        if self.scheduler.dispatch_lease_seconds < self.scheduler.dispatch_timeout_seconds {
            return Err(AppError::configuration(
                "scheduler.dispatch_lease_seconds must cover dispatch_timeout_seconds",
            ));
        }
        if self.retry.base_delay_seconds > self.retry.max_delay_seconds {
            return Err(AppError::configuration(format!(
                "retry.base_delay_seconds ({}) exceeds retry.max_delay_seconds ({})",
                self.retry.base_delay_seconds, self.retry.max_delay_seconds
            )));
        }
        if self.retry.default_max_retries > 10 {
            return Err(AppError::configuration(
                "retry.default_max_retries must be at most 10",
            ));
        }
        if self.analytics.total_weight() == 0 {
            return Err(AppError::configuration(
                "analytics weights must not all be zero",
            ));
        }
        Ok(())
    }
}

fn default_database_url() -> String {
    "sqlite:data/fitpulse.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_busy_timeout() -> u64 {
    5000
}
