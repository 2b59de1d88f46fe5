//! CLI command definitions and dispatch.

pub mod analytics;
pub mod cancel;
pub mod cleanup;
pub mod config;
pub mod list;
pub mod migrate;
pub mod sweep;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use fitpulse_core::config::AppConfig;
use fitpulse_core::error::AppError;
use fitpulse_core::traits::SystemClock;
use fitpulse_database::{DatabasePool, SqliteNotificationStore};
use fitpulse_service::{LogDispatcher, NotificationEngine};

/// FitPulse: notification scheduling and delivery tracking
#[derive(Debug, Parser)]
#[command(name = "fitpulse", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (defaults to config/default.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Run one sweep now
    Sweep(sweep::SweepArgs),
    /// Cancel pending notifications linked to a business object
    Cancel(cancel::CancelArgs),
    /// Delivery statistics
    Stats(analytics::ScopeArgs),
    /// Delivery statistics with failure analysis and health score
    Insights(analytics::ScopeArgs),
    /// List notifications of a user
    List(list::ListArgs),
    /// Delete settled history older than the retention window
    Cleanup(cleanup::CleanupArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        let config_path = self.config.as_deref();
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, config_path).await,
            Commands::Sweep(args) => sweep::execute(args, config_path, self.format).await,
            Commands::Cancel(args) => cancel::execute(args, config_path, self.format).await,
            Commands::Stats(args) => analytics::stats(args, config_path, self.format).await,
            Commands::Insights(args) => analytics::insights(args, config_path, self.format).await,
            Commands::List(args) => list::execute(args, config_path, self.format).await,
            Commands::Cleanup(args) => cleanup::execute(args, config_path, self.format).await,
            Commands::Config(args) => config::execute(args, config_path, self.format).await,
        }
    }
}

/// Helper: load configuration from file and environment
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig, AppError> {
    AppConfig::load(config_path)
}

/// Helper: create database pool from config
pub async fn create_db_pool(config: &AppConfig) -> Result<DatabasePool, AppError> {
    DatabasePool::connect(&config.database).await
}

/// Helper: build an engine over the configured database
///
/// Sweeps started from the CLI hand notifications to the log dispatcher.
pub async fn build_engine(config: &AppConfig) -> Result<NotificationEngine, AppError> {
    let pool = create_db_pool(config).await?;
    let store = Arc::new(SqliteNotificationStore::new(pool.into_pool()));
    Ok(NotificationEngine::new(
        store,
        Arc::new(SystemClock),
        Arc::new(LogDispatcher),
        config,
    ))
}
