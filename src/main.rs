//! FitPulse notification daemon.
//!
//! Wires the store, clock, and dispatcher into the engine, then runs the
//! due and retry sweeps plus the retention job until shut down.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use fitpulse_core::config::AppConfig;
use fitpulse_core::error::AppError;
use fitpulse_core::traits::SystemClock;
use fitpulse_database::{DatabasePool, SqliteNotificationStore};
use fitpulse_service::{LogDispatcher, NotificationEngine};
use fitpulse_worker::{MaintenanceScheduler, SweepRunner};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Daemon error");
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let config_path = std::env::var("FITPULSE_CONFIG").ok();
    AppConfig::load(config_path.as_deref())
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    if config.logging.is_json() {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt().pretty().with_env_filter(filter).with_target(true).init();
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting FitPulse daemon v{}", env!("CARGO_PKG_VERSION"));

    create_data_directory(&config.database.url).await?;

    let db = DatabasePool::connect(&config.database).await?;
    fitpulse_database::migration::run_migrations(db.pool()).await?;

    let store = Arc::new(SqliteNotificationStore::new(db.pool().clone()));
    let engine = NotificationEngine::new(
        store,
        Arc::new(SystemClock),
        Arc::new(LogDispatcher),
        &config,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut maintenance = MaintenanceScheduler::new(engine.clone(), config.retention.clone()).await?;
    maintenance.register_retention_cleanup().await?;
    maintenance.start().await?;

    let runner = SweepRunner::new(engine, &config.scheduler);
    let runner_handle = tokio::spawn(async move {
        runner.run(shutdown_rx).await;
    });

    tracing::info!("FitPulse daemon running");
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping sweeps...");
    let _ = shutdown_tx.send(true);

    if tokio::time::timeout(Duration::from_secs(30), runner_handle)
        .await
        .is_err()
    {
        tracing::warn!("Sweep runner did not stop within 30s");
    }
    maintenance.shutdown().await?;
    db.close().await;

    tracing::info!("FitPulse daemon shut down gracefully");
    Ok(())
}

/// Create the directory holding the SQLite file, if the url names one
async fn create_data_directory(url: &str) -> Result<(), AppError> {
    let path = url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();
    if path.is_empty() || path.contains(":memory:") {
        return Ok(());
    }

    match Path::new(path).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| {
                AppError::internal(format!("Failed to create dir '{}': {e}", dir.display()))
            }),
        _ => Ok(()),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
