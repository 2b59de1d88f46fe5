//! Cron scheduler for retention cleanup.

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};

use fitpulse_core::config::RetentionConfig;
use fitpulse_core::error::AppError;
use fitpulse_service::NotificationEngine;

/// Cron-based scheduler for periodic maintenance
pub struct MaintenanceScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Engine performing the cleanup
    engine: NotificationEngine,
    /// Retention settings
    retention: RetentionConfig,
}

impl std::fmt::Debug for MaintenanceScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaintenanceScheduler")
            .field("retention", &self.retention)
            .finish_non_exhaustive()
    }
}

impl MaintenanceScheduler {
    /// Create a new maintenance scheduler
    pub async fn new(
        engine: NotificationEngine,
        retention: RetentionConfig,
    ) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self {
            scheduler,
            engine,
            retention,
        })
    }

    /// Register the retention cleanup job, unless retention is disabled
    pub async fn register_retention_cleanup(&self) -> Result<bool, AppError> {
        if !self.retention.enabled {
            tracing::info!("Retention cleanup disabled");
            return Ok(false);
        }

        let engine = self.engine.clone();
        let keep_days = self.retention.keep_days;
        let job = CronJob::new_async(self.retention.cleanup_cron.as_str(), move |_uuid, _lock| {
            let engine = engine.clone();
            Box::pin(async move {
                tracing::debug!(keep_days, "Running retention cleanup");
                if let Err(e) = engine.cleanup_older_than(keep_days).await {
                    tracing::error!(error = %e, "Retention cleanup failed");
                }
            })
        })
        .map_err(|e| {
            AppError::configuration(format!(
                "Invalid retention cron '{}': {e}",
                self.retention.cleanup_cron
            ))
        })?;

        self.scheduler.add(job).await.map_err(|e| {
            AppError::internal(format!("Failed to add retention cleanup schedule: {e}"))
        })?;

        tracing::info!(
            cron = %self.retention.cleanup_cron,
            keep_days,
            "Registered: retention_cleanup"
        );
        Ok(true)
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Maintenance scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Maintenance scheduler shut down");
        Ok(())
    }
}
