//! Sweep runner: drives the due and retry sweeps on their intervals.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use fitpulse_core::config::SchedulerConfig;
use fitpulse_service::{NotificationEngine, SweepKind, SweepReport};

/// Runs the due sweep and the retry sweep until shut down.
///
/// Each sweep kind has its own loop, so at most one sweep of a kind is
/// active at a time. A failed sweep is logged and the loop carries on.
#[derive(Debug, Clone)]
pub struct SweepRunner {
    /// Engine executing the sweeps
    engine: NotificationEngine,
    /// Period of the due sweep
    due_interval: Duration,
    /// Period of the retry sweep
    retry_interval: Duration,
}

impl SweepRunner {
    /// Create a runner with the configured intervals
    pub fn new(engine: NotificationEngine, config: &SchedulerConfig) -> Self {
        Self {
            engine,
            due_interval: Duration::from_secs(config.due_sweep_interval_seconds.max(1)),
            retry_interval: Duration::from_secs(config.retry_sweep_interval_seconds.max(1)),
        }
    }

    /// Run both loops until the cancel signal is received
    pub async fn run(&self, cancel: watch::Receiver<bool>) {
        tracing::info!(
            due_interval_secs = self.due_interval.as_secs(),
            retry_interval_secs = self.retry_interval.as_secs(),
            "Sweep runner started"
        );

        tokio::join!(
            self.run_loop(SweepKind::Due, self.due_interval, cancel.clone()),
            self.run_loop(SweepKind::Retry, self.retry_interval, cancel),
        );

        tracing::info!("Sweep runner shut down complete");
    }

    async fn run_loop(&self, kind: SweepKind, period: Duration, mut cancel: watch::Receiver<bool>) {
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        tracing::info!(sweep = %kind, "Sweep loop received shutdown signal");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.run_once(kind).await;
                }
            }
        }
    }

    /// Execute one sweep now; errors are logged, not returned
    pub async fn run_once(&self, kind: SweepKind) -> Option<SweepReport> {
        let now = self.engine.now();
        let result = match kind {
            SweepKind::Due => self.engine.run_due_sweep(now).await,
            SweepKind::Retry => self.engine.run_retry_sweep(now).await,
        };

        match result {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::error!(sweep = %kind, error = %e, "Sweep failed");
                None
            }
        }
    }
}
