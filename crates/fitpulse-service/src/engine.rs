//! Engine facade wiring the notification components together.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use fitpulse_core::AppResult;
use fitpulse_core::config::AppConfig;
use fitpulse_core::traits::Clock;
use fitpulse_core::types::{NotificationId, UserId};
use fitpulse_database::{NotificationStore, QueryScope};
use fitpulse_entity::notification::{
    LifecycleEvent, NewNotification, Notification, NotificationStatus, NotificationType,
    RelatedEntityType,
};

use crate::analytics::{AnalyticsAggregator, NotificationDeliveryStats, NotificationInsights};
use crate::cancellation::CancellationManager;
use crate::dispatch::{DispatchError, Dispatcher};
use crate::lifecycle::LifecycleTracker;
use crate::retry::{RetryPolicy, backoff_from_config};
use crate::scheduler::Scheduler;
use crate::sweep::{SweepKind, SweepOutcome, SweepReport};

/// The notification engine.
///
/// Owns one instance of each component, all sharing the same store.
/// Sweeps process records one at a time: a failure on one record is
/// recorded in the report and the sweep moves on, while a store failure
/// aborts the sweep and is returned to the caller.
#[derive(Clone)]
pub struct NotificationEngine {
    store: Arc<dyn NotificationStore>,
    clock: Arc<dyn Clock>,
    dispatcher: Arc<dyn Dispatcher>,
    scheduler: Scheduler,
    lifecycle: LifecycleTracker,
    retry: RetryPolicy,
    cancellation: CancellationManager,
    analytics: AnalyticsAggregator,
    dispatch_lease: Duration,
    dispatch_timeout: std::time::Duration,
    default_max_retries: u32,
    batch_limit: u32,
}

impl std::fmt::Debug for NotificationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationEngine")
            .field("dispatch_lease", &self.dispatch_lease)
            .field("dispatch_timeout", &self.dispatch_timeout)
            .field("batch_limit", &self.batch_limit)
            .finish_non_exhaustive()
    }
}

impl NotificationEngine {
    /// Build an engine from its collaborators and configuration.
    pub fn new(
        store: Arc<dyn NotificationStore>,
        clock: Arc<dyn Clock>,
        dispatcher: Arc<dyn Dispatcher>,
        config: &AppConfig,
    ) -> Self {
        let batch_limit = config.scheduler.batch_limit;
        let lifecycle = LifecycleTracker::new(store.clone());

        Self {
            scheduler: Scheduler::new(store.clone(), batch_limit),
            retry: RetryPolicy::new(
                store.clone(),
                lifecycle.clone(),
                backoff_from_config(&config.retry),
                batch_limit,
            ),
            cancellation: CancellationManager::new(store.clone(), lifecycle.clone()),
            analytics: AnalyticsAggregator::new(store.clone(), config.analytics.clone()),
            lifecycle,
            dispatch_lease: i64::try_from(config.scheduler.dispatch_lease_seconds)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or(Duration::MAX),
            dispatch_timeout: std::time::Duration::from_secs(
                config.scheduler.dispatch_timeout_seconds,
            ),
            default_max_retries: config.retry.default_max_retries,
            batch_limit,
            store,
            clock,
            dispatcher,
        }
    }

    /// Current time according to the engine's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// The lifecycle tracker, for callers recording transitions directly.
    pub fn lifecycle(&self) -> &LifecycleTracker {
        &self.lifecycle
    }

    /// Creation input with type defaults and the configured retry budget.
    pub fn draft(
        &self,
        user_id: UserId,
        notification_type: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
        scheduled_time: DateTime<Utc>,
    ) -> NewNotification {
        NewNotification::new(user_id, notification_type, title, message, scheduled_time)
            .with_max_retries(self.default_max_retries)
    }

    /// Validate and persist a new pending notification.
    pub async fn schedule_notification(&self, input: &NewNotification) -> AppResult<NotificationId> {
        let created = self.store.insert(input, self.clock.now()).await?;
        info!(
            notification_id = %created.id,
            user_id = %created.user_id,
            notification_type = %created.notification_type,
            scheduled_time = %created.scheduled_time,
            "Notification scheduled"
        );
        Ok(created.id)
    }

    /// Dispatch every notification due at `now`.
    pub async fn run_due_sweep(&self, now: DateTime<Utc>) -> AppResult<SweepReport> {
        let due = self.scheduler.due_notifications(now).await?;
        let mut report = SweepReport::new(SweepKind::Due);
        report.examined = due.len();

        for notification in due {
            let id = notification.id;
            let outcome = self.dispatch_one(notification, now).await?;
            report.record(id, outcome);
        }

        info!(
            examined = report.examined,
            sent = report.sent,
            failed = report.failed,
            skipped = report.skipped,
            "Due sweep completed"
        );
        Ok(report)
    }

    async fn dispatch_one(
        &self,
        notification: Notification,
        now: DateTime<Utc>,
    ) -> AppResult<SweepOutcome> {
        // Earlier hand-offs in this sweep may have taken a while.
        let claimed_at = self.clock.now().max(now);
        let lease_until = claimed_at
            .checked_add_signed(self.dispatch_lease)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        if !self
            .store
            .claim_for_dispatch(notification.id, claimed_at, lease_until)
            .await?
        {
            return Ok(SweepOutcome::Skipped {
                reason: "no longer pending or held by another sweep".to_string(),
            });
        }

        let mut claimed = notification;
        claimed.dispatch_lease_until = Some(lease_until);

        let delivery =
            match tokio::time::timeout(self.dispatch_timeout, self.dispatcher.send(&claimed)).await
            {
                Ok(result) => result,
                Err(_) => Err(DispatchError::timeout(self.dispatch_timeout.as_secs())),
            };

        let event = match &delivery {
            Ok(()) => LifecycleEvent::Sent,
            Err(e) => LifecycleEvent::Failed {
                error_code: e.code.clone(),
                error_message: Some(e.message.clone()),
            },
        };

        let completed_at = self.clock.now().max(claimed_at);
        match self.lifecycle.apply_to(&claimed, event, completed_at).await {
            Ok(updated) => Ok(match delivery {
                Ok(()) => SweepOutcome::Sent,
                Err(e) => {
                    warn!(
                        notification_id = %updated.id,
                        code = %e.code,
                        error = %e.message,
                        retry_count = updated.retry_count,
                        "Dispatch failed"
                    );
                    SweepOutcome::Failed {
                        code: e.code,
                        terminal: !updated.can_retry(),
                    }
                }
            }),
            Err(e) if e.is_recoverable() => {
                warn!(notification_id = %claimed.id, error = %e, "Skipping notification");
                Ok(SweepOutcome::Skipped { reason: e.message })
            }
            Err(e) => Err(e),
        }
    }

    /// Re-queue every failed notification that has retry budget left.
    pub async fn run_retry_sweep(&self, now: DateTime<Utc>) -> AppResult<SweepReport> {
        let retryable = self.retry.retryable_notifications(now).await?;
        let mut report = SweepReport::new(SweepKind::Retry);
        report.examined = retryable.len();

        for notification in retryable {
            let outcome = match self.retry.schedule_retry(&notification, now).await {
                Ok(updated) => SweepOutcome::Rescheduled {
                    retry_count: updated.retry_count,
                    scheduled_time: updated.scheduled_time,
                },
                Err(e) if e.is_recoverable() => {
                    warn!(notification_id = %notification.id, error = %e, "Skipping retry");
                    SweepOutcome::Skipped { reason: e.message }
                }
                Err(e) => return Err(e),
            };
            report.record(notification.id, outcome);
        }

        info!(
            examined = report.examined,
            rescheduled = report.rescheduled,
            skipped = report.skipped,
            "Retry sweep completed"
        );
        Ok(report)
    }

    /// Cancel pending notifications linked to a business object.
    pub async fn cancel_for_entity(
        &self,
        user_id: UserId,
        entity_type: RelatedEntityType,
        entity_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        self.cancellation
            .cancel_for_entity(user_id, entity_type, entity_id, now)
            .await
    }

    /// Record that the user opened a notification.
    pub async fn mark_read(&self, id: NotificationId, now: DateTime<Utc>) -> AppResult<Notification> {
        self.lifecycle.mark_read(id, now).await
    }

    /// Record that the user tapped a notification.
    pub async fn mark_clicked(
        &self,
        id: NotificationId,
        now: DateTime<Utc>,
    ) -> AppResult<Notification> {
        self.lifecycle.mark_clicked(id, now).await
    }

    /// Record that the user dismissed a notification.
    pub async fn mark_dismissed(
        &self,
        id: NotificationId,
        now: DateTime<Utc>,
    ) -> AppResult<Notification> {
        self.lifecycle.mark_dismissed(id, now).await
    }

    /// Delivery statistics for one user, or everyone.
    pub async fn get_stats(&self, user_id: Option<UserId>) -> AppResult<NotificationDeliveryStats> {
        self.analytics.get_stats(&scope_for(user_id)).await
    }

    /// Insights for one user, or everyone.
    pub async fn get_insights(&self, user_id: Option<UserId>) -> AppResult<NotificationInsights> {
        self.analytics.get_insights(&scope_for(user_id)).await
    }

    /// Notifications of one user, newest scheduled first.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        status: Option<NotificationStatus>,
        limit: u32,
    ) -> AppResult<Vec<Notification>> {
        self.store.find_by_user(user_id, status, limit).await
    }

    /// Pending notifications past their scheduled time.
    pub async fn overdue(&self, now: DateTime<Utc>) -> AppResult<Vec<Notification>> {
        self.scheduler.overdue_notifications(now).await
    }

    /// Remove every notification and log entry of a deleted user.
    pub async fn purge_user(&self, user_id: UserId) -> AppResult<u64> {
        let removed = self.store.delete_for_user(user_id).await?;
        info!(user_id = %user_id, removed, "Purged user notifications");
        Ok(removed)
    }

    /// Delete settled history older than `keep_days`.
    ///
    /// Pending records and failed records with retry budget are kept.
    pub async fn cleanup_older_than(&self, keep_days: u32) -> AppResult<u64> {
        let cutoff = self.clock.now() - Duration::days(i64::from(keep_days));
        let removed = self.store.delete_older_than(cutoff).await?;
        info!(keep_days, %cutoff, removed, "Retention cleanup completed");
        Ok(removed)
    }
}

fn scope_for(user_id: Option<UserId>) -> QueryScope {
    user_id.map_or_else(QueryScope::all, QueryScope::user)
}
