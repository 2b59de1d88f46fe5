//! SQLite-backed [`NotificationStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use fitpulse_core::error::{AppError, ErrorKind};
use fitpulse_core::result::AppResult;
use fitpulse_core::types::{NotificationId, UserId};
use fitpulse_entity::log::{LogEvent, NewNotificationLog, NotificationLog};
use fitpulse_entity::notification::{
    NewNotification, Notification, NotificationStatus, RelatedEntity,
};

use crate::repositories::{NotificationLogRepository, NotificationRepository};
use crate::store::{NotificationStore, QueryScope};

/// Notification store over the `notifications` and `notification_logs`
/// tables.
#[derive(Debug, Clone)]
pub struct SqliteNotificationStore {
    pool: SqlitePool,
    notifications: NotificationRepository,
    logs: NotificationLogRepository,
}

impl SqliteNotificationStore {
    /// Create a store over a migrated pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            notifications: NotificationRepository::new(pool.clone()),
            logs: NotificationLogRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl NotificationStore for SqliteNotificationStore {
    async fn insert(&self, input: &NewNotification, now: DateTime<Utc>) -> AppResult<Notification> {
        let related = input.checked_related_entity()?;
        let created = self.notifications.create(input, related, now).await?;
        debug!(notification_id = %created.id, user_id = %created.user_id, "Notification stored");
        Ok(created)
    }

    async fn find_by_id(&self, id: NotificationId) -> AppResult<Option<Notification>> {
        self.notifications.find_by_id(id).await
    }

    async fn find_due(&self, now: DateTime<Utc>, limit: u32) -> AppResult<Vec<Notification>> {
        self.notifications.find_due(now, limit).await
    }

    async fn find_overdue(&self, now: DateTime<Utc>, limit: u32) -> AppResult<Vec<Notification>> {
        self.notifications.find_overdue(now, limit).await
    }

    async fn find_retryable(&self, now: DateTime<Utc>, limit: u32) -> AppResult<Vec<Notification>> {
        self.notifications.find_retryable(now, limit).await
    }

    async fn find_pending_for_entity(
        &self,
        user_id: UserId,
        related: RelatedEntity,
    ) -> AppResult<Vec<Notification>> {
        self.notifications
            .find_pending_for_entity(user_id, related)
            .await
    }

    async fn find_by_user(
        &self,
        user_id: UserId,
        status: Option<NotificationStatus>,
        limit: u32,
    ) -> AppResult<Vec<Notification>> {
        self.notifications.find_by_user(user_id, status, limit).await
    }

    async fn find_for_analytics(&self, scope: &QueryScope) -> AppResult<Vec<Notification>> {
        self.notifications.find_in_scope(scope).await
    }

    async fn find_logs(
        &self,
        scope: &QueryScope,
        event: Option<LogEvent>,
    ) -> AppResult<Vec<NotificationLog>> {
        self.logs.find(scope, event).await
    }

    async fn claim_for_dispatch(
        &self,
        id: NotificationId,
        now: DateTime<Utc>,
        lease_until: DateTime<Utc>,
    ) -> AppResult<bool> {
        self.notifications.claim(id, now, lease_until).await
    }

    async fn compare_and_set(
        &self,
        expected: &Notification,
        updated: &Notification,
        log: &NewNotificationLog,
    ) -> AppResult<bool> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        if !NotificationRepository::update_if_unchanged(&mut *tx, expected, updated).await? {
            tx.rollback().await.map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to roll back transaction", e)
            })?;
            return Ok(false);
        }

        NotificationLogRepository::insert(&mut *tx, log).await?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit transition", e)
        })?;
        Ok(true)
    }

    async fn count_by_status(
        &self,
        scope: &QueryScope,
    ) -> AppResult<Vec<(NotificationStatus, u64)>> {
        self.notifications.count_by_status(scope).await
    }

    async fn delete_for_user(&self, user_id: UserId) -> AppResult<u64> {
        self.notifications.delete_for_user(user_id).await
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let notifications = self.notifications.cleanup_old(cutoff).await?;
        let logs = self.logs.cleanup_old(cutoff).await?;
        debug!(notifications, logs, %cutoff, "Retention cleanup applied");
        Ok(notifications)
    }
}
