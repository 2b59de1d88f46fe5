//! Notification repository implementation.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use fitpulse_core::error::{AppError, ErrorKind};
use fitpulse_core::result::AppResult;
use fitpulse_core::types::{NotificationId, UserId};
use fitpulse_entity::notification::{
    NewNotification, Notification, NotificationStatus, RelatedEntity,
};

use crate::models::{NOTIFICATION_COLUMNS, NotificationRow};
use crate::store::QueryScope;
use crate::time::{datetime_to_ms, opt_datetime_to_ms};

/// Ordering of the due set: most urgent first, then oldest due first.
const DUE_ORDER: &str = "CASE priority WHEN 'urgent' THEN 0 WHEN 'high' THEN 1 \
     WHEN 'default' THEN 2 ELSE 3 END, scheduled_time ASC, id ASC";

/// Repository for notification CRUD and sweep queries.
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    /// Create a new notification repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Return the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert a new pending notification.
    pub async fn create(
        &self,
        input: &NewNotification,
        related: Option<RelatedEntity>,
        now: DateTime<Utc>,
    ) -> AppResult<Notification> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            "INSERT INTO notifications (user_id, type, title, message, priority, status, \
             scheduled_time, is_read, is_recurring, recurrence_pattern, channel_id, retry_count, \
             max_retries, related_entity_id, related_entity_type, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, 'pending', ?, 0, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(input.user_id)
        .bind(input.notification_type)
        .bind(&input.title)
        .bind(&input.message)
        .bind(input.priority)
        .bind(datetime_to_ms(input.scheduled_time))
        .bind(input.is_recurring)
        .bind(&input.recurrence_pattern)
        .bind(&input.channel_id)
        .bind(i64::from(input.retry_count))
        .bind(i64::from(input.max_retries))
        .bind(related.map(|r| r.entity_id))
        .bind(related.map(|r| r.entity_type))
        .bind(datetime_to_ms(now))
        .bind(datetime_to_ms(now))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create notification", e))?;

        row.try_into()
    }

    /// Find a notification by ID.
    pub async fn find_by_id(&self, id: NotificationId) -> AppResult<Option<Notification>> {
        sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find notification", e))?
        .map(Notification::try_from)
        .transpose()
    }

    /// Pending, due, unreserved notifications in dispatch order.
    pub async fn find_due(&self, now: DateTime<Utc>, limit: u32) -> AppResult<Vec<Notification>> {
        let now = datetime_to_ms(now);
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE status = 'pending' AND scheduled_time <= ? \
             AND (dispatch_lease_until IS NULL OR dispatch_lease_until <= ?) \
             ORDER BY {DUE_ORDER} LIMIT ?"
        ))
        .bind(now)
        .bind(now)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find due notifications", e))?;

        collect(rows)
    }

    /// Pending notifications whose scheduled time is strictly before `now`.
    pub async fn find_overdue(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> AppResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE status = 'pending' AND scheduled_time < ? \
             ORDER BY scheduled_time ASC, id ASC LIMIT ?"
        ))
        .bind(datetime_to_ms(now))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find overdue notifications", e)
        })?;

        collect(rows)
    }

    /// Failed notifications that still have retry budget.
    pub async fn find_retryable(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> AppResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE status = 'failed' AND retry_count < max_retries AND updated_at <= ? \
             ORDER BY scheduled_time ASC, id ASC LIMIT ?"
        ))
        .bind(datetime_to_ms(now))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find retryable notifications", e)
        })?;

        collect(rows)
    }

    /// Pending notifications of a user linked to one business object.
    pub async fn find_pending_for_entity(
        &self,
        user_id: UserId,
        related: RelatedEntity,
    ) -> AppResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE user_id = ? AND status = 'pending' \
             AND related_entity_type = ? AND related_entity_id = ? \
             ORDER BY scheduled_time ASC, id ASC"
        ))
        .bind(user_id)
        .bind(related.entity_type)
        .bind(related.entity_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find entity notifications", e)
        })?;

        collect(rows)
    }

    /// Notifications of a user, newest scheduled first.
    pub async fn find_by_user(
        &self,
        user_id: UserId,
        status: Option<NotificationStatus>,
        limit: u32,
    ) -> AppResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE user_id = ? AND (? IS NULL OR status = ?) \
             ORDER BY scheduled_time DESC, id DESC LIMIT ?"
        ))
        .bind(user_id)
        .bind(status)
        .bind(status)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list notifications", e))?;

        collect(rows)
    }

    /// Every notification in a scope.
    pub async fn find_in_scope(&self, scope: &QueryScope) -> AppResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE (? IS NULL OR user_id = ?) AND (? IS NULL OR created_at >= ?) \
             ORDER BY id ASC"
        ))
        .bind(scope.user_id)
        .bind(scope.user_id)
        .bind(opt_datetime_to_ms(scope.since))
        .bind(opt_datetime_to_ms(scope.since))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load notifications for analytics", e)
        })?;

        collect(rows)
    }

    /// Take the dispatch reservation on a due notification.
    pub async fn claim(
        &self,
        id: NotificationId,
        now: DateTime<Utc>,
        lease_until: DateTime<Utc>,
    ) -> AppResult<bool> {
        let now = datetime_to_ms(now);
        let result = sqlx::query(
            "UPDATE notifications SET dispatch_lease_until = ? \
             WHERE id = ? AND status = 'pending' AND scheduled_time <= ? \
             AND (dispatch_lease_until IS NULL OR dispatch_lease_until <= ?)",
        )
        .bind(datetime_to_ms(lease_until))
        .bind(id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to claim notification", e))?;

        Ok(result.rows_affected() == 1)
    }

    /// Write `updated` if the row still matches the status and reservation
    /// of `expected`. Runs on the caller's connection so it can share a
    /// transaction with the log insert.
    pub async fn update_if_unchanged(
        conn: &mut SqliteConnection,
        expected: &Notification,
        updated: &Notification,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE notifications SET status = ?, scheduled_time = ?, sent_time = ?, \
             read_time = ?, dismissed_time = ?, clicked_time = ?, is_read = ?, \
             retry_count = ?, dispatch_lease_until = ?, updated_at = ? \
             WHERE id = ? AND status = ? AND dispatch_lease_until IS ?",
        )
        .bind(updated.status)
        .bind(datetime_to_ms(updated.scheduled_time))
        .bind(opt_datetime_to_ms(updated.sent_time))
        .bind(opt_datetime_to_ms(updated.read_time))
        .bind(opt_datetime_to_ms(updated.dismissed_time))
        .bind(opt_datetime_to_ms(updated.clicked_time))
        .bind(updated.is_read)
        .bind(i64::from(updated.retry_count))
        .bind(opt_datetime_to_ms(updated.dispatch_lease_until))
        .bind(datetime_to_ms(updated.updated_at))
        .bind(expected.id)
        .bind(expected.status)
        .bind(opt_datetime_to_ms(expected.dispatch_lease_until))
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update notification", e))?;

        Ok(result.rows_affected() == 1)
    }

    /// Count notifications per status.
    pub async fn count_by_status(
        &self,
        scope: &QueryScope,
    ) -> AppResult<Vec<(NotificationStatus, u64)>> {
        let rows = sqlx::query_as::<_, (NotificationStatus, i64)>(
            "SELECT status, COUNT(*) FROM notifications \
             WHERE (? IS NULL OR user_id = ?) AND (? IS NULL OR created_at >= ?) \
             GROUP BY status",
        )
        .bind(scope.user_id)
        .bind(scope.user_id)
        .bind(opt_datetime_to_ms(scope.since))
        .bind(opt_datetime_to_ms(scope.since))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count notifications", e))?;

        Ok(rows
            .into_iter()
            .map(|(status, count)| (status, count.max(0) as u64))
            .collect())
    }

    /// Delete every notification of a user. Log rows cascade.
    pub async fn delete_for_user(&self, user_id: UserId) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete user notifications", e)
            })?;
        Ok(result.rows_affected())
    }

    /// Clean up old notifications that can no longer change state.
    pub async fn cleanup_old(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM notifications WHERE created_at < ? \
             AND status != 'pending' \
             AND NOT (status = 'failed' AND retry_count < max_retries)",
        )
        .bind(datetime_to_ms(before))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to cleanup notifications", e)
        })?;
        Ok(result.rows_affected())
    }
}

fn collect(rows: Vec<NotificationRow>) -> AppResult<Vec<Notification>> {
    rows.into_iter().map(Notification::try_from).collect()
}
