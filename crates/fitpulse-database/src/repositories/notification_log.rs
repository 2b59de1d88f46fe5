//! Notification log repository implementation.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use fitpulse_core::error::{AppError, ErrorKind};
use fitpulse_core::result::AppResult;
use fitpulse_entity::log::{LogEvent, NewNotificationLog, NotificationLog};

use crate::models::{LOG_COLUMNS, NotificationLogRow};
use crate::store::QueryScope;
use crate::time::{datetime_to_ms, opt_datetime_to_ms};

/// Repository for the append-only delivery log.
#[derive(Debug, Clone)]
pub struct NotificationLogRepository {
    pool: SqlitePool,
}

impl NotificationLogRepository {
    /// Create a new log repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append an entry on the caller's connection.
    pub async fn insert(
        conn: &mut SqliteConnection,
        log: &NewNotificationLog,
    ) -> AppResult<NotificationLog> {
        let row = sqlx::query_as::<_, NotificationLogRow>(&format!(
            "INSERT INTO notification_logs (notification_id, user_id, notification_type, event, \
             channel_id, success, error_code, error_message, retry_count, latency_ms, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {LOG_COLUMNS}"
        ))
        .bind(log.notification_id)
        .bind(log.user_id)
        .bind(log.notification_type)
        .bind(log.event)
        .bind(&log.channel_id)
        .bind(log.success)
        .bind(&log.error_code)
        .bind(&log.error_message)
        .bind(i64::from(log.retry_count))
        .bind(log.latency_ms)
        .bind(datetime_to_ms(log.created_at))
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to append notification log", e))?;

        row.try_into()
    }

    /// Entries in a scope, oldest first.
    pub async fn find(
        &self,
        scope: &QueryScope,
        event: Option<LogEvent>,
    ) -> AppResult<Vec<NotificationLog>> {
        let rows = sqlx::query_as::<_, NotificationLogRow>(&format!(
            "SELECT {LOG_COLUMNS} FROM notification_logs \
             WHERE (? IS NULL OR user_id = ?) AND (? IS NULL OR created_at >= ?) \
             AND (? IS NULL OR event = ?) \
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(scope.user_id)
        .bind(scope.user_id)
        .bind(opt_datetime_to_ms(scope.since))
        .bind(opt_datetime_to_ms(scope.since))
        .bind(event)
        .bind(event)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load notification logs", e))?;

        rows.into_iter().map(NotificationLog::try_from).collect()
    }

    /// Delete entries older than `before`.
    pub async fn cleanup_old(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM notification_logs WHERE created_at < ?")
            .bind(datetime_to_ms(before))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to cleanup notification logs", e)
            })?;
        Ok(result.rows_affected())
    }
}
