//! Row models for the SQLite tables and their conversion into entities.

use sqlx::FromRow;

use fitpulse_core::AppError;
use fitpulse_core::types::{NotificationId, NotificationLogId, UserId};
use fitpulse_entity::log::{LogEvent, NotificationLog};
use fitpulse_entity::notification::{
    Notification, NotificationPriority, NotificationStatus, NotificationType, RelatedEntity,
    RelatedEntityType,
};

use crate::time::{ms_to_datetime, opt_ms_to_datetime};

/// Column list shared by every `SELECT` over `notifications`.
pub const NOTIFICATION_COLUMNS: &str = "id, user_id, type, title, message, priority, status, \
     scheduled_time, sent_time, read_time, dismissed_time, clicked_time, is_read, \
     is_recurring, recurrence_pattern, channel_id, retry_count, max_retries, \
     related_entity_id, related_entity_type, dispatch_lease_until, created_at, updated_at";

/// Column list shared by every `SELECT` over `notification_logs`.
pub const LOG_COLUMNS: &str = "id, notification_id, user_id, notification_type, event, \
     channel_id, success, error_code, error_message, retry_count, latency_ms, created_at";

/// Raw `notifications` row.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationRow {
    pub id: i64,
    pub user_id: i64,
    #[sqlx(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub priority: NotificationPriority,
    pub status: NotificationStatus,
    pub scheduled_time: i64,
    pub sent_time: Option<i64>,
    pub read_time: Option<i64>,
    pub dismissed_time: Option<i64>,
    pub clicked_time: Option<i64>,
    pub is_read: bool,
    pub is_recurring: bool,
    pub recurrence_pattern: Option<String>,
    pub channel_id: String,
    pub retry_count: i64,
    pub max_retries: i64,
    pub related_entity_id: Option<i64>,
    pub related_entity_type: Option<RelatedEntityType>,
    pub dispatch_lease_until: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = AppError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let related_entity = match (row.related_entity_type, row.related_entity_id) {
            (Some(entity_type), Some(entity_id)) => Some(RelatedEntity::new(entity_type, entity_id)),
            (None, None) => None,
            _ => {
                return Err(AppError::database(format!(
                    "notification {} has a half-set related entity",
                    row.id
                )));
            }
        };

        Ok(Notification {
            id: NotificationId::new(row.id),
            user_id: UserId::new(row.user_id),
            notification_type: row.notification_type,
            title: row.title,
            message: row.message,
            priority: row.priority,
            status: row.status,
            scheduled_time: ms_to_datetime(row.scheduled_time),
            sent_time: opt_ms_to_datetime(row.sent_time),
            read_time: opt_ms_to_datetime(row.read_time),
            dismissed_time: opt_ms_to_datetime(row.dismissed_time),
            clicked_time: opt_ms_to_datetime(row.clicked_time),
            is_read: row.is_read,
            is_recurring: row.is_recurring,
            recurrence_pattern: row.recurrence_pattern,
            channel_id: row.channel_id,
            retry_count: counter(row.id, "retry_count", row.retry_count)?,
            max_retries: counter(row.id, "max_retries", row.max_retries)?,
            related_entity,
            dispatch_lease_until: opt_ms_to_datetime(row.dispatch_lease_until),
            created_at: ms_to_datetime(row.created_at),
            updated_at: ms_to_datetime(row.updated_at),
        })
    }
}

/// Raw `notification_logs` row.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationLogRow {
    pub id: i64,
    pub notification_id: i64,
    pub user_id: i64,
    pub notification_type: NotificationType,
    pub event: LogEvent,
    pub channel_id: String,
    pub success: bool,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub retry_count: i64,
    pub latency_ms: Option<i64>,
    pub created_at: i64,
}

impl TryFrom<NotificationLogRow> for NotificationLog {
    type Error = AppError;

    fn try_from(row: NotificationLogRow) -> Result<Self, Self::Error> {
        Ok(NotificationLog {
            id: NotificationLogId::new(row.id),
            notification_id: NotificationId::new(row.notification_id),
            user_id: UserId::new(row.user_id),
            notification_type: row.notification_type,
            event: row.event,
            channel_id: row.channel_id,
            success: row.success,
            error_code: row.error_code,
            error_message: row.error_message,
            retry_count: counter(row.id, "retry_count", row.retry_count)?,
            latency_ms: row.latency_ms,
            created_at: ms_to_datetime(row.created_at),
        })
    }
}

fn counter(id: i64, column: &str, value: i64) -> Result<u32, AppError> {
    u32::try_from(value)
        .map_err(|_| AppError::database(format!("row {id}: {column} out of range ({value})")))
}
