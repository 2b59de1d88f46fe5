//! Notification delivery log entity.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use fitpulse_core::AppError;
use fitpulse_core::types::{NotificationId, NotificationLogId, UserId};
use serde::{Deserialize, Serialize};

use crate::notification::{LifecycleEvent, Notification, NotificationType};

/// Kind of lifecycle event recorded in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LogEvent {
    /// Dispatcher accepted the notification.
    Sent,
    /// Dispatcher rejected the notification.
    Failed,
    /// User opened the notification.
    Read,
    /// User tapped the notification.
    Clicked,
    /// User dismissed the notification.
    Dismissed,
    /// Notification was withdrawn.
    Cancelled,
    /// A failed notification was re-queued.
    RetryScheduled,
}

impl LogEvent {
    /// Return the event as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Read => "read",
            Self::Clicked => "clicked",
            Self::Dismissed => "dismissed",
            Self::Cancelled => "cancelled",
            Self::RetryScheduled => "retry_scheduled",
        }
    }
}

impl From<&LifecycleEvent> for LogEvent {
    fn from(event: &LifecycleEvent) -> Self {
        match event {
            LifecycleEvent::Sent => Self::Sent,
            LifecycleEvent::Read => Self::Read,
            LifecycleEvent::Clicked => Self::Clicked,
            LifecycleEvent::Dismissed => Self::Dismissed,
            LifecycleEvent::Failed { .. } => Self::Failed,
            LifecycleEvent::Cancelled => Self::Cancelled,
            LifecycleEvent::Retry { .. } => Self::RetryScheduled,
        }
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LogEvent {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            "read" => Ok(Self::Read),
            "clicked" => Ok(Self::Clicked),
            "dismissed" => Ok(Self::Dismissed),
            "cancelled" => Ok(Self::Cancelled),
            "retry_scheduled" => Ok(Self::RetryScheduled),
            _ => Err(AppError::validation(format!("Invalid log event: '{s}'"))),
        }
    }
}

/// An immutable record of one lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationLog {
    /// Unique log entry identifier.
    pub id: NotificationLogId,
    /// Notification the event belongs to.
    pub notification_id: NotificationId,
    /// Owner of the notification.
    pub user_id: UserId,
    /// Type of the notification at the time of the event.
    pub notification_type: NotificationType,
    /// What happened.
    pub event: LogEvent,
    /// Delivery channel.
    pub channel_id: String,
    /// Whether the event represents a successful step.
    pub success: bool,
    /// Failure code, for failed dispatches.
    pub error_code: Option<String>,
    /// Failure detail, for failed dispatches.
    pub error_message: Option<String>,
    /// Retry counter at the time of the event.
    pub retry_count: u32,
    /// Milliseconds between the relevant prior instant and the event.
    pub latency_ms: Option<i64>,
    /// Event timestamp.
    pub created_at: DateTime<Utc>,
}

/// Log entry awaiting insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNotificationLog {
    /// Notification the event belongs to.
    pub notification_id: NotificationId,
    /// Owner of the notification.
    pub user_id: UserId,
    /// Type of the notification.
    pub notification_type: NotificationType,
    /// What happened.
    pub event: LogEvent,
    /// Delivery channel.
    pub channel_id: String,
    /// Whether the event represents a successful step.
    pub success: bool,
    /// Failure code.
    pub error_code: Option<String>,
    /// Failure detail.
    pub error_message: Option<String>,
    /// Retry counter at the time of the event.
    pub retry_count: u32,
    /// Milliseconds between the relevant prior instant and the event.
    pub latency_ms: Option<i64>,
    /// Event timestamp.
    pub created_at: DateTime<Utc>,
}

impl NewNotificationLog {
    /// Describe the transition that produced `after` from `before`.
    ///
    /// Latency is measured from the scheduled time for dispatch outcomes
    /// and from the sent time for user interactions.
    pub fn for_transition(
        before: &Notification,
        after: &Notification,
        event: &LifecycleEvent,
        now: DateTime<Utc>,
    ) -> Self {
        let since = |from: DateTime<Utc>| Some((now - from).num_milliseconds().max(0));

        let (success, error_code, error_message, latency_ms) = match event {
            LifecycleEvent::Sent => (true, None, None, since(before.scheduled_time)),
            LifecycleEvent::Failed {
                error_code,
                error_message,
            } => (
                false,
                Some(error_code.clone()),
                error_message.clone(),
                since(before.scheduled_time),
            ),
            LifecycleEvent::Read | LifecycleEvent::Clicked | LifecycleEvent::Dismissed => {
                (true, None, None, before.sent_time.and_then(since))
            }
            LifecycleEvent::Cancelled | LifecycleEvent::Retry { .. } => (true, None, None, None),
        };

        Self {
            notification_id: after.id,
            user_id: after.user_id,
            notification_type: after.notification_type,
            event: LogEvent::from(event),
            channel_id: after.channel_id.clone(),
            success,
            error_code,
            error_message,
            retry_count: after.retry_count,
            latency_ms,
            created_at: now,
        }
    }

    /// Attach the store-assigned identifier.
    pub fn into_log(self, id: NotificationLogId) -> NotificationLog {
        NotificationLog {
            id,
            notification_id: self.notification_id,
            user_id: self.user_id,
            notification_type: self.notification_type,
            event: self.event,
            channel_id: self.channel_id,
            success: self.success,
            error_code: self.error_code,
            error_message: self.error_message,
            retry_count: self.retry_count,
            latency_ms: self.latency_ms,
            created_at: self.created_at,
        }
    }
}
