//! Notification entity model.

use chrono::{DateTime, Utc};
use fitpulse_core::types::{NotificationId, UserId};
use fitpulse_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::category::{NotificationType, RelatedEntityType};
use super::status::{LifecycleEvent, NotificationPriority, NotificationStatus, TransitionError};

/// Maximum title length in characters.
pub const MAX_TITLE_LEN: usize = 100;
/// Maximum message length in characters.
pub const MAX_MESSAGE_LEN: usize = 500;
/// Retry budget given when the creator does not set one.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Link from a notification to the business object that caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelatedEntity {
    /// Kind of object.
    pub entity_type: RelatedEntityType,
    /// Identifier of the object in its own table.
    pub entity_id: i64,
}

impl RelatedEntity {
    /// Create a new link.
    pub fn new(entity_type: RelatedEntityType, entity_id: i64) -> Self {
        Self {
            entity_type,
            entity_id,
        }
    }
}

/// A scheduled reminder and its delivery lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Unique notification identifier.
    pub id: NotificationId,
    /// Owning user.
    pub user_id: UserId,
    /// Reminder category.
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    /// Notification title.
    pub title: String,
    /// Notification body text.
    pub message: String,
    /// Priority level.
    pub priority: NotificationPriority,
    /// Lifecycle state.
    pub status: NotificationStatus,
    /// Instant at or after which the notification may be delivered.
    pub scheduled_time: DateTime<Utc>,
    /// When the dispatcher accepted it.
    pub sent_time: Option<DateTime<Utc>>,
    /// When the user opened it.
    pub read_time: Option<DateTime<Utc>>,
    /// When the user dismissed it.
    pub dismissed_time: Option<DateTime<Utc>>,
    /// When the user tapped it.
    pub clicked_time: Option<DateTime<Utc>>,
    /// Denormalized read flag; true exactly when status is READ or CLICKED.
    pub is_read: bool,
    /// Whether the creator marked this as part of a series.
    pub is_recurring: bool,
    /// Opaque recurrence description.
    pub recurrence_pattern: Option<String>,
    /// Logical delivery channel.
    pub channel_id: String,
    /// Retries already consumed.
    pub retry_count: u32,
    /// Retry budget.
    pub max_retries: u32,
    /// Business object this notification was scheduled for.
    pub related_entity: Option<RelatedEntity>,
    /// While set and in the future, a sweep holds this record for dispatch.
    pub dispatch_lease_until: Option<DateTime<Utc>>,
    /// When the notification was created.
    pub created_at: DateTime<Utc>,
    /// When the notification was last modified.
    pub updated_at: DateTime<Utc>,
}

impl Notification {
    /// Whether the notification is eligible for dispatch at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == NotificationStatus::Pending && self.scheduled_time <= now
    }

    /// Whether a dispatch reservation is active at `now`.
    pub fn is_leased(&self, now: DateTime<Utc>) -> bool {
        self.dispatch_lease_until.is_some_and(|until| until > now)
    }

    /// Whether the retry budget allows another attempt.
    pub fn can_retry(&self) -> bool {
        self.status == NotificationStatus::Failed && self.retry_count < self.max_retries
    }

    /// Whether no operation can move this record anymore.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
            || (self.status == NotificationStatus::Failed && self.retry_count >= self.max_retries)
    }

    /// Produce the record that results from applying `event` at `now`.
    ///
    /// The receiver is left untouched so the caller can persist the result
    /// with a compare-and-set against the current status.
    pub fn transition(
        &self,
        event: &LifecycleEvent,
        now: DateTime<Utc>,
    ) -> Result<Notification, TransitionError> {
        let status = self.status.apply(event)?;
        let mut next = self.clone();
        next.status = status;
        next.updated_at = now;
        next.dispatch_lease_until = None;

        // User interactions cannot precede the hand-off.
        let after_sent = self.sent_time.map_or(now, |sent| now.max(sent));

        match event {
            LifecycleEvent::Sent => next.sent_time = Some(now.max(self.scheduled_time)),
            LifecycleEvent::Read => next.read_time = Some(after_sent),
            LifecycleEvent::Clicked => next.clicked_time = Some(after_sent),
            LifecycleEvent::Dismissed => next.dismissed_time = Some(after_sent),
            LifecycleEvent::Failed { .. } | LifecycleEvent::Cancelled => {}
            LifecycleEvent::Retry { scheduled_time } => {
                if self.retry_count >= self.max_retries {
                    return Err(TransitionError::RetriesExhausted {
                        retry_count: self.retry_count,
                        max_retries: self.max_retries,
                    });
                }
                next.retry_count = self.retry_count + 1;
                next.scheduled_time = *scheduled_time;
            }
        }

        next.is_read = status.implies_read();
        Ok(next)
    }

    /// Check the record-level invariants.
    pub fn check_invariants(&self) -> AppResult<()> {
        if self.retry_count > self.max_retries {
            return Err(AppError::validation(format!(
                "notification {}: retry_count {} exceeds max_retries {}",
                self.id, self.retry_count, self.max_retries
            )));
        }
        if self.status.implies_read() && !self.is_read {
            return Err(AppError::validation(format!(
                "notification {}: status {} requires is_read",
                self.id, self.status
            )));
        }
        Ok(())
    }
}

/// Input for creating a notification.
///
/// Built with [`NewNotification::new`] and the `with_*` methods; the
/// defaults follow the notification type.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_bookkeeping"))]
pub struct NewNotification {
    /// Owning user.
    pub user_id: UserId,
    /// Reminder category.
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    /// Notification title.
    #[validate(
        length(max = 100, message = "title must be at most 100 characters"),
        custom(function = "not_blank", message = "title must not be blank")
    )]
    pub title: String,
    /// Notification body text.
    #[validate(
        length(max = 500, message = "message must be at most 500 characters"),
        custom(function = "not_blank", message = "message must not be blank")
    )]
    pub message: String,
    /// Priority level.
    pub priority: NotificationPriority,
    /// When the notification becomes due.
    pub scheduled_time: DateTime<Utc>,
    /// Logical delivery channel.
    #[validate(custom(function = "not_blank", message = "channel_id must be set"))]
    pub channel_id: String,
    /// Whether the creator marked this as part of a series.
    #[serde(default)]
    pub is_recurring: bool,
    /// Opaque recurrence description.
    #[serde(default)]
    pub recurrence_pattern: Option<String>,
    /// Retries already consumed (normally zero).
    #[serde(default)]
    pub retry_count: u32,
    /// Retry budget.
    #[validate(range(max = 10, message = "max_retries must be at most 10"))]
    pub max_retries: u32,
    /// Kind of the related business object.
    #[serde(default)]
    pub related_entity_type: Option<RelatedEntityType>,
    /// Identifier of the related business object.
    #[serde(default)]
    pub related_entity_id: Option<i64>,
}

impl NewNotification {
    /// Create a notification input with type-derived defaults.
    pub fn new(
        user_id: UserId,
        notification_type: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
        scheduled_time: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            notification_type,
            title: title.into(),
            message: message.into(),
            priority: notification_type.default_priority(),
            scheduled_time,
            channel_id: notification_type.default_channel().to_string(),
            is_recurring: false,
            recurrence_pattern: None,
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            related_entity_type: None,
            related_entity_id: None,
        }
    }

    /// Override the priority.
    pub fn with_priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Override the delivery channel.
    pub fn with_channel(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = channel_id.into();
        self
    }

    /// Link to a business object.
    pub fn with_related(mut self, entity_type: RelatedEntityType, entity_id: i64) -> Self {
        self.related_entity_type = Some(entity_type);
        self.related_entity_id = Some(entity_id);
        self
    }

    /// Override the retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Mark as recurring with an opaque pattern.
    pub fn recurring(mut self, pattern: impl Into<String>) -> Self {
        self.is_recurring = true;
        self.recurrence_pattern = Some(pattern.into());
        self
    }

    /// Validate and convert into the stored related-entity link.
    pub fn checked_related_entity(&self) -> AppResult<Option<RelatedEntity>> {
        self.validate()
            .map_err(|e| AppError::validation(format!("Invalid notification: {e}")))?;
        Ok(match (self.related_entity_type, self.related_entity_id) {
            (Some(entity_type), Some(entity_id)) => Some(RelatedEntity::new(entity_type, entity_id)),
            _ => None,
        })
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

fn validate_bookkeeping(input: &NewNotification) -> Result<(), ValidationError> {
    if input.retry_count > input.max_retries {
        return Err(ValidationError::new("retry_count_range")
            .with_message("retry_count must not exceed max_retries".into()));
    }
    if input.related_entity_type.is_some() != input.related_entity_id.is_some() {
        return Err(ValidationError::new("related_entity_pair").with_message(
            "related_entity_type and related_entity_id must be set together".into(),
        ));
    }
    Ok(())
}
