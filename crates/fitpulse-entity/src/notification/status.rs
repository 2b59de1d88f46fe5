//! Notification status, priority, and the lifecycle transition table.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use fitpulse_core::AppError;
use fitpulse_core::types::NotificationId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle state of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    /// Waiting for its scheduled time.
    Pending,
    /// Handed to the platform.
    Sent,
    /// Opened by the user.
    Read,
    /// Swiped away without opening.
    Dismissed,
    /// Tapped through by the user.
    Clicked,
    /// The last dispatch attempt was rejected.
    Failed,
    /// Withdrawn before delivery.
    Cancelled,
}

impl NotificationStatus {
    /// Every variant, in declaration order.
    pub const ALL: [NotificationStatus; 7] = [
        Self::Pending,
        Self::Sent,
        Self::Read,
        Self::Dismissed,
        Self::Clicked,
        Self::Failed,
        Self::Cancelled,
    ];

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Read => "read",
            Self::Dismissed => "dismissed",
            Self::Clicked => "clicked",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether the notification reached the platform (SENT or any later state).
    pub fn is_delivered(&self) -> bool {
        matches!(
            self,
            Self::Sent | Self::Read | Self::Dismissed | Self::Clicked
        )
    }

    /// Whether no event can ever move the notification out of this state.
    ///
    /// `Failed` is only terminal once the retry budget is spent, which the
    /// status alone cannot tell; see `Notification::is_terminal`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Read | Self::Dismissed | Self::Clicked | Self::Cancelled
        )
    }

    /// Whether `is_read` must be set in this state.
    pub fn implies_read(&self) -> bool {
        matches!(self, Self::Read | Self::Clicked)
    }

    /// Apply a lifecycle event to this status.
    ///
    /// This is the single transition table of the engine. The retry budget
    /// guard on `Failed -> Pending` is enforced by the caller, which owns
    /// the counters.
    pub fn apply(self, event: &LifecycleEvent) -> Result<NotificationStatus, TransitionError> {
        use LifecycleEvent as E;
        use NotificationStatus as S;

        match (self, event) {
            (S::Pending, E::Sent) => Ok(S::Sent),
            (S::Pending, E::Failed { .. }) => Ok(S::Failed),
            (S::Pending, E::Cancelled) => Ok(S::Cancelled),
            (S::Sent, E::Read) => Ok(S::Read),
            (S::Sent, E::Clicked) => Ok(S::Clicked),
            (S::Sent, E::Dismissed) => Ok(S::Dismissed),
            (S::Failed, E::Retry { .. }) => Ok(S::Pending),
            (from, event) => Err(TransitionError::Invalid {
                from,
                event: event.name(),
            }),
        }
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NotificationStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| AppError::validation(format!("Invalid notification status: '{s}'")))
    }
}

/// Priority of a notification; orders the due set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    /// Delivered last.
    Low,
    /// Normal priority.
    Default,
    /// Delivered before default and low.
    High,
    /// Delivered first.
    Urgent,
}

impl NotificationPriority {
    /// Return the numeric priority (higher = more urgent).
    pub fn numeric_priority(&self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Default => 2,
            Self::High => 3,
            Self::Urgent => 4,
        }
    }

    /// Return the priority as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Default => "default",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl fmt::Display for NotificationPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NotificationPriority {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "default" => Ok(Self::Default),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(AppError::validation(format!(
                "Invalid notification priority: '{s}'"
            ))),
        }
    }
}

/// An event that drives the notification state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The dispatcher accepted the notification.
    Sent,
    /// The user opened the notification.
    Read,
    /// The user tapped the notification.
    Clicked,
    /// The user dismissed the notification.
    Dismissed,
    /// The dispatcher rejected the notification.
    Failed {
        /// Machine-readable failure cause.
        error_code: String,
        /// Human-readable failure detail.
        error_message: Option<String>,
    },
    /// The notification was withdrawn before delivery.
    Cancelled,
    /// A failed notification is re-queued for `scheduled_time`.
    Retry {
        /// When the next attempt becomes due.
        scheduled_time: DateTime<Utc>,
    },
}

impl LifecycleEvent {
    /// Short event name used in errors and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Read => "read",
            Self::Clicked => "clicked",
            Self::Dismissed => "dismissed",
            Self::Failed { .. } => "failed",
            Self::Cancelled => "cancelled",
            Self::Retry { .. } => "retry",
        }
    }
}

/// Why a lifecycle event could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The event is not allowed from the current status.
    #[error("cannot apply '{event}' to a notification in status '{from}'")]
    Invalid {
        /// Status the record was in.
        from: NotificationStatus,
        /// Event that was rejected.
        event: &'static str,
    },
    /// A retry was requested but the retry budget is spent.
    #[error("retry budget exhausted ({retry_count}/{max_retries})")]
    RetriesExhausted {
        /// Retries already consumed.
        retry_count: u32,
        /// Retry budget.
        max_retries: u32,
    },
    /// The stored record changed status between read and write.
    #[error("notification {id} is no longer in status '{expected}'")]
    Stale {
        /// Notification that lost the race.
        id: NotificationId,
        /// Status the writer expected to find.
        expected: NotificationStatus,
    },
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::Stale { .. } => AppError::conflict(err.to_string()),
            _ => AppError::invalid_transition(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed() -> LifecycleEvent {
        LifecycleEvent::Failed {
            error_code: "NET_DOWN".to_string(),
            error_message: None,
        }
    }

    #[test]
    fn test_allowed_transitions() {
        use NotificationStatus as S;
        assert_eq!(S::Pending.apply(&LifecycleEvent::Sent), Ok(S::Sent));
        assert_eq!(S::Pending.apply(&failed()), Ok(S::Failed));
        assert_eq!(S::Pending.apply(&LifecycleEvent::Cancelled), Ok(S::Cancelled));
        assert_eq!(S::Sent.apply(&LifecycleEvent::Read), Ok(S::Read));
        assert_eq!(S::Sent.apply(&LifecycleEvent::Clicked), Ok(S::Clicked));
        assert_eq!(S::Sent.apply(&LifecycleEvent::Dismissed), Ok(S::Dismissed));
        assert_eq!(
            S::Failed.apply(&LifecycleEvent::Retry {
                scheduled_time: Utc::now()
            }),
            Ok(S::Pending)
        );
    }

    #[test]
    fn test_sent_cannot_fail() {
        let err = NotificationStatus::Sent.apply(&failed()).unwrap_err();
        assert_eq!(
            err,
            TransitionError::Invalid {
                from: NotificationStatus::Sent,
                event: "failed"
            }
        );
    }

    #[test]
    fn test_clicked_and_dismissed_are_exclusive() {
        assert!(
            NotificationStatus::Clicked
                .apply(&LifecycleEvent::Dismissed)
                .is_err()
        );
        assert!(
            NotificationStatus::Dismissed
                .apply(&LifecycleEvent::Clicked)
                .is_err()
        );
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        let events = [
            LifecycleEvent::Sent,
            LifecycleEvent::Read,
            LifecycleEvent::Clicked,
            LifecycleEvent::Dismissed,
            failed(),
            LifecycleEvent::Cancelled,
            LifecycleEvent::Retry {
                scheduled_time: Utc::now(),
            },
        ];
        for status in NotificationStatus::ALL.into_iter().filter(|s| s.is_terminal()) {
            for event in &events {
                assert!(status.apply(event).is_err(), "{status} accepted {event:?}");
            }
        }
    }

    #[test]
    fn test_transition_error_maps_to_app_error() {
        let err: AppError = TransitionError::RetriesExhausted {
            retry_count: 3,
            max_retries: 3,
        }
        .into();
        assert_eq!(err.kind, fitpulse_core::error::ErrorKind::InvalidTransition);

        let err: AppError = TransitionError::Stale {
            id: NotificationId::new(7),
            expected: NotificationStatus::Pending,
        }
        .into();
        assert_eq!(err.kind, fitpulse_core::error::ErrorKind::Conflict);
    }

    #[test]
    fn test_priority_order() {
        assert!(
            NotificationPriority::Urgent.numeric_priority()
                > NotificationPriority::High.numeric_priority()
        );
        assert!(
            NotificationPriority::Default.numeric_priority()
                > NotificationPriority::Low.numeric_priority()
        );
    }
}
