//! Lifecycle tracker: applies state transitions and records them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use fitpulse_core::error::AppError;
use fitpulse_core::types::NotificationId;
use fitpulse_database::NotificationStore;
use fitpulse_entity::log::NewNotificationLog;
use fitpulse_entity::notification::{LifecycleEvent, Notification, TransitionError};

/// Applies lifecycle events to stored notifications.
///
/// Every transition is a compare-and-set against the status (and dispatch
/// reservation) the caller observed, and appends one log entry in the same
/// store write. Losing a race surfaces as an `InvalidTransition` error.
#[derive(Clone)]
pub struct LifecycleTracker {
    /// Notification store.
    store: Arc<dyn NotificationStore>,
}

impl std::fmt::Debug for LifecycleTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleTracker").finish_non_exhaustive()
    }
}

impl LifecycleTracker {
    /// Creates a new lifecycle tracker.
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    /// Apply `event` to a record already in hand.
    pub async fn apply_to(
        &self,
        current: &Notification,
        event: LifecycleEvent,
        now: DateTime<Utc>,
    ) -> Result<Notification, AppError> {
        let updated = current.transition(&event, now)?;
        let log = NewNotificationLog::for_transition(current, &updated, &event, now);

        if !self.store.compare_and_set(current, &updated, &log).await? {
            return Err(TransitionError::Stale {
                id: current.id,
                expected: current.status,
            }
            .into());
        }

        debug!(
            notification_id = %current.id,
            from = %current.status,
            to = %updated.status,
            event = event.name(),
            "Notification transitioned"
        );
        Ok(updated)
    }

    /// Load a record and apply `event` to it.
    pub async fn apply(
        &self,
        id: NotificationId,
        event: LifecycleEvent,
        now: DateTime<Utc>,
    ) -> Result<Notification, AppError> {
        let current = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Notification {id} not found")))?;
        self.apply_to(&current, event, now).await
    }

    /// PENDING -> SENT.
    pub async fn mark_sent(
        &self,
        id: NotificationId,
        now: DateTime<Utc>,
    ) -> Result<Notification, AppError> {
        self.apply(id, LifecycleEvent::Sent, now).await
    }

    /// SENT -> READ.
    pub async fn mark_read(
        &self,
        id: NotificationId,
        now: DateTime<Utc>,
    ) -> Result<Notification, AppError> {
        self.apply(id, LifecycleEvent::Read, now).await
    }

    /// SENT -> CLICKED.
    pub async fn mark_clicked(
        &self,
        id: NotificationId,
        now: DateTime<Utc>,
    ) -> Result<Notification, AppError> {
        self.apply(id, LifecycleEvent::Clicked, now).await
    }

    /// SENT -> DISMISSED.
    pub async fn mark_dismissed(
        &self,
        id: NotificationId,
        now: DateTime<Utc>,
    ) -> Result<Notification, AppError> {
        self.apply(id, LifecycleEvent::Dismissed, now).await
    }

    /// PENDING -> FAILED.
    pub async fn mark_failed(
        &self,
        id: NotificationId,
        now: DateTime<Utc>,
        error_code: impl Into<String>,
        error_message: Option<String>,
    ) -> Result<Notification, AppError> {
        let event = LifecycleEvent::Failed {
            error_code: error_code.into(),
            error_message,
        };
        self.apply(id, event, now).await
    }

    /// PENDING -> CANCELLED.
    pub async fn cancel(
        &self,
        id: NotificationId,
        now: DateTime<Utc>,
    ) -> Result<Notification, AppError> {
        self.apply(id, LifecycleEvent::Cancelled, now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use fitpulse_core::error::ErrorKind;
    use fitpulse_core::types::UserId;
    use fitpulse_database::{MemoryNotificationStore, QueryScope};
    use fitpulse_entity::log::LogEvent;
    use fitpulse_entity::notification::{NewNotification, NotificationStatus, NotificationType};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 2, 18, 0, 0).unwrap()
    }

    async fn setup() -> (Arc<MemoryNotificationStore>, LifecycleTracker, Notification) {
        let store = Arc::new(MemoryNotificationStore::new());
        let tracker = LifecycleTracker::new(store.clone());
        let n = store
            .insert(
                &NewNotification::new(
                    UserId::new(5),
                    NotificationType::NutritionReminder,
                    "Lunch",
                    "Log your meal",
                    now() - Duration::hours(1),
                ),
                now() - Duration::hours(2),
            )
            .await
            .unwrap();
        (store, tracker, n)
    }

    #[tokio::test]
    async fn test_mark_sent_twice_is_rejected() {
        let (store, tracker, n) = setup().await;

        let sent = tracker.mark_sent(n.id, now()).await.unwrap();
        assert_eq!(sent.sent_time, Some(now()));

        let err = tracker
            .mark_sent(n.id, now() + Duration::minutes(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidTransition);
        assert!(err.is_recoverable());

        let stored = store.find_by_id(n.id).await.unwrap().unwrap();
        assert_eq!(stored.sent_time, Some(now()));
        let sent_logs = store
            .find_logs(&QueryScope::all(), Some(LogEvent::Sent))
            .await
            .unwrap();
        assert_eq!(sent_logs.len(), 1);
    }

    #[tokio::test]
    async fn test_read_requires_sent() {
        let (_store, tracker, n) = setup().await;
        let err = tracker.mark_read(n.id, now()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidTransition);

        tracker.mark_sent(n.id, now()).await.unwrap();
        let read = tracker.mark_read(n.id, now()).await.unwrap();
        assert_eq!(read.status, NotificationStatus::Read);
        assert!(read.is_read);
    }

    #[tokio::test]
    async fn test_failed_logs_error_code() {
        let (store, tracker, n) = setup().await;
        tracker
            .mark_failed(n.id, now(), "NET_DOWN", Some("offline".to_string()))
            .await
            .unwrap();

        let failures = store
            .find_logs(&QueryScope::all(), Some(LogEvent::Failed))
            .await
            .unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].error_code.as_deref(), Some("NET_DOWN"));
        assert!(!failures[0].success);
    }

    #[tokio::test]
    async fn test_stale_record_loses() {
        let (_store, tracker, n) = setup().await;
        tracker.cancel(n.id, now()).await.unwrap();

        // `n` still says PENDING; the store no longer does.
        let err = tracker
            .apply_to(&n, LifecycleEvent::Sent, now())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_unknown_id() {
        let (_store, tracker, _n) = setup().await;
        let err = tracker
            .mark_sent(NotificationId::new(999), now())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
