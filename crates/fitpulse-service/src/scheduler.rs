//! Due-notification selection.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use fitpulse_core::AppResult;
use fitpulse_database::NotificationStore;
use fitpulse_entity::notification::Notification;

/// Selects pending notifications whose scheduled time has elapsed.
///
/// Read-only: selecting a notification does not reserve it. The due sweep
/// claims each record separately before dispatching.
#[derive(Clone)]
pub struct Scheduler {
    store: Arc<dyn NotificationStore>,
    batch_limit: u32,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("batch_limit", &self.batch_limit)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Create a scheduler fetching at most `batch_limit` rows per call.
    pub fn new(store: Arc<dyn NotificationStore>, batch_limit: u32) -> Self {
        Self {
            store,
            batch_limit: batch_limit.max(1),
        }
    }

    /// Pending notifications with `scheduled_time <= now`, urgent first,
    /// then oldest due first.
    pub async fn due_notifications(&self, now: DateTime<Utc>) -> AppResult<Vec<Notification>> {
        self.store.find_due(now, self.batch_limit).await
    }

    /// Pending notifications strictly past their scheduled time.
    pub async fn overdue_notifications(&self, now: DateTime<Utc>) -> AppResult<Vec<Notification>> {
        self.store.find_overdue(now, self.batch_limit).await
    }
}
