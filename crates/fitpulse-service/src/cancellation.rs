//! Cancellation of pending notifications tied to a business object.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use fitpulse_core::AppResult;
use fitpulse_core::types::UserId;
use fitpulse_database::NotificationStore;
use fitpulse_entity::notification::{LifecycleEvent, RelatedEntity, RelatedEntityType};

use crate::lifecycle::LifecycleTracker;

/// Cancels pending notifications linked to a related entity.
///
/// Only PENDING records are touched. A record currently held by a due
/// sweep is left to that sweep; once it is SENT it cannot be retracted.
#[derive(Clone)]
pub struct CancellationManager {
    store: Arc<dyn NotificationStore>,
    lifecycle: LifecycleTracker,
}

impl std::fmt::Debug for CancellationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationManager").finish_non_exhaustive()
    }
}

impl CancellationManager {
    /// Create a cancellation manager.
    pub fn new(store: Arc<dyn NotificationStore>, lifecycle: LifecycleTracker) -> Self {
        Self { store, lifecycle }
    }

    /// Cancel every pending notification of `user_id` linked to
    /// `entity_type`/`entity_id`. Returns how many were cancelled.
    pub async fn cancel_for_entity(
        &self,
        user_id: UserId,
        entity_type: RelatedEntityType,
        entity_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let related = RelatedEntity::new(entity_type, entity_id);
        let pending = self.store.find_pending_for_entity(user_id, related).await?;

        let mut cancelled = 0u64;
        for notification in &pending {
            if notification.is_leased(now) {
                debug!(notification_id = %notification.id, "Dispatch in flight, not cancelling");
                continue;
            }
            match self
                .lifecycle
                .apply_to(notification, LifecycleEvent::Cancelled, now)
                .await
            {
                Ok(_) => cancelled += 1,
                Err(e) if e.is_recoverable() => {
                    warn!(
                        notification_id = %notification.id,
                        error = %e,
                        "Skipping cancellation"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            user_id = %user_id,
            entity_type = %entity_type,
            entity_id,
            matched = pending.len(),
            cancelled,
            "Cancelled notifications for related entity"
        );
        Ok(cancelled)
    }
}
