//! In-memory [`NotificationStore`] for tests and embedding.
//!
//! Records live in [`DashMap`]s; the per-key entry lock gives the same
//! per-record atomicity the SQLite store gets from its conditional updates.

use std::cmp::Reverse;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use fitpulse_core::result::AppResult;
use fitpulse_core::types::{NotificationId, NotificationLogId, UserId};
use fitpulse_entity::log::{LogEvent, NewNotificationLog, NotificationLog};
use fitpulse_entity::notification::{
    NewNotification, Notification, NotificationStatus, RelatedEntity,
};

use crate::store::{NotificationStore, QueryScope};

/// Notification store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryNotificationStore {
    notifications: DashMap<NotificationId, Notification>,
    logs: DashMap<NotificationLogId, NotificationLog>,
    next_notification_id: AtomicI64,
    next_log_id: AtomicI64,
}

impl MemoryNotificationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored notifications.
    pub fn len(&self) -> usize {
        self.notifications.len()
    }

    /// Whether the store holds no notifications.
    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }

    fn select<F>(&self, predicate: F) -> Vec<Notification>
    where
        F: Fn(&Notification) -> bool,
    {
        self.notifications
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn push_log(&self, log: &NewNotificationLog) -> NotificationLog {
        let id = NotificationLogId::new(self.next_log_id.fetch_add(1, Ordering::SeqCst) + 1);
        let entry = log.clone().into_log(id);
        self.logs.insert(id, entry.clone());
        entry
    }
}

fn in_scope(scope: &QueryScope, user_id: UserId, created_at: DateTime<Utc>) -> bool {
    scope.user_id.is_none_or(|u| u == user_id) && scope.since.is_none_or(|s| created_at >= s)
}

fn truncate(mut items: Vec<Notification>, limit: u32) -> Vec<Notification> {
    items.truncate(limit as usize);
    items
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn insert(&self, input: &NewNotification, now: DateTime<Utc>) -> AppResult<Notification> {
        let related_entity = input.checked_related_entity()?;
        let id = NotificationId::new(self.next_notification_id.fetch_add(1, Ordering::SeqCst) + 1);
        let notification = Notification {
            id,
            user_id: input.user_id,
            notification_type: input.notification_type,
            title: input.title.clone(),
            message: input.message.clone(),
            priority: input.priority,
            status: NotificationStatus::Pending,
            scheduled_time: input.scheduled_time,
            sent_time: None,
            read_time: None,
            dismissed_time: None,
            clicked_time: None,
            is_read: false,
            is_recurring: input.is_recurring,
            recurrence_pattern: input.recurrence_pattern.clone(),
            channel_id: input.channel_id.clone(),
            retry_count: input.retry_count,
            max_retries: input.max_retries,
            related_entity,
            dispatch_lease_until: None,
            created_at: now,
            updated_at: now,
        };
        self.notifications.insert(id, notification.clone());
        Ok(notification)
    }

    async fn find_by_id(&self, id: NotificationId) -> AppResult<Option<Notification>> {
        Ok(self.notifications.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_due(&self, now: DateTime<Utc>, limit: u32) -> AppResult<Vec<Notification>> {
        let mut due = self.select(|n| n.is_due(now) && !n.is_leased(now));
        due.sort_by_key(|n| (Reverse(n.priority.numeric_priority()), n.scheduled_time, n.id));
        Ok(truncate(due, limit))
    }

    async fn find_overdue(&self, now: DateTime<Utc>, limit: u32) -> AppResult<Vec<Notification>> {
        let mut overdue =
            self.select(|n| n.status == NotificationStatus::Pending && n.scheduled_time < now);
        overdue.sort_by_key(|n| (n.scheduled_time, n.id));
        Ok(truncate(overdue, limit))
    }

    async fn find_retryable(&self, now: DateTime<Utc>, limit: u32) -> AppResult<Vec<Notification>> {
        let mut retryable = self.select(|n| n.can_retry() && n.updated_at <= now);
        retryable.sort_by_key(|n| (n.scheduled_time, n.id));
        Ok(truncate(retryable, limit))
    }

    async fn find_pending_for_entity(
        &self,
        user_id: UserId,
        related: RelatedEntity,
    ) -> AppResult<Vec<Notification>> {
        let mut pending = self.select(|n| {
            n.user_id == user_id
                && n.status == NotificationStatus::Pending
                && n.related_entity == Some(related)
        });
        pending.sort_by_key(|n| (n.scheduled_time, n.id));
        Ok(pending)
    }

    async fn find_by_user(
        &self,
        user_id: UserId,
        status: Option<NotificationStatus>,
        limit: u32,
    ) -> AppResult<Vec<Notification>> {
        let mut found =
            self.select(|n| n.user_id == user_id && status.is_none_or(|s| n.status == s));
        found.sort_by_key(|n| Reverse((n.scheduled_time, n.id)));
        Ok(truncate(found, limit))
    }

    async fn find_for_analytics(&self, scope: &QueryScope) -> AppResult<Vec<Notification>> {
        let mut found = self.select(|n| in_scope(scope, n.user_id, n.created_at));
        found.sort_by_key(|n| n.id);
        Ok(found)
    }

    async fn find_logs(
        &self,
        scope: &QueryScope,
        event: Option<LogEvent>,
    ) -> AppResult<Vec<NotificationLog>> {
        let mut found: Vec<NotificationLog> = self
            .logs
            .iter()
            .filter(|entry| {
                let log = entry.value();
                in_scope(scope, log.user_id, log.created_at) && event.is_none_or(|e| log.event == e)
            })
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by_key(|log| (log.created_at, log.id));
        Ok(found)
    }

    async fn claim_for_dispatch(
        &self,
        id: NotificationId,
        now: DateTime<Utc>,
        lease_until: DateTime<Utc>,
    ) -> AppResult<bool> {
        let Some(mut entry) = self.notifications.get_mut(&id) else {
            return Ok(false);
        };
        if !entry.is_due(now) || entry.is_leased(now) {
            return Ok(false);
        }
        entry.dispatch_lease_until = Some(lease_until);
        Ok(true)
    }

    async fn compare_and_set(
        &self,
        expected: &Notification,
        updated: &Notification,
        log: &NewNotificationLog,
    ) -> AppResult<bool> {
        let Some(mut entry) = self.notifications.get_mut(&expected.id) else {
            return Ok(false);
        };
        if entry.status != expected.status
            || entry.dispatch_lease_until != expected.dispatch_lease_until
        {
            return Ok(false);
        }
        *entry = updated.clone();
        self.push_log(log);
        Ok(true)
    }

    async fn count_by_status(
        &self,
        scope: &QueryScope,
    ) -> AppResult<Vec<(NotificationStatus, u64)>> {
        Ok(NotificationStatus::ALL
            .into_iter()
            .filter_map(|status| {
                let count = self
                    .notifications
                    .iter()
                    .filter(|e| e.status == status && in_scope(scope, e.user_id, e.created_at))
                    .count() as u64;
                (count > 0).then_some((status, count))
            })
            .collect())
    }

    async fn delete_for_user(&self, user_id: UserId) -> AppResult<u64> {
        let mut removed = 0u64;
        self.notifications.retain(|_, n| {
            let keep = n.user_id != user_id;
            removed += u64::from(!keep);
            keep
        });
        self.logs.retain(|_, log| log.user_id != user_id);
        Ok(removed)
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let mut removed = 0u64;
        self.notifications.retain(|_, n| {
            let keep =
                n.created_at >= cutoff || n.status == NotificationStatus::Pending || n.can_retry();
            removed += u64::from(!keep);
            keep
        });
        let remaining: std::collections::HashSet<NotificationId> =
            self.notifications.iter().map(|e| *e.key()).collect();
        self.logs
            .retain(|_, log| log.created_at >= cutoff && remaining.contains(&log.notification_id));
        Ok(removed)
    }
}
