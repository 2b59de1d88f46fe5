//! The notification store capability.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use fitpulse_core::AppResult;
use fitpulse_core::types::{NotificationId, UserId};
use fitpulse_entity::log::{LogEvent, NewNotificationLog, NotificationLog};
use fitpulse_entity::notification::{
    NewNotification, Notification, NotificationStatus, RelatedEntity,
};

/// Which records a read-side query covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryScope {
    /// Restrict to one user; `None` covers every user.
    pub user_id: Option<UserId>,
    /// Restrict to records created at or after this instant.
    pub since: Option<DateTime<Utc>>,
}

impl QueryScope {
    /// Every record of every user.
    pub fn all() -> Self {
        Self::default()
    }

    /// Every record of one user.
    pub fn user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            since: None,
        }
    }

    /// Narrow the scope to records created at or after `since`.
    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }
}

/// Durable storage for notifications and their delivery log.
///
/// Every mutation of an existing notification goes through
/// [`compare_and_set`](NotificationStore::compare_and_set), which is atomic
/// per record and writes the log entry in the same unit.
#[async_trait]
pub trait NotificationStore: Send + Sync + 'static {
    /// Persist a new pending notification and return it with its id.
    async fn insert(&self, input: &NewNotification, now: DateTime<Utc>) -> AppResult<Notification>;

    /// Fetch one notification.
    async fn find_by_id(&self, id: NotificationId) -> AppResult<Option<Notification>>;

    /// Pending notifications with `scheduled_time <= now` that no sweep
    /// currently holds, most urgent first, then oldest due first.
    async fn find_due(&self, now: DateTime<Utc>, limit: u32) -> AppResult<Vec<Notification>>;

    /// Pending notifications with `scheduled_time < now`, oldest first.
    async fn find_overdue(&self, now: DateTime<Utc>, limit: u32) -> AppResult<Vec<Notification>>;

    /// Failed notifications with retry budget left whose failure was
    /// recorded at or before `now`, oldest scheduled first.
    async fn find_retryable(&self, now: DateTime<Utc>, limit: u32) -> AppResult<Vec<Notification>>;

    /// Pending notifications of `user_id` linked to `related`.
    async fn find_pending_for_entity(
        &self,
        user_id: UserId,
        related: RelatedEntity,
    ) -> AppResult<Vec<Notification>>;

    /// Notifications of one user, newest scheduled first.
    async fn find_by_user(
        &self,
        user_id: UserId,
        status: Option<NotificationStatus>,
        limit: u32,
    ) -> AppResult<Vec<Notification>>;

    /// Every notification in `scope`.
    async fn find_for_analytics(&self, scope: &QueryScope) -> AppResult<Vec<Notification>>;

    /// Log entries in `scope`, optionally restricted to one event kind.
    async fn find_logs(
        &self,
        scope: &QueryScope,
        event: Option<LogEvent>,
    ) -> AppResult<Vec<NotificationLog>>;

    /// Reserve a due notification for dispatch until `lease_until`.
    ///
    /// Returns `false` when the record is no longer pending and due, or
    /// another sweep holds an unexpired reservation.
    async fn claim_for_dispatch(
        &self,
        id: NotificationId,
        now: DateTime<Utc>,
        lease_until: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Replace `expected` with `updated` if the stored record still has the
    /// status and dispatch reservation of `expected`, appending `log` in the
    /// same unit.
    ///
    /// Returns `false` and changes nothing when the stored record moved on.
    async fn compare_and_set(
        &self,
        expected: &Notification,
        updated: &Notification,
        log: &NewNotificationLog,
    ) -> AppResult<bool>;

    /// Number of notifications per status in `scope`.
    async fn count_by_status(&self, scope: &QueryScope)
    -> AppResult<Vec<(NotificationStatus, u64)>>;

    /// Remove every notification and log entry of a user.
    async fn delete_for_user(&self, user_id: UserId) -> AppResult<u64>;

    /// Remove settled notifications created before `cutoff`, and log
    /// entries older than `cutoff`. Pending notifications are kept.
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> AppResult<u64>;
}
