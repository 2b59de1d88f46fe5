//! Retry policy: backoff curves and re-queueing of failed notifications.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use fitpulse_core::AppResult;
use fitpulse_core::config::{BackoffStrategy, RetryConfig};
use fitpulse_database::NotificationStore;
use fitpulse_entity::notification::{LifecycleEvent, Notification};

use crate::lifecycle::LifecycleTracker;

/// Delay before a given retry attempt.
///
/// Implementations must be non-decreasing in `attempt` so successive
/// retries never bunch up.
pub trait BackoffPolicy: Send + Sync + 'static {
    /// Delay before attempt number `attempt` (1-based).
    fn delay(&self, attempt: u32) -> Duration;
}

/// The same delay before every attempt.
#[derive(Debug, Clone, Copy)]
pub struct FixedBackoff {
    delay: Duration,
}

impl FixedBackoff {
    /// Create a fixed backoff.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl BackoffPolicy for FixedBackoff {
    fn delay(&self, _attempt: u32) -> Duration {
        self.delay
    }
}

/// `base * attempt`, capped at `max`.
#[derive(Debug, Clone, Copy)]
pub struct LinearBackoff {
    base_seconds: u64,
    max_seconds: u64,
}

impl LinearBackoff {
    /// Create a linear backoff.
    pub fn new(base_seconds: u64, max_seconds: u64) -> Self {
        Self {
            base_seconds,
            max_seconds,
        }
    }
}

impl BackoffPolicy for LinearBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        let seconds = self
            .base_seconds
            .saturating_mul(u64::from(attempt.max(1)))
            .min(self.max_seconds);
        seconds_to_duration(seconds)
    }
}

/// `base * 2^(attempt - 1)`, capped at `max`.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    base_seconds: u64,
    max_seconds: u64,
}

impl ExponentialBackoff {
    /// Create an exponential backoff.
    pub fn new(base_seconds: u64, max_seconds: u64) -> Self {
        Self {
            base_seconds,
            max_seconds,
        }
    }
}

impl BackoffPolicy for ExponentialBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.max(1) - 1;
        let factor = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
        let seconds = self
            .base_seconds
            .saturating_mul(factor)
            .min(self.max_seconds);
        seconds_to_duration(seconds)
    }
}

fn seconds_to_duration(seconds: u64) -> Duration {
    i64::try_from(seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

/// Build the backoff curve named in the configuration.
pub fn backoff_from_config(config: &RetryConfig) -> Arc<dyn BackoffPolicy> {
    match config.strategy {
        BackoffStrategy::Fixed => Arc::new(FixedBackoff::new(seconds_to_duration(
            config.base_delay_seconds.min(config.max_delay_seconds),
        ))),
        BackoffStrategy::Linear => Arc::new(LinearBackoff::new(
            config.base_delay_seconds,
            config.max_delay_seconds,
        )),
        BackoffStrategy::Exponential => Arc::new(ExponentialBackoff::new(
            config.base_delay_seconds,
            config.max_delay_seconds,
        )),
    }
}

/// Selects failed notifications with retry budget left and re-queues them.
///
/// Retrying is never implied by a failure; it happens only when this
/// policy runs, so a crash between the two leaves a plain FAILED record.
#[derive(Clone)]
pub struct RetryPolicy {
    store: Arc<dyn NotificationStore>,
    lifecycle: LifecycleTracker,
    backoff: Arc<dyn BackoffPolicy>,
    batch_limit: u32,
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("batch_limit", &self.batch_limit)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    /// Create a retry policy.
    pub fn new(
        store: Arc<dyn NotificationStore>,
        lifecycle: LifecycleTracker,
        backoff: Arc<dyn BackoffPolicy>,
        batch_limit: u32,
    ) -> Self {
        Self {
            store,
            lifecycle,
            backoff,
            batch_limit: batch_limit.max(1),
        }
    }

    /// Failed notifications with `retry_count < max_retries`, oldest
    /// scheduled first.
    pub async fn retryable_notifications(
        &self,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Notification>> {
        self.store.find_retryable(now, self.batch_limit).await
    }

    /// When the next attempt of `notification` would become due.
    pub fn next_attempt_at(&self, notification: &Notification, now: DateTime<Utc>) -> DateTime<Utc> {
        let attempt = notification.retry_count.saturating_add(1);
        now.checked_add_signed(self.backoff.delay(attempt))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Move a failed notification back to pending with an incremented
    /// retry counter and a backed-off scheduled time.
    pub async fn schedule_retry(
        &self,
        notification: &Notification,
        now: DateTime<Utc>,
    ) -> AppResult<Notification> {
        let scheduled_time = self.next_attempt_at(notification, now);
        self.lifecycle
            .apply_to(notification, LifecycleEvent::Retry { scheduled_time }, now)
            .await
    }
}
