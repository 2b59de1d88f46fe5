//! Dispatcher that only writes to the log.

use async_trait::async_trait;
use tracing::info;

use fitpulse_entity::notification::Notification;

use super::{DispatchError, Dispatcher};

/// Accepts every notification and records it through `tracing`.
///
/// Used by the headless daemon, where no platform layer is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDispatcher;

#[async_trait]
impl Dispatcher for LogDispatcher {
    async fn send(&self, notification: &Notification) -> Result<(), DispatchError> {
        info!(
            notification_id = %notification.id,
            user_id = %notification.user_id,
            notification_type = %notification.notification_type,
            channel = %notification.channel_id,
            priority = %notification.priority,
            title = %notification.title,
            "Notification delivered"
        );
        Ok(())
    }
}
