//! Channel-based hand-off to a platform layer running elsewhere.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use fitpulse_entity::notification::Notification;

use super::{DispatchError, Dispatcher};

/// One hand-off awaiting a platform acknowledgement.
#[derive(Debug)]
pub struct DispatchRequest {
    /// The notification to show.
    pub notification: Notification,
    /// Completes the hand-off; dropping it reports the platform as gone.
    pub ack: oneshot::Sender<Result<(), DispatchError>>,
}

impl DispatchRequest {
    /// Acknowledge successful delivery.
    pub fn accept(self) {
        let _ = self.ack.send(Ok(()));
    }

    /// Report a platform-side rejection.
    pub fn reject(self, error: DispatchError) {
        let _ = self.ack.send(Err(error));
    }
}

/// Sends each notification over a bounded channel and waits for the
/// receiving side to acknowledge it.
#[derive(Debug, Clone)]
pub struct ChannelDispatcher {
    sender: mpsc::Sender<DispatchRequest>,
    ack_timeout: Duration,
}

impl ChannelDispatcher {
    /// Create a dispatcher and the receiver the platform layer drains.
    pub fn new(capacity: usize, ack_timeout: Duration) -> (Self, mpsc::Receiver<DispatchRequest>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                sender,
                ack_timeout,
            },
            receiver,
        )
    }
}

#[async_trait]
impl Dispatcher for ChannelDispatcher {
    async fn send(&self, notification: &Notification) -> Result<(), DispatchError> {
        let (ack, acked) = oneshot::channel();
        let request = DispatchRequest {
            notification: notification.clone(),
            ack,
        };

        let handed_off = async {
            self.sender
                .send(request)
                .await
                .map_err(|_| DispatchError::platform_unavailable("platform receiver closed"))?;
            acked
                .await
                .map_err(|_| DispatchError::platform_unavailable("platform dropped the request"))?
        };

        match tokio::time::timeout(self.ack_timeout, handed_off).await {
            Ok(result) => result,
            Err(_) => Err(DispatchError::timeout(self.ack_timeout.as_secs())),
        }
    }
}
