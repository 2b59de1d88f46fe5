//! The platform hand-off capability and its implementations.

pub mod channel;
pub mod log;

use async_trait::async_trait;
use thiserror::Error;

use fitpulse_entity::notification::Notification;

pub use channel::{ChannelDispatcher, DispatchRequest};
pub use log::LogDispatcher;

/// Error code reported when the platform does not acknowledge in time.
pub const DISPATCH_TIMEOUT: &str = "DISPATCH_TIMEOUT";
/// Error code reported when the platform side has gone away.
pub const PLATFORM_UNAVAILABLE: &str = "PLATFORM_UNAVAILABLE";

/// A rejected platform hand-off.
///
/// Never propagated out of a sweep; the sweep records it on the
/// notification as a failed delivery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct DispatchError {
    /// Machine-readable cause, used to group failures in analytics.
    pub code: String,
    /// Human-readable detail.
    pub message: String,
}

impl DispatchError {
    /// Create a dispatch error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// The platform did not acknowledge within the allowed time.
    pub fn timeout(seconds: u64) -> Self {
        Self::new(
            DISPATCH_TIMEOUT,
            format!("platform did not acknowledge within {seconds}s"),
        )
    }

    /// The platform side is gone.
    pub fn platform_unavailable(message: impl Into<String>) -> Self {
        Self::new(PLATFORM_UNAVAILABLE, message)
    }
}

/// Hands a due notification to the platform.
///
/// This is the only call in the engine that may block for a long time;
/// no store state is held while it runs.
#[async_trait]
pub trait Dispatcher: Send + Sync + 'static {
    /// Attempt delivery of `notification`.
    async fn send(&self, notification: &Notification) -> Result<(), DispatchError>;
}
