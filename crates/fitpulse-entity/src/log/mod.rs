//! Delivery event log entities.

pub mod model;

pub use model::{LogEvent, NewNotificationLog, NotificationLog};
