//! Repository implementations for the notification tables.

pub mod notification;
pub mod notification_log;

pub use notification::NotificationRepository;
pub use notification_log::NotificationLogRepository;
