//! Notification domain entities.

pub mod category;
pub mod model;
pub mod status;

pub use category::{NotificationType, RelatedEntityType};
pub use model::{NewNotification, Notification, RelatedEntity};
pub use status::{LifecycleEvent, NotificationPriority, NotificationStatus, TransitionError};
