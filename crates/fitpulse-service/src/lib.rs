//! # fitpulse-service
//!
//! The notification engine. Each component takes its collaborators
//! (store, clock, dispatcher) at construction time via `Arc` references;
//! [`NotificationEngine`] wires them together and exposes the surface the
//! rest of the application calls.

pub mod analytics;
pub mod cancellation;
pub mod dispatch;
pub mod engine;
pub mod lifecycle;
pub mod retry;
pub mod scheduler;
pub mod sweep;

pub use analytics::{
    AnalyticsAggregator, ErrorFrequency, HealthGrade, NotificationDeliveryStats,
    NotificationInsights, TypeEngagement,
};
pub use cancellation::CancellationManager;
pub use dispatch::{ChannelDispatcher, DispatchError, DispatchRequest, Dispatcher, LogDispatcher};
pub use engine::NotificationEngine;
pub use lifecycle::LifecycleTracker;
pub use retry::{
    BackoffPolicy, ExponentialBackoff, FixedBackoff, LinearBackoff, RetryPolicy, backoff_from_config,
};
pub use scheduler::Scheduler;
pub use sweep::{NotificationOutcome, SweepKind, SweepOutcome, SweepReport};
