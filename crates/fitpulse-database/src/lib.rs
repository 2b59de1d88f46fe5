//! # fitpulse-database
//!
//! SQLite connection management and the [`NotificationStore`] capability:
//! repositories over the `notifications` and `notification_logs` tables,
//! the SQLite-backed store built from them, and an in-memory store with
//! the same semantics.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod models;
pub mod repositories;
pub mod sqlite;
pub mod store;
pub mod time;

pub use connection::DatabasePool;
pub use memory::MemoryNotificationStore;
pub use sqlite::SqliteNotificationStore;
pub use store::{NotificationStore, QueryScope};
