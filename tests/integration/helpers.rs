//! Shared test helpers for integration tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use fitpulse_core::config::{AppConfig, DatabaseConfig};
use fitpulse_core::traits::ManualClock;
use fitpulse_core::types::{NotificationId, UserId};
use fitpulse_database::{
    DatabasePool, MemoryNotificationStore, NotificationStore, SqliteNotificationStore,
};
use fitpulse_entity::notification::{NewNotification, Notification, NotificationType};
use fitpulse_service::{DispatchError, Dispatcher, NotificationEngine};

/// Store implementation under test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// `sqlite::memory:` with migrations applied
    Sqlite,
    /// `MemoryNotificationStore`
    Memory,
}

/// Both backends, for tests that loop over them
pub const BACKENDS: [Backend; 2] = [Backend::Sqlite, Backend::Memory];

/// Fixed starting instant for every test clock
pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
}

/// Work run inside every hand-off, before its result is returned
#[async_trait]
pub trait SendHook: Send + Sync {
    async fn during_send(&self, notification: &Notification);
}

/// Dispatcher that replays a script of results, then succeeds
#[derive(Default)]
pub struct ScriptedDispatcher {
    script: Mutex<VecDeque<Result<(), DispatchError>>>,
    sent: Mutex<Vec<NotificationId>>,
    always_fail: Mutex<Option<String>>,
    hook: Mutex<Option<Arc<dyn SendHook>>>,
}

impl ScriptedDispatcher {
    /// Queue the result of the next hand-off
    pub fn push(&self, result: Result<(), DispatchError>) {
        self.script.lock().unwrap().push_back(result);
    }

    /// Fail every hand-off with `code` until [`recover`](Self::recover)
    pub fn fail_always(&self, code: &str) {
        *self.always_fail.lock().unwrap() = Some(code.to_string());
    }

    /// Stop failing
    pub fn recover(&self) {
        *self.always_fail.lock().unwrap() = None;
    }

    /// Run `hook` inside every later hand-off
    pub fn set_hook(&self, hook: Arc<dyn SendHook>) {
        *self.hook.lock().unwrap() = Some(hook);
    }

    /// Ids handed to the dispatcher, in call order
    pub fn calls(&self) -> Vec<NotificationId> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Dispatcher for ScriptedDispatcher {
    async fn send(&self, notification: &Notification) -> Result<(), DispatchError> {
        self.sent.lock().unwrap().push(notification.id);
        let hook = self.hook.lock().unwrap().clone();
        if let Some(hook) = hook {
            hook.during_send(notification).await;
        }
        if let Some(code) = self.always_fail.lock().unwrap().clone() {
            return Err(DispatchError::new(code, "scripted failure"));
        }
        self.script.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

/// Engine plus handles on its collaborators
pub struct TestEngine {
    /// The engine under test
    pub engine: NotificationEngine,
    /// Store shared with the engine
    pub store: Arc<dyn NotificationStore>,
    /// Clock shared with the engine
    pub clock: Arc<ManualClock>,
    /// Dispatcher shared with the engine
    pub dispatcher: Arc<ScriptedDispatcher>,
}

impl TestEngine {
    /// Engine with default configuration
    pub async fn new(backend: Backend) -> Self {
        Self::with_config(backend, AppConfig::default()).await
    }

    /// Engine with the given configuration
    pub async fn with_config(backend: Backend, config: AppConfig) -> Self {
        let store: Arc<dyn NotificationStore> = match backend {
            Backend::Sqlite => {
                let db = DatabasePool::connect(&DatabaseConfig {
                    url: "sqlite::memory:".to_string(),
                    ..DatabaseConfig::default()
                })
                .await
                .expect("Failed to open in-memory SQLite");
                fitpulse_database::migration::run_migrations(db.pool())
                    .await
                    .expect("Failed to run migrations");
                Arc::new(SqliteNotificationStore::new(db.into_pool()))
            }
            Backend::Memory => Arc::new(MemoryNotificationStore::new()),
        };
        let clock = Arc::new(ManualClock::new(start()));
        let dispatcher = Arc::new(ScriptedDispatcher::default());
        let engine = NotificationEngine::new(
            store.clone(),
            clock.clone(),
            dispatcher.clone(),
            &config,
        );

        Self {
            engine,
            store,
            clock,
            dispatcher,
        }
    }

    /// Current instant of the test clock
    pub fn now(&self) -> DateTime<Utc> {
        self.engine.now()
    }

    /// Creation input for `user` due at `scheduled_time`
    pub fn draft(&self, user: i64, scheduled_time: DateTime<Utc>) -> NewNotification {
        self.engine.draft(
            UserId::new(user),
            NotificationType::WorkoutReminder,
            "Leg day",
            "Your workout starts in 15 minutes",
            scheduled_time,
        )
    }

    /// Schedule `input` and return its id
    pub async fn schedule(&self, input: NewNotification) -> NotificationId {
        self.engine
            .schedule_notification(&input)
            .await
            .expect("Failed to schedule notification")
    }

    /// Schedule a notification for `user` that became due an hour ago
    pub async fn schedule_overdue(&self, user: i64) -> NotificationId {
        self.schedule(self.draft(user, self.now() - Duration::hours(1)))
            .await
    }

    /// Fetch a notification that must exist
    pub async fn get(&self, id: NotificationId) -> Notification {
        self.store
            .find_by_id(id)
            .await
            .expect("Store read failed")
            .expect("Notification missing")
    }
}
