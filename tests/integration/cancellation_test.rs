//! Integration tests for entity-linked cancellation.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Duration;

use fitpulse_core::traits::{Clock, ManualClock};
use fitpulse_core::types::UserId;
use fitpulse_database::QueryScope;
use fitpulse_entity::log::LogEvent;
use fitpulse_entity::notification::{Notification, NotificationStatus, RelatedEntityType};
use fitpulse_service::NotificationEngine;

use crate::helpers::{BACKENDS, SendHook, TestEngine, start};

#[tokio::test]
async fn test_cancel_for_goal_leaves_sent_untouched() {
    for backend in BACKENDS {
        let t = TestEngine::new(backend).await;
        let now = t.now();

        let already_sent = t
            .schedule(t.draft(1, now).with_related(RelatedEntityType::Goal, 42))
            .await;
        t.engine.run_due_sweep(now).await.unwrap();

        let pending = t
            .schedule(
                t.draft(1, now + Duration::days(1))
                    .with_related(RelatedEntityType::Goal, 42),
            )
            .await;
        let other_goal = t
            .schedule(
                t.draft(1, now + Duration::days(1))
                    .with_related(RelatedEntityType::Goal, 43),
            )
            .await;
        let other_user = t
            .schedule(
                t.draft(2, now + Duration::days(1))
                    .with_related(RelatedEntityType::Goal, 42),
            )
            .await;
        let workout = t
            .schedule(
                t.draft(1, now + Duration::days(1))
                    .with_related(RelatedEntityType::Workout, 42),
            )
            .await;

        let cancelled = t
            .engine
            .cancel_for_entity(UserId::new(1), RelatedEntityType::Goal, 42, now)
            .await
            .unwrap();
        assert_eq!(cancelled, 1, "{backend:?}");

        assert_eq!(t.get(pending).await.status, NotificationStatus::Cancelled);
        assert_eq!(t.get(already_sent).await.status, NotificationStatus::Sent);
        for id in [other_goal, other_user, workout] {
            assert_eq!(t.get(id).await.status, NotificationStatus::Pending, "{backend:?}");
        }

        let logs = t
            .store
            .find_logs(&QueryScope::all(), Some(LogEvent::Cancelled))
            .await
            .unwrap();
        assert_eq!(logs.len(), 1, "{backend:?}");
        assert_eq!(logs[0].notification_id, pending);
    }
}

#[tokio::test]
async fn test_cancelled_notification_is_never_dispatched() {
    for backend in BACKENDS {
        let t = TestEngine::new(backend).await;
        let id = t
            .schedule(t.draft(5, t.now()).with_related(RelatedEntityType::Habit, 7))
            .await;

        t.engine
            .cancel_for_entity(UserId::new(5), RelatedEntityType::Habit, 7, t.now())
            .await
            .unwrap();
        let report = t.engine.run_due_sweep(t.now()).await.unwrap();

        assert!(report.is_empty(), "{backend:?}");
        assert!(t.dispatcher.calls().is_empty());
        assert_eq!(t.get(id).await.status, NotificationStatus::Cancelled);
    }
}

#[tokio::test]
async fn test_cancel_without_matches_is_a_no_op() {
    for backend in BACKENDS {
        let t = TestEngine::new(backend).await;
        t.schedule_overdue(1).await;

        let cancelled = t
            .engine
            .cancel_for_entity(UserId::new(1), RelatedEntityType::Achievement, 1, t.now())
            .await
            .unwrap();
        assert_eq!(cancelled, 0, "{backend:?}");
    }
}

/// Deletes the linked goal while its reminder is being handed off
struct CancelDuringSend {
    engine: NotificationEngine,
    clock: Arc<ManualClock>,
    cancelled: Mutex<u64>,
}

#[async_trait]
impl SendHook for CancelDuringSend {
    async fn during_send(&self, notification: &Notification) {
        self.clock.advance(Duration::seconds(25));
        let related = notification.related_entity.expect("reminder has a goal");
        let cancelled = self
            .engine
            .cancel_for_entity(
                notification.user_id,
                related.entity_type,
                related.entity_id,
                self.clock.now(),
            )
            .await
            .unwrap();
        *self.cancelled.lock().unwrap() += cancelled;
    }
}

#[tokio::test]
async fn test_cancel_during_hand_off_leaves_record_sent() {
    for backend in BACKENDS {
        let t = TestEngine::new(backend).await;
        let due_at = t.now() - Duration::minutes(1);
        let mut ids = Vec::new();
        for goal in 0..10 {
            ids.push(
                t.schedule(t.draft(3, due_at).with_related(RelatedEntityType::Goal, goal))
                    .await,
            );
        }
        let hook = Arc::new(CancelDuringSend {
            engine: t.engine.clone(),
            clock: t.clock.clone(),
            cancelled: Mutex::new(0),
        });
        t.dispatcher.set_hook(hook.clone());

        let report = t.engine.run_due_sweep(t.now()).await.unwrap();
        assert_eq!(report.sent, 10, "{backend:?}");
        assert_eq!(*hook.cancelled.lock().unwrap(), 0, "{backend:?}");

        let mut last_sent = None;
        for id in ids {
            let n = t.get(id).await;
            assert_eq!(n.status, NotificationStatus::Sent, "{backend:?}");
            last_sent = last_sent.max(n.sent_time);
        }
        assert_eq!(last_sent, Some(start() + Duration::seconds(250)), "{backend:?}");

        let cancelled = t
            .store
            .find_logs(&QueryScope::all(), Some(LogEvent::Cancelled))
            .await
            .unwrap();
        assert!(cancelled.is_empty(), "{backend:?}");
    }
}
