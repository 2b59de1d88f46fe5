//! Integration tests for the due sweep.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;

use fitpulse_core::error::ErrorKind;
use fitpulse_database::QueryScope;
use fitpulse_entity::log::LogEvent;
use fitpulse_entity::notification::{NotificationPriority, NotificationStatus};
use fitpulse_entity::notification::Notification;
use fitpulse_service::SweepOutcome;

use crate::helpers::{BACKENDS, SendHook, TestEngine};

#[tokio::test]
async fn test_due_notification_is_sent_at_sweep_time() {
    for backend in BACKENDS {
        let t = TestEngine::new(backend).await;
        let id = t.schedule_overdue(1).await;
        let now = t.now();

        let report = t.engine.run_due_sweep(now).await.unwrap();
        assert_eq!(report.sent, 1, "{backend:?}");
        assert_eq!(report.outcome_for(id), Some(&SweepOutcome::Sent));

        let sent = t.get(id).await;
        assert_eq!(sent.status, NotificationStatus::Sent, "{backend:?}");
        assert_eq!(sent.sent_time, Some(now), "{backend:?}");
        assert_eq!(sent.dispatch_lease_until, None);
        assert_eq!(t.dispatcher.calls(), vec![id]);
    }
}

#[tokio::test]
async fn test_future_notification_is_left_pending() {
    for backend in BACKENDS {
        let t = TestEngine::new(backend).await;
        let id = t
            .schedule(t.draft(1, t.now() + Duration::minutes(30)))
            .await;

        let report = t.engine.run_due_sweep(t.now()).await.unwrap();
        assert!(report.is_empty(), "{backend:?}");
        assert_eq!(t.get(id).await.status, NotificationStatus::Pending);
        assert!(t.dispatcher.calls().is_empty());

        t.clock.advance(Duration::minutes(30));
        let report = t.engine.run_due_sweep(t.now()).await.unwrap();
        assert_eq!(report.sent, 1, "{backend:?}");
    }
}

#[tokio::test]
async fn test_due_sweep_dispatches_most_urgent_first() {
    for backend in BACKENDS {
        let t = TestEngine::new(backend).await;
        let due_at = t.now() - Duration::minutes(5);
        let low = t
            .schedule(t.draft(1, due_at).with_priority(NotificationPriority::Low))
            .await;
        let urgent = t
            .schedule(t.draft(1, due_at).with_priority(NotificationPriority::Urgent))
            .await;
        let default = t
            .schedule(t.draft(1, due_at).with_priority(NotificationPriority::Default))
            .await;

        t.engine.run_due_sweep(t.now()).await.unwrap();
        assert_eq!(t.dispatcher.calls(), vec![urgent, default, low], "{backend:?}");
    }
}

#[tokio::test]
async fn test_overdue_excludes_exactly_due() {
    for backend in BACKENDS {
        let t = TestEngine::new(backend).await;
        let late = t.schedule_overdue(1).await;
        t.schedule(t.draft(1, t.now())).await;

        let overdue = t.engine.overdue(t.now()).await.unwrap();
        let ids: Vec<_> = overdue.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![late], "{backend:?}");
    }
}

#[tokio::test]
async fn test_mark_sent_twice_is_rejected_once() {
    for backend in BACKENDS {
        let t = TestEngine::new(backend).await;
        let id = t.schedule_overdue(1).await;
        let first_at = t.now();

        t.engine.lifecycle().mark_sent(id, first_at).await.unwrap();
        t.clock.advance(Duration::minutes(1));
        let err = t
            .engine
            .lifecycle()
            .mark_sent(id, t.now())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidTransition, "{backend:?}");

        let sent = t.get(id).await;
        assert_eq!(sent.sent_time, Some(first_at), "{backend:?}");

        let logs = t
            .store
            .find_logs(&QueryScope::all(), Some(LogEvent::Sent))
            .await
            .unwrap();
        assert_eq!(logs.len(), 1, "{backend:?}");
    }
}

#[tokio::test]
async fn test_sent_notification_is_not_dispatched_again() {
    for backend in BACKENDS {
        let t = TestEngine::new(backend).await;
        t.schedule_overdue(1).await;

        t.engine.run_due_sweep(t.now()).await.unwrap();
        t.clock.advance(Duration::minutes(1));
        let again = t.engine.run_due_sweep(t.now()).await.unwrap();
        assert!(again.is_empty(), "{backend:?}");
        assert_eq!(t.dispatcher.calls().len(), 1);
    }
}

/// Suspends mid hand-off so another sweep can run
struct YieldingSend;

#[async_trait]
impl SendHook for YieldingSend {
    async fn during_send(&self, _notification: &Notification) {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }
}

#[tokio::test]
async fn test_concurrent_sweeps_dispatch_each_once() {
    const DUE: usize = 12;
    for backend in BACKENDS {
        let t = TestEngine::new(backend).await;
        t.dispatcher.set_hook(Arc::new(YieldingSend));
        let mut ids = Vec::new();
        for user in 0..DUE as i64 {
            ids.push(t.schedule_overdue(user + 1).await);
        }
        let now = t.now();

        let (a, b) = tokio::join!(t.engine.run_due_sweep(now), t.engine.run_due_sweep(now));
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a.sent + b.sent, DUE, "{backend:?}");
        assert_eq!(a.failed + b.failed, 0, "{backend:?}");

        let mut calls = t.dispatcher.calls();
        calls.sort();
        let mut expected = ids.clone();
        expected.sort();
        assert_eq!(calls, expected, "{backend:?}");

        for id in ids {
            assert_eq!(t.get(id).await.status, NotificationStatus::Sent, "{backend:?}");
        }
        let logs = t
            .store
            .find_logs(&QueryScope::all(), Some(LogEvent::Sent))
            .await
            .unwrap();
        assert_eq!(logs.len(), DUE, "{backend:?}");
    }
}
