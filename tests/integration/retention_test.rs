//! Integration tests for retention cleanup and user purge.

use chrono::Duration;

use fitpulse_core::types::UserId;
use fitpulse_database::QueryScope;

use crate::helpers::{BACKENDS, TestEngine};

#[tokio::test]
async fn test_cleanup_keeps_live_records() {
    for backend in BACKENDS {
        let t = TestEngine::new(backend).await;
        let sent = t.schedule_overdue(1).await;
        t.engine.run_due_sweep(t.now()).await.unwrap();

        let exhausted = t.schedule(t.draft(1, t.now()).with_max_retries(0)).await;
        let retryable = t.schedule(t.draft(1, t.now())).await;
        t.dispatcher.fail_always("NET_DOWN");
        t.engine.run_due_sweep(t.now()).await.unwrap();
        t.dispatcher.recover();

        let pending = t
            .schedule(t.draft(1, t.now() + Duration::days(365)))
            .await;

        t.clock.advance(Duration::days(100));
        let removed = t.engine.cleanup_older_than(90).await.unwrap();
        assert_eq!(removed, 2, "{backend:?}");

        for id in [sent, exhausted] {
            assert!(t.store.find_by_id(id).await.unwrap().is_none(), "{backend:?}");
        }
        for id in [retryable, pending] {
            assert!(t.store.find_by_id(id).await.unwrap().is_some(), "{backend:?}");
        }
    }
}

#[tokio::test]
async fn test_cleanup_keeps_recent_history() {
    for backend in BACKENDS {
        let t = TestEngine::new(backend).await;
        t.schedule_overdue(1).await;
        t.engine.run_due_sweep(t.now()).await.unwrap();

        t.clock.advance(Duration::days(30));
        let removed = t.engine.cleanup_older_than(90).await.unwrap();
        assert_eq!(removed, 0, "{backend:?}");
    }
}

#[tokio::test]
async fn test_purge_user_removes_notifications_and_logs() {
    for backend in BACKENDS {
        let t = TestEngine::new(backend).await;
        t.schedule_overdue(1).await;
        t.schedule_overdue(1).await;
        let kept = t.schedule_overdue(2).await;
        t.engine.run_due_sweep(t.now()).await.unwrap();

        let removed = t.engine.purge_user(UserId::new(1)).await.unwrap();
        assert_eq!(removed, 2, "{backend:?}");

        let logs = t
            .store
            .find_logs(&QueryScope::user(UserId::new(1)), None)
            .await
            .unwrap();
        assert!(logs.is_empty(), "{backend:?}");
        assert!(t.store.find_by_id(kept).await.unwrap().is_some());
        assert_eq!(
            t.store
                .find_logs(&QueryScope::user(UserId::new(2)), None)
                .await
                .unwrap()
                .len(),
            1
        );
    }
}
