//! Integration tests for user interactions and the state machine.

use chrono::Duration;

use fitpulse_core::error::ErrorKind;
use fitpulse_entity::notification::{LifecycleEvent, NotificationStatus, RelatedEntityType};

use crate::helpers::{BACKENDS, TestEngine};

#[tokio::test]
async fn test_read_and_click_set_is_read() {
    for backend in BACKENDS {
        let t = TestEngine::new(backend).await;
        let read = t.schedule_overdue(1).await;
        let clicked = t.schedule_overdue(1).await;
        t.engine.run_due_sweep(t.now()).await.unwrap();

        t.clock.advance(Duration::seconds(45));
        let read = t.engine.mark_read(read, t.now()).await.unwrap();
        let clicked = t.engine.mark_clicked(clicked, t.now()).await.unwrap();

        for n in [&read, &clicked] {
            assert!(n.is_read, "{backend:?}");
            n.check_invariants().unwrap();
        }
        assert_eq!(read.read_time, Some(t.now()));
        assert_eq!(clicked.clicked_time, Some(t.now()));
    }
}

#[tokio::test]
async fn test_interaction_requires_delivery() {
    for backend in BACKENDS {
        let t = TestEngine::new(backend).await;
        let id = t.schedule_overdue(1).await;

        let err = t.engine.mark_clicked(id, t.now()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidTransition, "{backend:?}");
        assert_eq!(t.get(id).await.status, NotificationStatus::Pending);
    }
}

#[tokio::test]
async fn test_clicked_and_dismissed_are_exclusive() {
    for backend in BACKENDS {
        let t = TestEngine::new(backend).await;
        let id = t.schedule_overdue(1).await;
        t.engine.run_due_sweep(t.now()).await.unwrap();

        t.engine.mark_clicked(id, t.now()).await.unwrap();
        let err = t.engine.mark_dismissed(id, t.now()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidTransition, "{backend:?}");
        assert_eq!(t.get(id).await.status, NotificationStatus::Clicked);
    }
}

#[tokio::test]
async fn test_cancelled_never_returns_to_pending() {
    for backend in BACKENDS {
        let t = TestEngine::new(backend).await;
        let id = t
            .schedule(t.draft(1, t.now()).with_related(RelatedEntityType::Workout, 9))
            .await;
        t.engine.lifecycle().cancel(id, t.now()).await.unwrap();

        let retry = LifecycleEvent::Retry {
            scheduled_time: t.now() + Duration::minutes(5),
        };
        assert!(t.engine.lifecycle().apply(id, retry, t.now()).await.is_err());
        assert!(t.engine.lifecycle().mark_sent(id, t.now()).await.is_err());
        assert!(t.engine.run_due_sweep(t.now()).await.unwrap().is_empty());
        assert!(t.engine.run_retry_sweep(t.now()).await.unwrap().is_empty());

        assert_eq!(t.get(id).await.status, NotificationStatus::Cancelled, "{backend:?}");
    }
}

#[tokio::test]
async fn test_exhausted_failure_never_returns_to_pending() {
    for backend in BACKENDS {
        let t = TestEngine::new(backend).await;
        let id = t.schedule(t.draft(1, t.now()).with_max_retries(0)).await;
        t.dispatcher.fail_always("NET_DOWN");

        let report = t.engine.run_due_sweep(t.now()).await.unwrap();
        assert_eq!(report.failed, 1, "{backend:?}");

        let retry = LifecycleEvent::Retry {
            scheduled_time: t.now() + Duration::minutes(5),
        };
        let err = t
            .engine
            .lifecycle()
            .apply(id, retry, t.now())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidTransition);
        assert!(t.engine.run_retry_sweep(t.now()).await.unwrap().is_empty());

        let failed = t.get(id).await;
        assert_eq!(failed.status, NotificationStatus::Failed, "{backend:?}");
        assert!(failed.is_terminal());
    }
}

#[tokio::test]
async fn test_related_entity_must_be_complete() {
    for backend in BACKENDS {
        let t = TestEngine::new(backend).await;
        let mut input = t.draft(1, t.now());
        input.related_entity_type = Some(RelatedEntityType::Goal);

        let err = t.engine.schedule_notification(&input).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation, "{backend:?}");
    }
}

#[tokio::test]
async fn test_unknown_notification_is_not_found() {
    for backend in BACKENDS {
        let t = TestEngine::new(backend).await;
        let err = t
            .engine
            .mark_read(fitpulse_core::types::NotificationId::new(404), t.now())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound, "{backend:?}");
    }
}
