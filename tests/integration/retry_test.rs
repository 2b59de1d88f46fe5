//! Integration tests for failed deliveries and the retry sweep.

use chrono::Duration;

use fitpulse_core::config::{AppConfig, BackoffStrategy};
use fitpulse_database::QueryScope;
use fitpulse_entity::log::LogEvent;
use fitpulse_entity::notification::NotificationStatus;
use fitpulse_service::{DispatchError, SweepOutcome};

use crate::helpers::{BACKENDS, TestEngine};

#[tokio::test]
async fn test_failed_dispatch_is_logged_and_requeued() {
    for backend in BACKENDS {
        let t = TestEngine::new(backend).await;
        let id = t.schedule_overdue(1).await;
        t.dispatcher.fail_always("NET_DOWN");
        let now = t.now();

        let report = t.engine.run_due_sweep(now).await.unwrap();
        assert_eq!(
            report.outcome_for(id),
            Some(&SweepOutcome::Failed {
                code: "NET_DOWN".to_string(),
                terminal: false,
            }),
            "{backend:?}"
        );
        assert_eq!(t.get(id).await.status, NotificationStatus::Failed);

        let failures = t
            .store
            .find_logs(&QueryScope::all(), Some(LogEvent::Failed))
            .await
            .unwrap();
        assert_eq!(failures.len(), 1, "{backend:?}");
        assert_eq!(failures[0].notification_id, id);
        assert_eq!(failures[0].error_code.as_deref(), Some("NET_DOWN"));
        assert!(!failures[0].success);

        let retry = t.engine.run_retry_sweep(now).await.unwrap();
        assert_eq!(retry.rescheduled, 1, "{backend:?}");

        let requeued = t.get(id).await;
        assert_eq!(requeued.status, NotificationStatus::Pending, "{backend:?}");
        assert_eq!(requeued.retry_count, 1);
        assert!(requeued.scheduled_time > now);

        let scheduled = t
            .store
            .find_logs(&QueryScope::all(), Some(LogEvent::RetryScheduled))
            .await
            .unwrap();
        assert_eq!(scheduled.len(), 1, "{backend:?}");
    }
}

#[tokio::test]
async fn test_single_retry_budget_ends_in_permanent_failure() {
    for backend in BACKENDS {
        let t = TestEngine::new(backend).await;
        let id = t.schedule(t.draft(1, t.now()).with_max_retries(1)).await;
        t.dispatcher.fail_always("NET_DOWN");

        t.engine.run_due_sweep(t.now()).await.unwrap();
        t.engine.run_retry_sweep(t.now()).await.unwrap();
        let requeued = t.get(id).await;
        assert_eq!(requeued.retry_count, 1, "{backend:?}");

        t.clock.set(requeued.scheduled_time);
        let report = t.engine.run_due_sweep(t.now()).await.unwrap();
        assert_eq!(
            report.outcome_for(id),
            Some(&SweepOutcome::Failed {
                code: "NET_DOWN".to_string(),
                terminal: true,
            }),
            "{backend:?}"
        );

        t.clock.advance(Duration::hours(6));
        let retry = t.engine.run_retry_sweep(t.now()).await.unwrap();
        assert!(retry.is_empty(), "{backend:?}");

        let failed = t.get(id).await;
        assert_eq!(failed.status, NotificationStatus::Failed);
        assert_eq!(failed.retry_count, failed.max_retries);

        let stats = t.engine.get_stats(None).await.unwrap();
        assert_eq!(stats.permanently_failed, 1, "{backend:?}");
    }
}

#[tokio::test]
async fn test_retry_delays_never_shrink() {
    for backend in BACKENDS {
        let mut config = AppConfig::default();
        config.retry.strategy = BackoffStrategy::Exponential;
        config.retry.base_delay_seconds = 30;
        config.retry.max_delay_seconds = 600;
        let t = TestEngine::with_config(backend, config).await;
        let id = t.schedule(t.draft(1, t.now()).with_max_retries(6)).await;
        t.dispatcher.fail_always("PERMISSION_DENIED");

        let mut delays = Vec::new();
        loop {
            t.engine.run_due_sweep(t.now()).await.unwrap();
            let retry = t.engine.run_retry_sweep(t.now()).await.unwrap();
            if retry.is_empty() {
                break;
            }
            let requeued = t.get(id).await;
            assert!(requeued.retry_count <= requeued.max_retries);
            delays.push(requeued.scheduled_time - t.now());
            t.clock.set(requeued.scheduled_time);
        }

        assert_eq!(delays.len(), 6, "{backend:?}");
        assert!(delays.windows(2).all(|w| w[0] <= w[1]), "{backend:?}: {delays:?}");
        assert_eq!(delays[0], Duration::seconds(30));
        assert_eq!(delays[5], Duration::seconds(600));
    }
}

#[tokio::test]
async fn test_retry_can_succeed() {
    for backend in BACKENDS {
        let t = TestEngine::new(backend).await;
        let id = t.schedule_overdue(1).await;
        t.dispatcher
            .push(Err(DispatchError::platform_unavailable("channel closed")));

        t.engine.run_due_sweep(t.now()).await.unwrap();
        t.engine.run_retry_sweep(t.now()).await.unwrap();
        let scheduled = t.get(id).await.scheduled_time;

        t.clock.set(scheduled);
        let report = t.engine.run_due_sweep(t.now()).await.unwrap();
        assert_eq!(report.sent, 1, "{backend:?}");

        let sent = t.get(id).await;
        assert_eq!(sent.status, NotificationStatus::Sent);
        assert_eq!(sent.retry_count, 1);
        assert_eq!(t.dispatcher.calls(), vec![id, id]);
    }
}

#[tokio::test]
async fn test_failure_recorded_later_waits_for_next_sweep() {
    for backend in BACKENDS {
        let t = TestEngine::new(backend).await;
        t.schedule_overdue(1).await;
        t.dispatcher.fail_always("NET_DOWN");
        let earlier = t.now() - Duration::seconds(1);

        t.engine.run_due_sweep(t.now()).await.unwrap();
        let retry = t.engine.run_retry_sweep(earlier).await.unwrap();
        assert!(retry.is_empty(), "{backend:?}");

        t.dispatcher.recover();
        let retry = t.engine.run_retry_sweep(t.now()).await.unwrap();
        assert_eq!(retry.rescheduled, 1, "{backend:?}");
    }
}
