//! Integration tests for delivery statistics and insights.

use chrono::Duration;

use fitpulse_core::types::{NotificationId, UserId};
use fitpulse_service::HealthGrade;

use crate::helpers::{BACKENDS, TestEngine};

#[tokio::test]
async fn test_eight_of_ten_delivered_is_eighty_percent() {
    for backend in BACKENDS {
        let t = TestEngine::new(backend).await;
        let mut due: Vec<NotificationId> = Vec::new();
        for _ in 0..8 {
            due.push(t.schedule_overdue(1).await);
        }
        for _ in 0..2 {
            t.schedule(t.draft(1, t.now() + Duration::days(1))).await;
        }

        let report = t.engine.run_due_sweep(t.now()).await.unwrap();
        assert_eq!(report.sent, 8, "{backend:?}");

        t.clock.advance(Duration::minutes(2));
        let now = t.now();
        t.engine.mark_read(due[0], now).await.unwrap();
        t.engine.mark_read(due[1], now).await.unwrap();
        t.engine.mark_clicked(due[2], now).await.unwrap();
        t.engine.mark_clicked(due[3], now).await.unwrap();
        t.engine.mark_dismissed(due[4], now).await.unwrap();
        t.engine.mark_dismissed(due[5], now).await.unwrap();

        let stats = t.engine.get_stats(None).await.unwrap();
        assert_eq!(stats.total, 10, "{backend:?}");
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.delivered, 8);
        assert_eq!(stats.delivery_success_rate, 80.0, "{backend:?}");
        assert_eq!(stats.click_through_rate, 25.0);
        assert_eq!(stats.dismissal_rate, 25.0);
        assert_eq!(stats.read_rate, 50.0);
        assert_eq!(stats.average_delivery_latency_ms, 3_600_000.0);
        assert_eq!(stats.average_response_time_ms, 120_000.0);
    }
}

#[tokio::test]
async fn test_insights_rank_errors() {
    for backend in BACKENDS {
        let t = TestEngine::new(backend).await;
        let delivered = t.schedule_overdue(1).await;
        t.engine.run_due_sweep(t.now()).await.unwrap();
        t.engine.mark_clicked(delivered, t.now()).await.unwrap();

        for code in ["NET_DOWN", "PERMISSION_DENIED", "NET_DOWN"] {
            t.schedule_overdue(1).await;
            t.dispatcher.fail_always(code);
            t.engine.run_due_sweep(t.now()).await.unwrap();
        }

        let insights = t.engine.get_insights(None).await.unwrap();
        assert_eq!(insights.total_failures, 3, "{backend:?}");
        assert_eq!(insights.most_common_error.as_deref(), Some("NET_DOWN"));
        let codes: Vec<_> = insights
            .error_frequency
            .iter()
            .map(|e| (e.error_code.as_str(), e.count))
            .collect();
        assert_eq!(codes, vec![("NET_DOWN", 2), ("PERMISSION_DENIED", 1)]);
        assert_eq!(insights.stats.delivery_success_rate, 25.0);
        assert!((insights.health_score - 52.0).abs() < 1e-9, "{backend:?}");
        assert_eq!(insights.health_grade, HealthGrade::Fair);

        let engagement = &insights.type_engagement;
        assert_eq!(engagement.len(), 1);
        assert_eq!(engagement[0].total, 4);
        assert_eq!(engagement[0].clicked, 1);
    }
}

#[tokio::test]
async fn test_health_drops_as_failures_grow() {
    for backend in BACKENDS {
        let t = TestEngine::new(backend).await;
        for _ in 0..4 {
            t.schedule_overdue(1).await;
        }
        t.engine.run_due_sweep(t.now()).await.unwrap();
        let healthy = t.engine.get_insights(None).await.unwrap().health_score;
        assert_eq!(healthy, 100.0, "{backend:?}");

        t.schedule_overdue(1).await;
        t.dispatcher.fail_always("NET_DOWN");
        t.engine.run_due_sweep(t.now()).await.unwrap();
        let degraded = t.engine.get_insights(None).await.unwrap().health_score;
        assert!(degraded < healthy, "{backend:?}");
    }
}

#[tokio::test]
async fn test_stats_are_scoped_to_user() {
    for backend in BACKENDS {
        let t = TestEngine::new(backend).await;
        t.schedule_overdue(1).await;
        t.schedule_overdue(2).await;
        t.schedule(t.draft(2, t.now() + Duration::hours(3))).await;
        t.engine.run_due_sweep(t.now()).await.unwrap();

        let one = t.engine.get_stats(Some(UserId::new(1))).await.unwrap();
        assert_eq!(one.total, 1, "{backend:?}");
        assert_eq!(one.delivery_success_rate, 100.0);

        let two = t.engine.get_stats(Some(UserId::new(2))).await.unwrap();
        assert_eq!(two.total, 2, "{backend:?}");
        assert_eq!(two.delivery_success_rate, 50.0);

        let nobody = t.engine.get_stats(Some(UserId::new(3))).await.unwrap();
        assert_eq!(nobody.total, 0);
        assert_eq!(nobody.delivery_success_rate, 0.0);
    }
}
