//! Delivery statistics and insight records, and the pure computations
//! behind them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use fitpulse_entity::log::NotificationLog;
use fitpulse_entity::notification::{Notification, NotificationStatus, NotificationType};

use super::health::HealthGrade;

/// Code recorded for failures that carried none.
pub const UNKNOWN_ERROR_CODE: &str = "UNKNOWN";

/// Delivery and engagement statistics over a set of notifications.
///
/// Rates are percentages in `[0, 100]`; empty inputs give zeros.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationDeliveryStats {
    /// Notifications considered.
    pub total: u64,
    /// Still waiting for dispatch.
    pub pending: u64,
    /// Delivered and not yet acted on.
    pub sent: u64,
    /// Opened by the user.
    pub read: u64,
    /// Tapped by the user.
    pub clicked: u64,
    /// Dismissed by the user.
    pub dismissed: u64,
    /// Rejected by the platform.
    pub failed: u64,
    /// Withdrawn before delivery.
    pub cancelled: u64,
    /// Sent, read, clicked or dismissed.
    pub delivered: u64,
    /// `delivered / total`.
    pub delivery_success_rate: f64,
    /// `clicked / delivered`.
    pub click_through_rate: f64,
    /// `dismissed / delivered`.
    pub dismissal_rate: f64,
    /// `(read + clicked) / delivered`.
    pub read_rate: f64,
    /// Mean time from scheduled to sent.
    pub average_delivery_latency_ms: f64,
    /// Mean time from sent to clicked.
    pub average_response_time_ms: f64,
    /// Share of notifications that needed at least one retry.
    pub retry_rate: f64,
    /// Failed with the retry budget spent.
    pub permanently_failed: u64,
}

/// How often one failure code occurred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorFrequency {
    /// Failure code.
    pub error_code: String,
    /// Number of failed dispatches with this code.
    pub count: u64,
    /// Share of all failures, percent.
    pub percentage: f64,
}

/// Engagement for one notification type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeEngagement {
    /// Notification type.
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    /// Notifications of this type.
    pub total: u64,
    /// Of which delivered.
    pub delivered: u64,
    /// Of which clicked.
    pub clicked: u64,
    /// `clicked / delivered`, percent.
    pub click_through_rate: f64,
}

/// Statistics plus failure analysis and the health score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationInsights {
    /// Underlying delivery statistics.
    pub stats: NotificationDeliveryStats,
    /// Number of failed dispatch attempts recorded in the log.
    pub total_failures: u64,
    /// Failure codes, most frequent first.
    pub error_frequency: Vec<ErrorFrequency>,
    /// The top entry of `error_frequency`.
    pub most_common_error: Option<String>,
    /// Per-type engagement, for types that occur.
    pub type_engagement: Vec<TypeEngagement>,
    /// Composite score in `[0, 100]`.
    pub health_score: f64,
    /// Band of `health_score`.
    pub health_grade: HealthGrade,
}

/// `numerator / denominator` as a percentage, 0 when the denominator is 0.
pub fn percentage(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 * 100.0 / denominator as f64
}

fn mean(values: impl Iterator<Item = i64>) -> f64 {
    let (sum, count) = values.fold((0i128, 0u64), |(sum, count), v| {
        (sum + i128::from(v), count + 1)
    });
    if count == 0 {
        return 0.0;
    }
    sum as f64 / count as f64
}

/// Compute statistics from per-status counts and the matching records.
///
/// Counts come from the store's aggregate query; `records` supply the
/// timestamps and retry bookkeeping.
pub fn delivery_stats(
    counts: &[(NotificationStatus, u64)],
    records: &[Notification],
) -> NotificationDeliveryStats {
    let count = |status: NotificationStatus| {
        counts
            .iter()
            .filter(|(s, _)| *s == status)
            .map(|(_, n)| *n)
            .sum::<u64>()
    };

    let pending = count(NotificationStatus::Pending);
    let sent = count(NotificationStatus::Sent);
    let read = count(NotificationStatus::Read);
    let clicked = count(NotificationStatus::Clicked);
    let dismissed = count(NotificationStatus::Dismissed);
    let failed = count(NotificationStatus::Failed);
    let cancelled = count(NotificationStatus::Cancelled);

    let total = counts.iter().map(|(_, n)| *n).sum::<u64>();
    let delivered = sent + read + clicked + dismissed;

    let average_delivery_latency_ms = mean(
        records
            .iter()
            .filter(|n| n.status.is_delivered())
            .filter_map(|n| n.sent_time.map(|sent| (sent - n.scheduled_time).num_milliseconds())),
    );
    let average_response_time_ms = mean(records.iter().filter_map(|n| {
        match (n.status, n.sent_time, n.clicked_time) {
            (NotificationStatus::Clicked, Some(sent), Some(clicked)) => {
                Some((clicked - sent).num_milliseconds())
            }
            _ => None,
        }
    }));

    let retried = records.iter().filter(|n| n.retry_count > 0).count() as u64;
    let permanently_failed = records
        .iter()
        .filter(|n| n.status == NotificationStatus::Failed && n.retry_count >= n.max_retries)
        .count() as u64;

    NotificationDeliveryStats {
        total,
        pending,
        sent,
        read,
        clicked,
        dismissed,
        failed,
        cancelled,
        delivered,
        delivery_success_rate: percentage(delivered, total),
        click_through_rate: percentage(clicked, delivered),
        dismissal_rate: percentage(dismissed, delivered),
        read_rate: percentage(read + clicked, delivered),
        average_delivery_latency_ms,
        average_response_time_ms,
        retry_rate: percentage(retried, records.len() as u64),
        permanently_failed,
    }
}

/// Group failed-dispatch log entries by code, most frequent first, ties
/// broken by code.
pub fn error_frequency(failures: &[NotificationLog]) -> Vec<ErrorFrequency> {
    let mut by_code: HashMap<&str, u64> = HashMap::new();
    for log in failures {
        let code = log.error_code.as_deref().unwrap_or(UNKNOWN_ERROR_CODE);
        *by_code.entry(code).or_default() += 1;
    }

    let total = failures.len() as u64;
    let mut ranked: Vec<ErrorFrequency> = by_code
        .into_iter()
        .map(|(code, count)| ErrorFrequency {
            error_code: code.to_string(),
            count,
            percentage: percentage(count, total),
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.error_code.cmp(&b.error_code))
    });
    ranked
}

/// Per-type engagement, in declaration order of the types.
pub fn type_engagement(records: &[Notification]) -> Vec<TypeEngagement> {
    NotificationType::ALL
        .into_iter()
        .filter_map(|notification_type| {
            let of_type = records
                .iter()
                .filter(|n| n.notification_type == notification_type);
            let (total, delivered, clicked) =
                of_type.fold((0u64, 0u64, 0u64), |(total, delivered, clicked), n| {
                    (
                        total + 1,
                        delivered + u64::from(n.status.is_delivered()),
                        clicked + u64::from(n.status == NotificationStatus::Clicked),
                    )
                });
            (total > 0).then(|| TypeEngagement {
                notification_type,
                total,
                delivered,
                clicked,
                click_through_rate: percentage(clicked, delivered),
            })
        })
        .collect()
}
