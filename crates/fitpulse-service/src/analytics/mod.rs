//! Read-side delivery analytics.

pub mod health;
pub mod stats;

use std::sync::Arc;

use fitpulse_core::AppResult;
use fitpulse_core::config::AnalyticsConfig;
use fitpulse_database::{NotificationStore, QueryScope};
use fitpulse_entity::log::LogEvent;

pub use health::{HealthGrade, HealthInputs, health_score};
pub use stats::{
    ErrorFrequency, NotificationDeliveryStats, NotificationInsights, TypeEngagement,
    UNKNOWN_ERROR_CODE,
};

/// Computes delivery statistics and insights from stored history.
///
/// Never on the dispatch path. Each query reads whatever the store returns
/// at that moment; a record mid-transition may be counted in either state.
#[derive(Clone)]
pub struct AnalyticsAggregator {
    /// Notification store.
    store: Arc<dyn NotificationStore>,
    /// Health-score weights.
    weights: AnalyticsConfig,
}

impl std::fmt::Debug for AnalyticsAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsAggregator")
            .field("weights", &self.weights)
            .finish_non_exhaustive()
    }
}

impl AnalyticsAggregator {
    /// Creates a new analytics aggregator.
    pub fn new(store: Arc<dyn NotificationStore>, weights: AnalyticsConfig) -> Self {
        Self { store, weights }
    }

    /// Delivery statistics for `scope`.
    pub async fn get_stats(&self, scope: &QueryScope) -> AppResult<NotificationDeliveryStats> {
        let counts = self.store.count_by_status(scope).await?;
        let records = self.store.find_for_analytics(scope).await?;
        Ok(stats::delivery_stats(&counts, &records))
    }

    /// Statistics plus failure ranking, per-type engagement and health.
    pub async fn get_insights(&self, scope: &QueryScope) -> AppResult<NotificationInsights> {
        let counts = self.store.count_by_status(scope).await?;
        let records = self.store.find_for_analytics(scope).await?;
        let failures = self.store.find_logs(scope, Some(LogEvent::Failed)).await?;

        let stats = stats::delivery_stats(&counts, &records);
        let error_frequency = stats::error_frequency(&failures);
        let health_score = health_score(
            &HealthInputs {
                total: stats.total,
                success_rate: stats.delivery_success_rate,
                retry_rate: stats.retry_rate,
                distinct_errors: error_frequency.len(),
            },
            &self.weights,
        );

        Ok(NotificationInsights {
            most_common_error: error_frequency.first().map(|e| e.error_code.clone()),
            total_failures: failures.len() as u64,
            type_engagement: stats::type_engagement(&records),
            health_grade: HealthGrade::from_score(health_score),
            health_score,
            error_frequency,
            stats,
        })
    }
}
