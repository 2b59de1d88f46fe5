//! Analytics configuration.

use serde::{Deserialize, Serialize};

/// Weights of the health-score components.
///
/// Each component is a ratio in `[0, 1]`; the score is the weighted sum
/// normalized by the total weight and scaled to `[0, 100]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Weight of the delivery success rate.
    #[serde(default = "default_success_weight")]
    pub success_weight: u32,
    /// Weight of the inverted retry rate.
    #[serde(default = "default_retry_weight")]
    pub retry_weight: u32,
    /// Weight of the inverted error-code diversity.
    #[serde(default = "default_error_diversity_weight")]
    pub error_diversity_weight: u32,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            success_weight: default_success_weight(),
            retry_weight: default_retry_weight(),
            error_diversity_weight: default_error_diversity_weight(),
        }
    }
}

impl AnalyticsConfig {
    /// Sum of all weights.
    pub fn total_weight(&self) -> u32 {
        self.success_weight
            .saturating_add(self.retry_weight)
            .saturating_add(self.error_diversity_weight)
    }
}

fn default_success_weight() -> u32 {
    60
}

fn default_retry_weight() -> u32 {
    25
}

fn default_error_diversity_weight() -> u32 {
    15
}
