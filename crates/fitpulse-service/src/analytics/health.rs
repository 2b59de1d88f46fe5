//! Delivery health score.

use std::fmt;

use serde::{Deserialize, Serialize};

use fitpulse_core::config::AnalyticsConfig;

/// Distinct error codes at which the diversity penalty is fully applied.
const ERROR_DIVERSITY_CAP: usize = 10;

/// Band a health score falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthGrade {
    /// Below 50.
    Poor,
    /// 50 to 75.
    Fair,
    /// 75 to 90.
    Good,
    /// 90 and above.
    Excellent,
}

impl HealthGrade {
    /// Grade for a score in `[0, 100]`.
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Self::Excellent
        } else if score >= 75.0 {
            Self::Good
        } else if score >= 50.0 {
            Self::Fair
        } else {
            Self::Poor
        }
    }

    /// Return the grade as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Poor => "poor",
            Self::Fair => "fair",
            Self::Good => "good",
            Self::Excellent => "excellent",
        }
    }
}

impl fmt::Display for HealthGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs to the health score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthInputs {
    /// Number of notifications considered.
    pub total: u64,
    /// Delivery success rate, percent.
    pub success_rate: f64,
    /// Share of notifications that needed a retry, percent.
    pub retry_rate: f64,
    /// Number of distinct failure codes.
    pub distinct_errors: usize,
}

/// Weighted score in `[0, 100]`.
///
/// Non-decreasing in `success_rate` and non-increasing in `retry_rate`
/// and `distinct_errors`. With nothing to measure the score is 100.
pub fn health_score(inputs: &HealthInputs, weights: &AnalyticsConfig) -> f64 {
    let total_weight = f64::from(weights.total_weight());
    if inputs.total == 0 || total_weight == 0.0 {
        return 100.0;
    }

    let success = fraction(inputs.success_rate);
    let retry = fraction(inputs.retry_rate);
    let diversity =
        inputs.distinct_errors.min(ERROR_DIVERSITY_CAP) as f64 / ERROR_DIVERSITY_CAP as f64;

    let weighted = f64::from(weights.success_weight) * success
        + f64::from(weights.retry_weight) * (1.0 - retry)
        + f64::from(weights.error_diversity_weight) * (1.0 - diversity);

    (100.0 * weighted / total_weight).clamp(0.0, 100.0)
}

fn fraction(percent: f64) -> f64 {
    if percent.is_finite() {
        (percent / 100.0).clamp(0.0, 1.0)
    } else {
        0.0
    }
}
