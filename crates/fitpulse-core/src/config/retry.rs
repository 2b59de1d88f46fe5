//! Retry policy configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Shape of the delay curve applied between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    /// The same delay before every attempt.
    Fixed,
    /// Delay grows by `base` per attempt.
    Linear,
    /// Delay doubles per attempt.
    Exponential,
}

impl BackoffStrategy {
    /// Return the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Linear => "linear",
            Self::Exponential => "exponential",
        }
    }
}

impl fmt::Display for BackoffStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackoffStrategy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(Self::Fixed),
            "linear" => Ok(Self::Linear),
            "exponential" => Ok(Self::Exponential),
            _ => Err(AppError::validation(format!(
                "Invalid backoff strategy: '{s}'"
            ))),
        }
    }
}

/// Retry policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Backoff curve.
    #[serde(default = "default_strategy")]
    pub strategy: BackoffStrategy,
    /// Delay in seconds before the first retry.
    #[serde(default = "default_base_delay")]
    pub base_delay_seconds: u64,
    /// Ceiling in seconds for any single retry delay.
    #[serde(default = "default_max_delay")]
    pub max_delay_seconds: u64,
    /// Retry budget given to notifications that do not specify one.
    #[serde(default = "default_max_retries")]
    pub default_max_retries: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            base_delay_seconds: default_base_delay(),
            max_delay_seconds: default_max_delay(),
            default_max_retries: default_max_retries(),
        }
    }
}

fn default_strategy() -> BackoffStrategy {
    BackoffStrategy::Exponential
}

fn default_base_delay() -> u64 {
    60
}

fn default_max_delay() -> u64 {
    3600
}

fn default_max_retries() -> u32 {
    3
}
