//! Sweep scheduling configuration.

use serde::{Deserialize, Serialize};

/// Controls how often sweeps run and how much work each one may take on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Interval in seconds between due-notification sweeps.
    #[serde(default = "default_due_interval")]
    pub due_sweep_interval_seconds: u64,
    /// Interval in seconds between retry sweeps.
    #[serde(default = "default_retry_interval")]
    pub retry_sweep_interval_seconds: u64,
    /// Maximum number of rows fetched by a single sweep.
    #[serde(default = "default_batch_limit")]
    pub batch_limit: u32,
    /// Lifetime in seconds of the dispatch reservation taken before a
    /// notification is handed to the dispatcher.
    #[serde(default = "default_lease")]
    pub dispatch_lease_seconds: u64,
    /// Upper bound in seconds on a single dispatcher hand-off.
    #[serde(default = "default_dispatch_timeout")]
    pub dispatch_timeout_seconds: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            due_sweep_interval_seconds: default_due_interval(),
            retry_sweep_interval_seconds: default_retry_interval(),
            batch_limit: default_batch_limit(),
            dispatch_lease_seconds: default_lease(),
            dispatch_timeout_seconds: default_dispatch_timeout(),
        }
    }
}

fn default_due_interval() -> u64 {
    60
}

fn default_retry_interval() -> u64 {
    300
}

fn default_batch_limit() -> u32 {
    500
}

fn default_lease() -> u64 {
    120
}

fn default_dispatch_timeout() -> u64 {
    30
}
