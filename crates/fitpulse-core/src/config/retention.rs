//! Retention (bulk cleanup) configuration.

use serde::{Deserialize, Serialize};

/// Controls the periodic purge of old, settled notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Whether the maintenance job is registered at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Six-field cron expression (with seconds) for the cleanup job.
    #[serde(default = "default_cleanup_cron")]
    pub cleanup_cron: String,
    /// Notifications created more than this many days ago are purged.
    #[serde(default = "default_keep_days")]
    pub keep_days: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            cleanup_cron: default_cleanup_cron(),
            keep_days: default_keep_days(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cleanup_cron() -> String {
    "0 0 3 * * *".to_string()
}

fn default_keep_days() -> u32 {
    90
}
