//! Aggregate results of a due or retry sweep.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use fitpulse_core::types::NotificationId;

/// Which pass produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepKind {
    /// Dispatch of due notifications.
    Due,
    /// Re-queueing of failed notifications.
    Retry,
}

impl SweepKind {
    /// Return the kind as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Due => "due",
            Self::Retry => "retry",
        }
    }
}

impl fmt::Display for SweepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one notification during a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SweepOutcome {
    /// Handed to the platform.
    Sent,
    /// The platform rejected it; `terminal` when no retry budget remains.
    Failed {
        /// Dispatch error code.
        code: String,
        /// Whether the retry budget is spent.
        terminal: bool,
    },
    /// Left alone, usually because another writer got there first.
    Skipped {
        /// Why the record was skipped.
        reason: String,
    },
    /// Moved back to pending for another attempt.
    Rescheduled {
        /// Retry counter after the move.
        retry_count: u32,
        /// When the next attempt is due.
        scheduled_time: DateTime<Utc>,
    },
}

/// Outcome for one notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationOutcome {
    /// The notification examined.
    pub notification_id: NotificationId,
    /// What happened to it.
    #[serde(flatten)]
    pub outcome: SweepOutcome,
}

/// Summary of one sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Which pass ran.
    pub kind: SweepKind,
    /// Records selected by the sweep query.
    pub examined: usize,
    /// Records handed to the platform.
    pub sent: usize,
    /// Records whose dispatch failed.
    pub failed: usize,
    /// Records skipped.
    pub skipped: usize,
    /// Records moved back to pending.
    pub rescheduled: usize,
    /// Per-record detail, in processing order.
    pub outcomes: Vec<NotificationOutcome>,
}

impl SweepReport {
    /// Start an empty report.
    pub fn new(kind: SweepKind) -> Self {
        Self {
            kind,
            examined: 0,
            sent: 0,
            failed: 0,
            skipped: 0,
            rescheduled: 0,
            outcomes: Vec::new(),
        }
    }

    /// Count and store one outcome.
    pub fn record(&mut self, notification_id: NotificationId, outcome: SweepOutcome) {
        match &outcome {
            SweepOutcome::Sent => self.sent += 1,
            SweepOutcome::Failed { .. } => self.failed += 1,
            SweepOutcome::Skipped { .. } => self.skipped += 1,
            SweepOutcome::Rescheduled { .. } => self.rescheduled += 1,
        }
        self.outcomes.push(NotificationOutcome {
            notification_id,
            outcome,
        });
    }

    /// Outcome recorded for `id`, if it was examined.
    pub fn outcome_for(&self, id: NotificationId) -> Option<&SweepOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.notification_id == id)
            .map(|o| &o.outcome)
    }

    /// Whether the sweep found nothing to do.
    pub fn is_empty(&self) -> bool {
        self.examined == 0
    }
}
