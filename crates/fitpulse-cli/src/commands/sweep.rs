//! Manual sweep commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use fitpulse_core::error::AppError;
use fitpulse_service::{SweepOutcome, SweepReport};

/// Arguments for the sweep command
#[derive(Debug, Args)]
pub struct SweepArgs {
    /// Which sweep to run
    #[command(subcommand)]
    pub kind: SweepCommand,
}

/// Sweep subcommands
#[derive(Debug, Subcommand)]
pub enum SweepCommand {
    /// Dispatch every due notification
    Due,
    /// Re-queue failed notifications with retry budget left
    Retry,
}

/// Per-notification display row
#[derive(Debug, Serialize, Tabled)]
struct OutcomeRow {
    /// Notification ID
    id: i64,
    /// Outcome
    outcome: String,
    /// Detail
    detail: String,
}

impl OutcomeRow {
    fn from_outcome(id: i64, outcome: &SweepOutcome) -> Self {
        let (name, detail) = match outcome {
            SweepOutcome::Sent => ("sent", String::new()),
            SweepOutcome::Failed { code, terminal } => (
                "failed",
                if *terminal {
                    format!("{code} (retries exhausted)")
                } else {
                    code.clone()
                },
            ),
            SweepOutcome::Skipped { reason } => ("skipped", reason.clone()),
            SweepOutcome::Rescheduled {
                retry_count,
                scheduled_time,
            } => (
                "rescheduled",
                format!(
                    "attempt {retry_count} at {}",
                    output::timestamp(*scheduled_time)
                ),
            ),
        };
        Self {
            id,
            outcome: name.to_string(),
            detail,
        }
    }
}

/// Execute sweep commands
pub async fn execute(
    args: &SweepArgs,
    config_path: Option<&str>,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let engine = super::build_engine(&config).await?;
    let now = engine.now();

    let report = match args.kind {
        SweepCommand::Due => engine.run_due_sweep(now).await?,
        SweepCommand::Retry => engine.run_retry_sweep(now).await?,
    };

    print_report(&report, format);
    Ok(())
}

fn print_report(report: &SweepReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => output::print_json(report),
        OutputFormat::Table => {
            let rows: Vec<OutcomeRow> = report
                .outcomes
                .iter()
                .map(|o| OutcomeRow::from_outcome(o.notification_id.get(), &o.outcome))
                .collect();
            output::print_list(&rows, format);
            output::print_success(&format!(
                "{} sweep: examined {}, sent {}, failed {}, rescheduled {}, skipped {}",
                report.kind,
                report.examined,
                report.sent,
                report.failed,
                report.rescheduled,
                report.skipped
            ));
        }
    }
}
