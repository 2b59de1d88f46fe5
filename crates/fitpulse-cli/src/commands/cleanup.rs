//! Retention cleanup command.

use clap::Args;
use serde::Serialize;

use crate::output::{self, OutputFormat};
use fitpulse_core::error::AppError;

/// Arguments for the cleanup command
#[derive(Debug, Args)]
pub struct CleanupArgs {
    /// Keep this many days of history (defaults to retention.keep_days)
    #[arg(short, long)]
    pub days: Option<u32>,
}

#[derive(Debug, Serialize)]
struct CleanupResult {
    keep_days: u32,
    removed: u64,
}

/// Execute the cleanup command
pub async fn execute(
    args: &CleanupArgs,
    config_path: Option<&str>,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let keep_days = args.days.unwrap_or(config.retention.keep_days);
    let engine = super::build_engine(&config).await?;
    let removed = engine.cleanup_older_than(keep_days).await?;

    match format {
        OutputFormat::Json => output::print_json(&CleanupResult { keep_days, removed }),
        OutputFormat::Table => output::print_success(&format!(
            "Removed {removed} notification(s) older than {keep_days} day(s)"
        )),
    }
    Ok(())
}
