//! Cancellation command.

use clap::Args;
use serde::Serialize;

use crate::output::{self, OutputFormat};
use fitpulse_core::error::AppError;
use fitpulse_core::types::UserId;
use fitpulse_entity::notification::RelatedEntityType;

/// Arguments for the cancel command
#[derive(Debug, Args)]
pub struct CancelArgs {
    /// Owning user ID
    #[arg(long)]
    pub user: i64,
    /// Related entity type (goal, workout, habit, food_log, step_goal, achievement, other)
    #[arg(long)]
    pub entity_type: String,
    /// Related entity ID
    #[arg(long)]
    pub entity_id: i64,
}

#[derive(Debug, Serialize)]
struct CancelResult {
    user_id: UserId,
    entity_type: RelatedEntityType,
    entity_id: i64,
    cancelled: u64,
}

/// Execute the cancel command
pub async fn execute(
    args: &CancelArgs,
    config_path: Option<&str>,
    format: OutputFormat,
) -> Result<(), AppError> {
    let entity_type: RelatedEntityType = args.entity_type.parse()?;
    let user_id = UserId::new(args.user);

    let config = super::load_config(config_path)?;
    let engine = super::build_engine(&config).await?;
    let cancelled = engine
        .cancel_for_entity(user_id, entity_type, args.entity_id, engine.now())
        .await?;

    match format {
        OutputFormat::Json => output::print_json(&CancelResult {
            user_id,
            entity_type,
            entity_id: args.entity_id,
            cancelled,
        }),
        OutputFormat::Table if cancelled == 0 => output::print_warning(&format!(
            "No pending notifications linked to {entity_type} #{} for user {user_id}",
            args.entity_id
        )),
        OutputFormat::Table => output::print_success(&format!(
            "Cancelled {cancelled} notification(s) linked to {entity_type} #{}",
            args.entity_id
        )),
    }
    Ok(())
}
