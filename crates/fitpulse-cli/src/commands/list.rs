//! Notification listing command.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use fitpulse_core::error::AppError;
use fitpulse_core::types::UserId;
use fitpulse_entity::notification::{Notification, NotificationStatus};

/// Arguments for the list command
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Owning user ID
    #[arg(long)]
    pub user: i64,
    /// Filter by status (pending, sent, read, dismissed, clicked, failed, cancelled)
    #[arg(long)]
    pub status: Option<String>,
    /// Maximum number of results
    #[arg(short, long, default_value = "50")]
    pub limit: u32,
}

/// Notification display row
#[derive(Debug, Serialize, Tabled)]
struct NotificationRow {
    /// ID
    id: i64,
    /// Type
    #[tabled(rename = "type")]
    notification_type: String,
    /// Title
    title: String,
    /// Status
    status: String,
    /// Priority
    priority: String,
    /// Scheduled
    scheduled: String,
    /// Sent
    sent: String,
    /// Retries
    retries: String,
}

impl From<&Notification> for NotificationRow {
    fn from(n: &Notification) -> Self {
        Self {
            id: n.id.get(),
            notification_type: n.notification_type.to_string(),
            title: n.title.clone(),
            status: n.status.to_string(),
            priority: n.priority.to_string(),
            scheduled: output::timestamp(n.scheduled_time),
            sent: output::opt_timestamp(n.sent_time),
            retries: format!("{}/{}", n.retry_count, n.max_retries),
        }
    }
}

/// Execute the list command
pub async fn execute(
    args: &ListArgs,
    config_path: Option<&str>,
    format: OutputFormat,
) -> Result<(), AppError> {
    let status = args
        .status
        .as_deref()
        .map(str::parse::<NotificationStatus>)
        .transpose()?;

    let config = super::load_config(config_path)?;
    let engine = super::build_engine(&config).await?;
    let notifications = engine
        .list_for_user(UserId::new(args.user), status, args.limit)
        .await?;

    match format {
        OutputFormat::Json => output::print_json(&notifications),
        OutputFormat::Table => {
            let rows: Vec<NotificationRow> = notifications.iter().map(Into::into).collect();
            output::print_list(&rows, format);
        }
    }
    Ok(())
}
