//! Delivery statistics and insights commands.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use fitpulse_core::error::AppError;
use fitpulse_core::types::UserId;
use fitpulse_service::NotificationDeliveryStats;

/// Scope selection shared by `stats` and `insights`
#[derive(Debug, Args)]
pub struct ScopeArgs {
    /// Restrict to one user; omit for every user
    #[arg(long)]
    pub user: Option<i64>,
}

/// Error frequency display row
#[derive(Debug, Serialize, Tabled)]
struct ErrorRow {
    /// Error code
    code: String,
    /// Occurrences
    count: u64,
    /// Share of failures
    share: String,
}

/// Per-type engagement display row
#[derive(Debug, Serialize, Tabled)]
struct TypeRow {
    /// Notification type
    #[tabled(rename = "type")]
    notification_type: String,
    /// Total
    total: u64,
    /// Delivered
    delivered: u64,
    /// Clicked
    clicked: u64,
    /// Click-through rate
    ctr: String,
}

/// Execute the stats command
pub async fn stats(
    args: &ScopeArgs,
    config_path: Option<&str>,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let engine = super::build_engine(&config).await?;
    let stats = engine.get_stats(args.user.map(UserId::new)).await?;

    match format {
        OutputFormat::Json => output::print_json(&stats),
        OutputFormat::Table => print_stats(&stats),
    }
    Ok(())
}

/// Execute the insights command
pub async fn insights(
    args: &ScopeArgs,
    config_path: Option<&str>,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let engine = super::build_engine(&config).await?;
    let insights = engine.get_insights(args.user.map(UserId::new)).await?;

    if format == OutputFormat::Json {
        output::print_json(&insights);
        return Ok(());
    }

    print_stats(&insights.stats);
    println!();
    output::print_kv(
        "Health score",
        &format!("{:.1} ({})", insights.health_score, insights.health_grade),
    );
    output::print_kv("Failed attempts", &insights.total_failures.to_string());
    output::print_kv(
        "Most common error",
        insights.most_common_error.as_deref().unwrap_or("-"),
    );

    println!();
    output::print_heading("Error frequency");
    let errors: Vec<ErrorRow> = insights
        .error_frequency
        .iter()
        .map(|e| ErrorRow {
            code: e.error_code.clone(),
            count: e.count,
            share: output::percent(e.percentage),
        })
        .collect();
    output::print_list(&errors, format);

    println!();
    output::print_heading("Engagement by type");
    let types: Vec<TypeRow> = insights
        .type_engagement
        .iter()
        .map(|t| TypeRow {
            notification_type: t.notification_type.to_string(),
            total: t.total,
            delivered: t.delivered,
            clicked: t.clicked,
            ctr: output::percent(t.click_through_rate),
        })
        .collect();
    output::print_list(&types, format);
    Ok(())
}

fn print_stats(stats: &NotificationDeliveryStats) {
    output::print_heading("Delivery statistics");
    output::print_kv("Total", &stats.total.to_string());
    output::print_kv("Pending", &stats.pending.to_string());
    output::print_kv("Delivered", &stats.delivered.to_string());
    output::print_kv("  sent", &stats.sent.to_string());
    output::print_kv("  read", &stats.read.to_string());
    output::print_kv("  clicked", &stats.clicked.to_string());
    output::print_kv("  dismissed", &stats.dismissed.to_string());
    output::print_kv("Failed", &stats.failed.to_string());
    output::print_kv("  permanently", &stats.permanently_failed.to_string());
    output::print_kv("Cancelled", &stats.cancelled.to_string());
    output::print_kv(
        "Delivery success rate",
        &output::percent(stats.delivery_success_rate),
    );
    output::print_kv("Click-through rate", &output::percent(stats.click_through_rate));
    output::print_kv("Dismissal rate", &output::percent(stats.dismissal_rate));
    output::print_kv("Read rate", &output::percent(stats.read_rate));
    output::print_kv("Retry rate", &output::percent(stats.retry_rate));
    output::print_kv(
        "Avg delivery latency",
        &format!("{:.0} ms", stats.average_delivery_latency_ms),
    );
    output::print_kv(
        "Avg response time",
        &format!("{:.0} ms", stats.average_response_time_ms),
    );
}
