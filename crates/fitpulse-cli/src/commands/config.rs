//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use crate::output::{self, OutputFormat};
use fitpulse_core::error::AppError;

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Validate the configuration
    Validate,
}

/// Execute config commands
pub async fn execute(
    args: &ConfigArgs,
    config_path: Option<&str>,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => {
            let config = super::load_config(config_path)?;
            match format {
                OutputFormat::Json => output::print_json(&config),
                OutputFormat::Table => println!("{config:#?}"),
            }
        }
        ConfigCommand::Validate => {
            let config = super::load_config(config_path)?;
            output::print_success(&format!(
                "Configuration '{}' is valid",
                config_path.unwrap_or("config/default.toml")
            ));
            output::print_kv("Database", &config.database.url);
            output::print_kv(
                "Due sweep",
                &format!("every {}s", config.scheduler.due_sweep_interval_seconds),
            );
            output::print_kv(
                "Retry sweep",
                &format!("every {}s", config.scheduler.retry_sweep_interval_seconds),
            );
            output::print_kv(
                "Backoff",
                &format!(
                    "{} ({}s..{}s)",
                    config.retry.strategy,
                    config.retry.base_delay_seconds,
                    config.retry.max_delay_seconds
                ),
            );
            let retention = if config.retention.enabled {
                format!(
                    "{} days, cron '{}'",
                    config.retention.keep_days, config.retention.cleanup_cron
                )
            } else {
                "disabled".to_string()
            };
            output::print_kv("Retention", &retention);
        }
    }

    Ok(())
}
