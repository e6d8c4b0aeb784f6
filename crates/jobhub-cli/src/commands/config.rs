//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use jobhub_core::config::AppConfig;
use jobhub_core::config::queue::BackendKind;
use jobhub_core::error::AppError;

use super::Cli;
use crate::output::{self, OutputFormat};

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
    /// Load and validate the configuration, then summarize it
    Check,
    /// Print the effective configuration as JSON
    Show,
}

/// Execute config commands
pub async fn execute(args: &ConfigArgs, cli: &Cli) -> Result<(), AppError> {
    let source = cli
        .config
        .clone()
        .unwrap_or_else(|| format!("config/default + config/{}", cli.env));

    match &args.command {
        ConfigCommand::Check => match cli.load_config() {
            Ok(config) => match cli.format {
                OutputFormat::Json => output::print_json(&config),
                OutputFormat::Table => {
                    output::print_success(&format!("Configuration '{}' is valid", source));
                    print_summary(&config);
                }
            },
            Err(e) => {
                output::print_error(&format!("Configuration invalid: {}", e));
                return Err(e);
            }
        },
        ConfigCommand::Show => {
            let config = cli.load_config()?;
            output::print_json(&config);
        }
    }

    Ok(())
}

fn print_summary(config: &AppConfig) {
    output::print_kv("Queue", &config.queue.name);
    output::print_kv("Backend", config.queue.backend.as_str());
    if config.queue.backend == BackendKind::Redis {
        output::print_kv("Redis", &config.queue.redis.masked_url());
        output::print_kv("Key prefix", &config.queue.redis.key_prefix);
    }
    output::print_kv("Workers enabled", &config.worker.enabled.to_string());
    output::print_kv("Concurrency", &config.worker.concurrency.to_string());
    output::print_kv("Poll interval", &format!("{}ms", config.worker.poll_interval_ms));
    output::print_kv(
        "Log",
        &format!("{} ({})", config.logging.level, config.logging.format),
    );
}
