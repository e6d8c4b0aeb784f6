//! Queue clearing CLI command.

use clap::Args;

use jobhub_core::error::AppError;

use super::Cli;
use crate::output::{self, OutputFormat};

/// Arguments for the clear command
#[derive(Debug, Args)]
pub struct ClearArgs {
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Execute the clear command
pub async fn execute(args: &ClearArgs, cli: &Cli) -> Result<(), AppError> {
    let config = cli.load_config()?;

    if !args.yes {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(format!(
                "Remove ALL jobs and recurring registrations from queue '{}'?",
                config.queue.name
            ))
            .default(false)
            .interact()
            .map_err(|e| AppError::internal(format!("Input error: {}", e)))?;

        if !confirmed {
            output::print_warning("Cancelled");
            return Ok(());
        }
    }

    let dispatcher = super::connect(&config).await?;
    let response = dispatcher.clear().await;
    dispatcher.shutdown().await?;
    let response = response?;

    match cli.format {
        OutputFormat::Json => output::print_json(&response),
        OutputFormat::Table => output::print_success(&format!(
            "Cleared queue '{}' ({} removed)",
            config.queue.name, response.removed
        )),
    }
    Ok(())
}
