//! Job removal CLI command.

use clap::Args;

use jobhub_core::JobId;
use jobhub_core::error::AppError;
use jobhub_entity::{RemoveCriteria, RemoveQuery};

use super::Cli;
use crate::output::{self, OutputFormat};

/// Arguments for the remove command
#[derive(Debug, Args)]
#[command(group(clap::ArgGroup::new("target").required(true).args(["id", "name", "unique"])))]
pub struct RemoveArgs {
    /// Job or recurring registration id
    pub id: Option<String>,

    /// Remove every job with this name
    #[arg(short, long)]
    pub name: Option<String>,

    /// Remove every job with this unique key
    #[arg(short, long)]
    pub unique: Option<String>,
}

/// Execute the remove command
pub async fn execute(args: &RemoveArgs, cli: &Cli) -> Result<(), AppError> {
    let config = cli.load_config()?;
    let criteria = criteria(args)?;
    let dispatcher = super::connect(&config).await?;

    let response = dispatcher.remove(criteria).await;
    dispatcher.shutdown().await?;
    let response = response?;

    match cli.format {
        OutputFormat::Json => output::print_json(&response),
        OutputFormat::Table if response.removed == 0 => {
            output::print_warning("Nothing matched; no jobs removed");
        }
        OutputFormat::Table => {
            output::print_success(&format!("Removed {} job(s)", response.removed));
        }
    }
    Ok(())
}

fn criteria(args: &RemoveArgs) -> Result<RemoveCriteria, AppError> {
    if let Some(raw) = &args.id {
        let id: JobId = raw
            .parse()
            .map_err(|e| AppError::validation(format!("Invalid job id '{}': {}", raw, e)))?;
        return Ok(id.into());
    }

    Ok(RemoveQuery {
        name: args.name.clone(),
        unique: args.unique.clone(),
    }
    .into())
}
