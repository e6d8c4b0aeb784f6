//! CLI command definitions and dispatch.

pub mod clear;
pub mod config;
pub mod dispatch;
pub mod remove;
pub mod stats;

use clap::{Parser, Subcommand};

use jobhub_core::config::AppConfig;
use jobhub_core::config::queue::BackendKind;
use jobhub_core::error::AppError;
use jobhub_dispatch::{Dispatcher, HandlerRegistry};
use jobhub_queue::connect_backend;

use crate::output::{self, OutputFormat};

/// JobHub: job dispatch and queue administration
#[derive(Debug, Parser)]
#[command(name = "jobhub", version, about, long_about = None)]
pub struct Cli {
    /// Path to a configuration file (defaults to config/default.toml plus config/{env}.toml)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Configuration environment, used when no explicit file is given
    #[arg(short, long, env = "JOBHUB_ENV", default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Submit a job to the configured queue
    Dispatch(dispatch::DispatchArgs),
    /// Remove a job or recurring registration
    Remove(remove::RemoveArgs),
    /// Remove every job in the configured queue
    Clear(clear::ClearArgs),
    /// Show queue statistics
    Stats,
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Dispatch(args) => dispatch::execute(args, self).await,
            Commands::Remove(args) => remove::execute(args, self).await,
            Commands::Clear(args) => clear::execute(args, self).await,
            Commands::Stats => stats::execute(self).await,
            Commands::Config(args) => config::execute(args, self).await,
        }
    }

    /// Load configuration from the explicit path or the environment layers
    pub fn load_config(&self) -> Result<AppConfig, AppError> {
        match &self.config {
            Some(path) => AppConfig::load_from(path),
            None => AppConfig::load(&self.env),
        }
    }
}

/// Helper: connect to the configured backend and wrap it in a dispatcher
/// with no handlers. The CLI never consumes jobs.
pub async fn connect(config: &AppConfig) -> Result<Dispatcher, AppError> {
    if config.queue.backend == BackendKind::Memory {
        output::print_warning(
            "queue.backend is \"memory\": changes made by this command vanish when it exits",
        );
    }

    let backend = connect_backend(&config.queue, &config.worker).await?;
    Ok(Dispatcher::new(backend, HandlerRegistry::new()))
}
