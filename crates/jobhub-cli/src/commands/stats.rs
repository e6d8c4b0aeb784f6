//! Queue statistics CLI command.

use serde::Serialize;
use tabled::Tabled;

use jobhub_core::error::AppError;
use jobhub_entity::QueueStats;

use super::Cli;
use crate::output::{self, OutputFormat};

/// Stats display row for table output
#[derive(Debug, Serialize, Tabled)]
struct StatRow {
    /// Counter
    state: &'static str,
    /// Value
    count: u64,
}

fn rows(stats: &QueueStats) -> Vec<StatRow> {
    [
        ("pending", stats.pending),
        ("delayed", stats.delayed),
        ("running", stats.running),
        ("completed", stats.completed),
        ("failed", stats.failed),
        ("recurring", stats.recurring),
    ]
    .into_iter()
    .map(|(state, count)| StatRow { state, count })
    .collect()
}

/// Execute the stats command
pub async fn execute(cli: &Cli) -> Result<(), AppError> {
    let config = cli.load_config()?;
    let dispatcher = super::connect(&config).await?;

    let stats = dispatcher.backend().stats().await;
    dispatcher.shutdown().await?;
    let stats = stats?;

    match cli.format {
        OutputFormat::Json => output::print_json(&stats),
        OutputFormat::Table => {
            println!("Queue '{}' ({} jobs):", stats.queue, stats.total());
            output::print_list(&rows(&stats), cli.format);
        }
    }
    Ok(())
}
