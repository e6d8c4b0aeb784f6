//! Job submission CLI command.

use clap::Args;
use serde_json::Value;

use jobhub_core::error::AppError;
use jobhub_dispatch::{DispatchResult, Dispatcher, GenericJob, SchedulingIntent};
use jobhub_entity::{JobOptions, JobPriority};

use super::Cli;
use crate::output::{self, OutputFormat};

/// Arguments for the dispatch command
#[derive(Debug, Args)]
pub struct DispatchArgs {
    /// Job name (must match a handler registered by a listening server)
    pub name: String,

    /// JSON payload
    #[arg(short, long)]
    pub payload: Option<String>,

    /// Scheduling intent: "now", "every 5 minutes", a cron expression,
    /// a timestamp, or a delay such as "in 10 minutes"
    #[arg(short, long)]
    pub when: Option<String>,

    /// Priority: low, normal, medium, high, critical
    #[arg(long)]
    pub priority: Option<JobPriority>,

    /// Maximum number of attempts
    #[arg(long)]
    pub attempts: Option<u32>,

    /// Unique key; a recurring registration replaces any earlier one with the same key
    #[arg(long)]
    pub unique: Option<String>,
}

/// Execute the dispatch command
pub async fn execute(args: &DispatchArgs, cli: &Cli) -> Result<(), AppError> {
    let config = cli.load_config()?;
    let job = build_job(args)?;
    let dispatcher = super::connect(&config).await?;

    let result = match &args.when {
        Some(when) => dispatcher.dispatch_with(&job, when)?,
        None => dispatcher.dispatch(&job)?,
    };
    dispatcher.flush().await;

    let accepted = was_accepted(&dispatcher, &result).await?;
    dispatcher.shutdown().await?;

    if !accepted {
        return Err(AppError::validation(format!(
            "Job '{}' was not accepted by the backend (intent: {})",
            args.name, result.intent
        )));
    }

    match cli.format {
        OutputFormat::Json => output::print_json(&result),
        OutputFormat::Table => {
            output::print_success(&format!("Job '{}' dispatched", args.name));
            output::print_kv("ID", &result.id.to_string());
            output::print_kv("Queue", &result.job.queue);
            output::print_kv("Intent", &result.intent.to_string());
        }
    }
    Ok(())
}

/// Whether the backend stored the submission. Rejections are only logged by
/// the dispatcher, so look the job or registration up after a flush.
async fn was_accepted(dispatcher: &Dispatcher, result: &DispatchResult) -> Result<bool, AppError> {
    let backend = dispatcher.backend();
    let found = match result.intent {
        SchedulingIntent::Recurring { .. } => backend.recurring(result.id).await?.is_some(),
        _ => backend.get(result.id).await?.is_some(),
    };
    Ok(found)
}

/// Build the application job described by the command-line arguments.
fn build_job(args: &DispatchArgs) -> Result<GenericJob, AppError> {
    let payload = match &args.payload {
        Some(raw) => serde_json::from_str::<Value>(raw)
            .map_err(|e| AppError::validation(format!("Invalid JSON payload: {}", e)))?,
        None => Value::Null,
    };

    let mut options = JobOptions::default();
    if let Some(priority) = args.priority {
        options = options.with_priority(priority);
    }
    if let Some(attempts) = args.attempts {
        options = options.with_attempts(attempts);
    }
    if let Some(unique) = &args.unique {
        options = options.with_unique(unique.clone());
    }

    Ok(GenericJob::new(args.name.clone())
        .with_payload(payload)
        .with_options(options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Commands;
    use clap::Parser;
    use jobhub_core::config::AppConfig;
    use jobhub_core::error::ErrorKind;
    use jobhub_dispatch::AppJob;
    use serde_json::json;

    fn parse(args: &[&str]) -> DispatchArgs {
        let cli = Cli::try_parse_from(args.iter().copied()).unwrap();
        match cli.command {
            Commands::Dispatch(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_build_job_from_flags() {
        let args = parse(&[
            "jobhub",
            "dispatch",
            "send-email",
            "--payload",
            r#"{"to":"a@b.c"}"#,
            "--priority",
            "high",
            "--attempts",
            "3",
            "--when",
            "in 10 minutes",
        ]);
        assert_eq!(args.when.as_deref(), Some("in 10 minutes"));

        let job = build_job(&args).unwrap();
        assert_eq!(job.name(), "send-email");
        assert_eq!(job.payload().unwrap(), json!({"to": "a@b.c"}));
        let options = job.options();
        assert_eq!(options.priority, JobPriority::High);
        assert_eq!(options.attempts, 3);
    }

    #[test]
    fn test_payload_defaults_to_null() {
        let job = build_job(&parse(&["jobhub", "dispatch", "cleanup"])).unwrap();
        assert_eq!(job.payload().unwrap(), Value::Null);
        assert_eq!(job.options(), JobOptions::default());
    }

    #[test]
    fn test_invalid_payload_rejected() {
        let args = parse(&["jobhub", "dispatch", "cleanup", "--payload", "{nope"]);
        let err = build_job(&args).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_rejected_submissions_are_detected() {
        let dispatcher = crate::commands::connect(&AppConfig::default()).await.unwrap();
        let job = GenericJob::new("report");

        let recurring = dispatcher.dispatch_with(&job, "every 5 minutes").unwrap();
        let bad_recurring = dispatcher.dispatch_with(&job, "every sometimes").unwrap();
        let delayed = dispatcher.dispatch_with(&job, "in 10 minutes").unwrap();
        let bad_delayed = dispatcher.dispatch_with(&job, "whenever you like").unwrap();
        dispatcher.flush().await;

        assert!(was_accepted(&dispatcher, &recurring).await.unwrap());
        assert!(!was_accepted(&dispatcher, &bad_recurring).await.unwrap());
        assert!(was_accepted(&dispatcher, &delayed).await.unwrap());
        assert!(!was_accepted(&dispatcher, &bad_delayed).await.unwrap());
        dispatcher.shutdown().await.unwrap();
    }

    #[test]
    fn test_unknown_priority_rejected_by_parser() {
        let result = Cli::try_parse_from(["jobhub", "dispatch", "x", "--priority", "urgent"]);
        assert!(result.is_err());
    }
}
