//! JobHub Server: job dispatch and processing
//!
//! Main entry point that wires the crates together and consumes jobs until
//! interrupted.

use std::sync::Arc;

use serde_json::Value;
use tracing;
use tracing_subscriber::{EnvFilter, fmt};

use jobhub_core::config::AppConfig;
use jobhub_core::error::AppError;
use jobhub_dispatch::{Dispatcher, HandlerRegistry};
use jobhub_entity::JobRecord;
use jobhub_queue::connect_backend;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    match std::env::var("JOBHUB_CONFIG") {
        Ok(path) => AppConfig::load_from(&path),
        Err(_) => {
            let env = std::env::var("JOBHUB_ENV").unwrap_or_else(|_| "development".to_string());
            AppConfig::load(&env)
        }
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Handlers this server consumes jobs for
fn builtin_handlers() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();

    registry.register_fn("log", |job: JobRecord| async move {
        tracing::info!(
            job_id = %job.id(),
            attempt = job.attempts,
            payload = %job.payload(),
            "log job received"
        );
        Ok(Some(job.payload().clone()))
    });

    registry.register_fn("noop", |_job: JobRecord| async { Ok(None::<Value>) });

    registry
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting JobHub v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        queue = %config.queue.name,
        backend = config.queue.backend.as_str(),
        "Connecting queue backend..."
    );

    let backend = connect_backend(&config.queue, &config.worker).await?;
    let dispatcher = Arc::new(Dispatcher::new(backend, builtin_handlers()));

    if config.worker.enabled {
        dispatcher.listen().await?;
    } else {
        tracing::warn!("Workers disabled (worker.enabled = false); not consuming jobs");
    }

    tracing::info!("JobHub ready. Press Ctrl+C to stop");
    shutdown_signal().await;

    tracing::info!("Shutting down...");
    dispatcher.shutdown().await?;
    tracing::info!("JobHub shut down gracefully");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
