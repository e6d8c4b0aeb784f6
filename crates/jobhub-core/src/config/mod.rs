//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate and overridden by `JOBHUB__`-prefixed environment
//! variables. Each sub-module represents a logical configuration section.

pub mod logging;
pub mod queue;
pub mod worker;

use serde::{Deserialize, Serialize};

use self::logging::LoggingConfig;
use self::queue::{BackendKind, QueueConfig};
use self::worker::WorkerConfig;

use crate::error::AppError;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Queue backend connection settings.
    #[serde(default)]
    pub queue: QueueConfig,
    /// Job consumption settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration for an environment.
    ///
    /// Merges `config/default.toml` with `config/{env}.toml` (both optional)
    /// and environment variables prefixed with `JOBHUB__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false));
        Self::build(builder)
    }

    /// Load configuration from an explicit file path plus environment overrides.
    ///
    /// The file must exist.
    pub fn load_from(path: &str) -> Result<Self, AppError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(path).required(true));
        Self::build(builder)
    }

    fn build(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, AppError> {
        let config = builder
            .add_source(
                config::Environment::with_prefix("JOBHUB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let parsed: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        parsed.validate()?;
        Ok(parsed)
    }

    /// Reject configurations that cannot produce a working queue connection.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.queue.name.trim().is_empty() {
            return Err(AppError::configuration("queue.name must not be empty"));
        }
        if self.queue.backend == BackendKind::Redis && self.queue.redis.url.trim().is_empty() {
            return Err(AppError::configuration(
                "queue.redis.url is required when queue.backend = \"redis\"",
            ));
        }
        if self.worker.concurrency == 0 {
            return Err(AppError::configuration(
                "worker.concurrency must be at least 1",
            ));
        }
        if self.worker.poll_interval_ms == 0 {
            return Err(AppError::configuration(
                "worker.poll_interval_ms must be greater than 0",
            ));
        }
        match self.logging.format.as_str() {
            "json" | "pretty" => Ok(()),
            other => Err(AppError::configuration(format!(
                "Unknown logging.format '{other}'. Supported: json, pretty"
            ))),
        }
    }
}
