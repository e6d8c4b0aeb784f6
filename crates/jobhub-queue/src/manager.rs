//! Backend selection from configuration.

use std::sync::Arc;

use tracing::info;

use jobhub_core::config::queue::{BackendKind, QueueConfig};
use jobhub_core::config::worker::WorkerConfig;
use jobhub_core::error::AppError;
use jobhub_core::result::AppResult;

use crate::backend::QueueBackend;
use crate::queue::JobQueue;
use crate::store::MemoryStore;

/// Connect the queue backend named by `config.backend`.
///
/// Returns the single shared connection handle a process hands to its
/// dispatcher.
pub async fn connect_backend(
    config: &QueueConfig,
    worker: &WorkerConfig,
) -> AppResult<Arc<dyn QueueBackend>> {
    if config.name.trim().is_empty() {
        return Err(AppError::configuration("queue.name must not be empty"));
    }

    let backend: Arc<dyn QueueBackend> = match config.backend {
        BackendKind::Memory => {
            info!(queue = %config.name, "Initializing in-memory queue backend");
            Arc::new(JobQueue::new(&config.name, MemoryStore::new(), worker.clone()))
        }
        #[cfg(feature = "redis-backend")]
        BackendKind::Redis => {
            info!(queue = %config.name, "Initializing Redis queue backend");
            let client = crate::store::redis::RedisClient::connect(&config.redis).await?;
            let store = crate::store::RedisStore::new(client);
            Arc::new(JobQueue::new(&config.name, store, worker.clone()))
        }
        #[cfg(not(feature = "redis-backend"))]
        BackendKind::Redis => {
            return Err(AppError::configuration(
                "queue.backend = \"redis\" requires the redis-backend feature",
            ));
        }
    };

    Ok(backend)
}
