//! Redis connection management.

use redis::Client;
use redis::aio::ConnectionManager;
use tracing::info;

use jobhub_core::config::queue::RedisQueueConfig;

use crate::error::{BackendError, BackendResult};

/// Shared Redis connection plus the key namespace every queue key lives under.
#[derive(Debug, Clone)]
pub struct RedisClient {
    /// Redis connection manager (multiplexed, reconnecting).
    conn: ConnectionManager,
    /// Key prefix for all keys.
    key_prefix: String,
}

impl RedisClient {
    /// Connect using queue configuration.
    pub async fn connect(config: &RedisQueueConfig) -> BackendResult<Self> {
        info!(url = %config.masked_url(), "Connecting to Redis");

        let client = Client::open(config.url.as_str())
            .map_err(|e| BackendError::Connection(format!("invalid Redis URL: {e}")))?;

        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| BackendError::Connection(format!("failed to connect to Redis: {e}")))?;

        info!(key_prefix = %config.key_prefix, "Connected to Redis");
        Ok(Self {
            conn,
            key_prefix: config.key_prefix.clone(),
        })
    }

    /// A handle for issuing commands; clones share one multiplexed connection.
    pub fn conn_mut(&self) -> ConnectionManager {
        self.conn.clone()
    }

    /// Namespace every key is created under.
    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }
}
