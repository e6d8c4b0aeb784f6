//! Queue backend connection configuration.

use serde::{Deserialize, Serialize};

/// Which queue backend to connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Process-local queue (development and tests).
    Memory,
    /// Redis-backed durable queue.
    Redis,
}

impl BackendKind {
    /// Return the backend kind as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Redis => "redis",
        }
    }
}

/// Top-level queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Name of the queue every dispatched job is bound to.
    #[serde(default = "default_name")]
    pub name: String,
    /// Backend selection.
    #[serde(default = "default_backend")]
    pub backend: BackendKind,
    /// Redis-specific settings.
    #[serde(default)]
    pub redis: RedisQueueConfig,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            backend: default_backend(),
            redis: RedisQueueConfig::default(),
        }
    }
}

/// Redis queue backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisQueueConfig {
    /// Redis connection URL.
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Key prefix for all JobHub keys.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl RedisQueueConfig {
    /// The connection URL with any password replaced by `****`, for logs and display.
    pub fn masked_url(&self) -> String {
        let url = self.url.as_str();
        let Some(at_pos) = url.find('@') else {
            return url.to_string();
        };
        let scheme_end = url.find("://").map(|i| i + 3).unwrap_or(0);
        match url[..at_pos].rfind(':') {
            Some(colon_pos) if colon_pos >= scheme_end => {
                format!("{}****{}", &url[..=colon_pos], &url[at_pos..])
            }
            _ => url.to_string(),
        }
    }
}

impl Default for RedisQueueConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_key_prefix(),
        }
    }
}

fn default_name() -> String {
    "default".to_string()
}

fn default_backend() -> BackendKind {
    BackendKind::Memory
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_key_prefix() -> String {
    "jobhub:".to_string()
}
