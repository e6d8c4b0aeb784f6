//! Job storage backing a [`JobQueue`](crate::queue::JobQueue).
//!
//! A store persists job records and recurring registrations per queue and
//! hands out ready jobs to workers. Claiming is atomic: a record is
//! returned to at most one worker per attempt.

pub mod memory;
#[cfg(feature = "redis-backend")]
pub mod redis;

use std::fmt::Debug;

use async_trait::async_trait;

use jobhub_core::JobId;
use jobhub_entity::{JobRecord, QueueStats, RecurringEntry, RemoveQuery};

use crate::error::BackendResult;

pub use memory::MemoryStore;
#[cfg(feature = "redis-backend")]
pub use self::redis::RedisStore;

/// Persistence for job records and recurring registrations.
#[async_trait]
pub trait JobStore: Send + Sync + Debug + 'static {
    /// Store a new record. Its status decides whether it is ready or delayed.
    async fn insert(&self, record: JobRecord) -> BackendResult<()>;

    /// Claim the most urgent ready job named `name`, marking it running.
    async fn claim_next(&self, queue: &str, name: &str) -> BackendResult<Option<JobRecord>>;

    /// Persist a record after a worker changed its state.
    async fn update(&self, record: &JobRecord) -> BackendResult<()>;

    /// Fetch a record.
    async fn get(&self, queue: &str, id: JobId) -> BackendResult<Option<JobRecord>>;

    /// Delete a record. Returns whether it existed.
    async fn delete(&self, queue: &str, id: JobId) -> BackendResult<bool>;

    /// Delete every record matching `query`. Returns the number deleted.
    async fn delete_matching(&self, queue: &str, query: &RemoveQuery) -> BackendResult<u64>;

    /// Store or replace a recurring registration.
    async fn save_recurring(&self, entry: &RecurringEntry) -> BackendResult<()>;

    /// Delete a recurring registration. Returns whether it existed.
    async fn delete_recurring(&self, queue: &str, id: JobId) -> BackendResult<bool>;

    /// All recurring registrations of a queue.
    async fn list_recurring(&self, queue: &str) -> BackendResult<Vec<RecurringEntry>>;

    /// Delete every record and registration of a queue. Returns the number deleted.
    async fn clear(&self, queue: &str) -> BackendResult<u64>;

    /// Per-status counts for a queue.
    async fn stats(&self, queue: &str) -> BackendResult<QueueStats>;
}
