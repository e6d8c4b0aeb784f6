//! The queue backend seam.
//!
//! The dispatcher only ever talks to a [`QueueBackend`]. Concrete
//! backends live in [`crate::queue`]; tests substitute recording doubles.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use jobhub_core::JobId;
use jobhub_entity::{
    BackendJob, JobRecord, QueueStats, RecurringEntry, RemovalResponse, RemoveCriteria,
};

use crate::error::BackendResult;
use crate::handler::JobHandler;

/// Durable job store with immediate, delayed and recurring primitives.
#[async_trait]
pub trait QueueBackend: Send + Sync + Debug + 'static {
    /// Name of the queue this connection is bound to.
    fn queue_name(&self) -> &str;

    /// Enqueue a job for immediate processing.
    async fn now(&self, job: BackendJob) -> BackendResult<JobId>;

    /// Register a job to be re-enqueued on a repeating schedule.
    async fn every(&self, expression: &str, job: BackendJob) -> BackendResult<JobId>;

    /// Enqueue a job to become ready at `when` (timestamp or relative duration).
    async fn schedule(&self, when: &str, job: BackendJob) -> BackendResult<JobId>;

    /// Remove jobs and recurring registrations matching `criteria`.
    async fn remove(&self, criteria: RemoveCriteria) -> BackendResult<RemovalResponse>;

    /// Remove every job and recurring registration in the bound queue.
    async fn clear(&self) -> BackendResult<RemovalResponse>;

    /// Attach a handler to jobs named `name`. Consumption begins immediately.
    async fn process(&self, name: &str, handler: Arc<dyn JobHandler>) -> BackendResult<()>;

    /// Start recurring timers. Idempotent.
    async fn start(&self) -> BackendResult<()>;

    /// Look up a job record.
    async fn get(&self, id: JobId) -> BackendResult<Option<JobRecord>>;

    /// Look up a recurring registration.
    async fn recurring(&self, id: JobId) -> BackendResult<Option<RecurringEntry>>;

    /// Per-status counts for the bound queue.
    async fn stats(&self) -> BackendResult<QueueStats>;

    /// Stop workers and timers, waiting for in-flight jobs.
    async fn shutdown(&self) -> BackendResult<()>;
}
