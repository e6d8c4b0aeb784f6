//! Job handler trait and execution errors.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use jobhub_core::error::AppError;
use jobhub_entity::JobRecord;

/// Application-supplied logic run by a worker for jobs of one name.
#[async_trait]
pub trait JobHandler: Send + Sync + fmt::Debug {
    /// Execute the job. `Ok(Some(value))` is stored as the job result.
    async fn execute(&self, job: &JobRecord) -> Result<Option<Value>, JobExecutionError>;
}

/// Error from job execution
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// Permanent failure, never retried
    #[error("Permanent job failure: {0}")]
    Permanent(String),

    /// Transient failure, retried while attempts remain
    #[error("Transient job failure: {0}")]
    Transient(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

/// Handler backed by an async closure.
pub struct FnHandler<F> {
    f: F,
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> JobHandler for FnHandler<F>
where
    F: Fn(JobRecord) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Value>, JobExecutionError>> + Send + 'static,
{
    async fn execute(&self, job: &JobRecord) -> Result<Option<Value>, JobExecutionError> {
        (self.f)(job.clone()).await
    }
}

/// Wrap an async closure as a shareable [`JobHandler`].
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn JobHandler>
where
    F: Fn(JobRecord) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Value>, JobExecutionError>> + Send + 'static,
{
    Arc::new(FnHandler { f })
}
