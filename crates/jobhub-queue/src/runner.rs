//! Worker runner: polls the store for one job name and executes its handler.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Semaphore, watch};
use tokio::time;
use tracing;

use jobhub_core::config::worker::WorkerConfig;
use jobhub_entity::JobRecord;

use crate::handler::{JobExecutionError, JobHandler};
use crate::store::JobStore;

/// Consumes jobs of a single name from a single queue.
#[derive(Debug)]
pub struct WorkerRunner<S: JobStore> {
    /// Queue polled
    queue: String,
    /// Job name handled
    name: String,
    /// Backing store
    store: Arc<S>,
    /// Handler invoked for each job
    handler: Arc<dyn JobHandler>,
    /// Worker configuration
    config: WorkerConfig,
}

impl<S: JobStore> WorkerRunner<S> {
    /// Create a new worker runner
    pub fn new(
        queue: impl Into<String>,
        name: impl Into<String>,
        store: Arc<S>,
        handler: Arc<dyn JobHandler>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue: queue.into(),
            name: name.into(),
            store,
            handler,
            config,
        }
    }

    /// Run until the cancel signal is received, then wait for in-flight jobs.
    pub async fn run(self, mut cancel: watch::Receiver<bool>) {
        let concurrency = self.config.concurrency.max(1);
        tracing::info!(
            queue = %self.queue,
            job_name = %self.name,
            concurrency,
            poll_interval_ms = self.config.poll_interval_ms,
            "Worker started"
        );

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let poll_interval = self.config.poll_interval();

        loop {
            if *cancel.borrow() {
                break;
            }
            tokio::select! {
                _ = cancel.changed() => {
                    if *cancel.borrow() {
                        tracing::info!(job_name = %self.name, "Worker received shutdown signal");
                        break;
                    }
                }
                claimed = self.poll_and_execute(&semaphore) => {
                    if claimed {
                        continue;
                    }
                    tokio::select! {
                        _ = cancel.changed() => {
                            if *cancel.borrow() {
                                tracing::info!(job_name = %self.name, "Worker shutting down");
                                break;
                            }
                        }
                        _ = time::sleep(poll_interval) => {}
                    }
                }
            }
        }

        tracing::info!(job_name = %self.name, "Worker waiting for in-flight jobs to complete...");

        let _ = time::timeout(
            self.config.shutdown_grace(),
            semaphore.acquire_many(concurrency as u32),
        )
        .await;

        tracing::info!(job_name = %self.name, "Worker shut down complete");
    }

    /// Claim one job and spawn its execution. Returns whether a job was claimed.
    async fn poll_and_execute(&self, semaphore: &Arc<Semaphore>) -> bool {
        let permit = match Arc::clone(semaphore).try_acquire_owned() {
            Ok(p) => p,
            Err(_) => {
                tracing::trace!(job_name = %self.name, "All worker slots occupied, waiting...");
                return false;
            }
        };

        match self.store.claim_next(&self.queue, &self.name).await {
            Ok(Some(record)) => {
                let store = Arc::clone(&self.store);
                let handler = Arc::clone(&self.handler);
                tokio::spawn(async move {
                    let _permit = permit;
                    execute(store, handler, record).await;
                });
                true
            }
            Ok(None) => {
                tracing::trace!(job_name = %self.name, "No jobs available");
                false
            }
            Err(e) => {
                tracing::error!(job_name = %self.name, "Failed to claim job: {e}");
                false
            }
        }
    }
}

/// Run one attempt and persist the outcome.
async fn execute<S: JobStore>(store: Arc<S>, handler: Arc<dyn JobHandler>, mut record: JobRecord) {
    let job_id = record.id();
    let job_name = record.name().to_string();
    let max_attempts = record.job.options.attempts;

    tracing::info!(
        %job_id,
        %job_name,
        attempt = record.attempts,
        max_attempts,
        "Processing job"
    );

    let outcome = match record.job.options.ttl() {
        Some(ttl) => match time::timeout(ttl, handler.execute(&record)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(JobExecutionError::Transient(format!(
                "timed out after {}ms",
                ttl.as_millis()
            ))),
        },
        None => handler.execute(&record).await,
    };

    match outcome {
        Ok(result) => {
            tracing::info!(%job_id, %job_name, "Job completed successfully");
            if record.job.options.remove_on_complete {
                if let Err(e) = store.delete(&record.job.queue, job_id).await {
                    tracing::error!(%job_id, "Failed to remove completed job: {e}");
                }
                return;
            }
            record.mark_completed(result);
        }
        Err(JobExecutionError::Transient(msg)) if record.can_retry() => {
            let delay = record.job.options.retry_delay(record.attempts);
            tracing::warn!(
                %job_id,
                %job_name,
                retry_in_ms = delay.as_millis() as u64,
                "Job failed (transient): {msg}"
            );
            let run_at = chrono::Duration::from_std(delay)
                .ok()
                .and_then(|delay| Utc::now().checked_add_signed(delay));
            match run_at {
                Some(run_at) => record.reschedule(run_at, msg),
                None => {
                    tracing::error!(%job_id, %job_name, "Retry delay out of range, giving up");
                    record.mark_failed(format!(
                        "{msg} (retry delay of {}ms out of range)",
                        delay.as_millis()
                    ));
                }
            }
        }
        Err(JobExecutionError::Transient(msg)) => {
            tracing::error!(%job_id, %job_name, "Job failed after {max_attempts} attempts: {msg}");
            record.mark_failed(msg);
        }
        Err(JobExecutionError::Permanent(msg)) => {
            tracing::error!(%job_id, %job_name, "Job failed permanently: {msg}");
            record.mark_failed(msg);
        }
        Err(JobExecutionError::Internal(err)) => {
            let msg = err.to_string();
            tracing::error!(%job_id, %job_name, "Job internal error: {msg}");
            record.mark_failed(msg);
        }
    }

    if let Err(e) = store.update(&record).await {
        tracing::error!(%job_id, "Failed to persist job state {}: {e}", record.status);
    }
}
