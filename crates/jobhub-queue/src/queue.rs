//! Generic queue backend over a [`JobStore`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing;

use jobhub_core::JobId;
use jobhub_core::config::worker::WorkerConfig;
use jobhub_entity::{
    BackendJob, JobRecord, QueueStats, RecurringEntry, RemovalResponse, RemoveCriteria,
    RemoveQuery,
};

use crate::backend::QueueBackend;
use crate::error::{BackendError, BackendResult};
use crate::handler::JobHandler;
use crate::runner::WorkerRunner;
use crate::scheduler::RecurringScheduler;
use crate::store::JobStore;
use crate::when::{parse_recurrence, parse_when};

/// A named queue: storage, recurring timers and workers.
#[derive(Debug)]
pub struct JobQueue<S: JobStore> {
    /// Queue name
    name: String,
    /// Backing store
    store: Arc<S>,
    /// Recurring timers
    scheduler: RecurringScheduler,
    /// Worker configuration for `process`
    config: WorkerConfig,
    /// Whether recurring timers are running
    started: AtomicBool,
    /// Set once `shutdown` has been called
    closed: AtomicBool,
    /// Stops every worker
    cancel: watch::Sender<bool>,
    /// Spawned workers
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl<S: JobStore> JobQueue<S> {
    /// Create a queue named `name` on `store`.
    pub fn new(name: impl Into<String>, store: S, config: WorkerConfig) -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            name: name.into(),
            store: Arc::new(store),
            scheduler: RecurringScheduler::new(),
            config,
            started: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            cancel,
            workers: Mutex::new(Vec::new()),
        }
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn ensure_open(&self) -> BackendResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BackendError::Closed);
        }
        Ok(())
    }

    /// Delete a recurring registration and stop its timer.
    async fn drop_recurring(&self, id: JobId) -> BackendResult<bool> {
        self.scheduler.cancel(id).await?;
        self.store.delete_recurring(&self.name, id).await
    }

    async fn drop_recurring_matching(&self, query: &RemoveQuery) -> BackendResult<u64> {
        let mut removed = 0;
        for entry in self.store.list_recurring(&self.name).await? {
            if query.matches(&entry.job) && self.drop_recurring(entry.id()).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl<S: JobStore> QueueBackend for JobQueue<S> {
    fn queue_name(&self) -> &str {
        &self.name
    }

    async fn now(&self, job: BackendJob) -> BackendResult<JobId> {
        self.ensure_open()?;
        let id = job.id;
        tracing::debug!(job_id = %id, job_name = job.name(), queue = %self.name, "Enqueued job");
        self.store.insert(JobRecord::pending(job)).await?;
        Ok(id)
    }

    async fn every(&self, expression: &str, job: BackendJob) -> BackendResult<JobId> {
        self.ensure_open()?;
        parse_recurrence(expression)?;

        if let Some(unique) = job.options.unique.clone() {
            let replaced = self
                .drop_recurring_matching(&RemoveQuery::by_unique(unique.as_str()))
                .await?;
            if replaced > 0 {
                tracing::info!(%unique, replaced, "Replaced recurring registration");
            }
        }

        let entry = RecurringEntry::new(expression, job);
        self.store.save_recurring(&entry).await?;
        if self.started.load(Ordering::Acquire) {
            self.scheduler
                .register(&entry, Arc::clone(&self.store))
                .await?;
        }

        tracing::debug!(
            registration_id = %entry.id(),
            job_name = entry.job.name(),
            expression,
            "Stored recurring registration"
        );
        Ok(entry.id())
    }

    async fn schedule(&self, when: &str, job: BackendJob) -> BackendResult<JobId> {
        self.ensure_open()?;
        let run_at = parse_when(when, Utc::now())?;
        let id = job.id;
        tracing::debug!(job_id = %id, job_name = job.name(), %run_at, "Scheduled delayed job");
        self.store.insert(JobRecord::delayed(job, run_at)).await?;
        Ok(id)
    }

    async fn remove(&self, criteria: RemoveCriteria) -> BackendResult<RemovalResponse> {
        self.ensure_open()?;
        let removed = match criteria.target_id() {
            Some(id) => {
                let job = u64::from(self.store.delete(&self.name, id).await?);
                let recurring = u64::from(self.drop_recurring(id).await?);
                job + recurring
            }
            None => match &criteria {
                RemoveCriteria::Query(query) if !query.is_empty() => {
                    self.store.delete_matching(&self.name, query).await?
                        + self.drop_recurring_matching(query).await?
                }
                _ => 0,
            },
        };

        tracing::debug!(queue = %self.name, removed, "Removed jobs");
        Ok(RemovalResponse::new(removed))
    }

    async fn clear(&self) -> BackendResult<RemovalResponse> {
        self.ensure_open()?;
        for entry in self.store.list_recurring(&self.name).await? {
            self.scheduler.cancel(entry.id()).await?;
        }
        let removed = self.store.clear(&self.name).await?;

        tracing::info!(queue = %self.name, removed, "Cleared queue");
        Ok(RemovalResponse::new(removed))
    }

    async fn process(&self, name: &str, handler: Arc<dyn JobHandler>) -> BackendResult<()> {
        self.ensure_open()?;
        if !self.config.enabled {
            tracing::info!(job_name = name, "Workers disabled, handler not attached");
            return Ok(());
        }

        let runner = WorkerRunner::new(
            self.name.clone(),
            name,
            Arc::clone(&self.store),
            handler,
            self.config.clone(),
        );
        let handle = tokio::spawn(runner.run(self.cancel.subscribe()));
        self.workers.lock().await.push(handle);
        Ok(())
    }

    async fn start(&self) -> BackendResult<()> {
        self.ensure_open()?;
        if self.started.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let entries = self.store.list_recurring(&self.name).await?;
        for entry in &entries {
            self.scheduler
                .register(entry, Arc::clone(&self.store))
                .await?;
        }
        self.scheduler.start().await?;

        tracing::info!(queue = %self.name, recurring = entries.len(), "Queue started");
        Ok(())
    }

    async fn get(&self, id: JobId) -> BackendResult<Option<JobRecord>> {
        self.store.get(&self.name, id).await
    }

    async fn recurring(&self, id: JobId) -> BackendResult<Option<RecurringEntry>> {
        Ok(self
            .store
            .list_recurring(&self.name)
            .await?
            .into_iter()
            .find(|entry| entry.id() == id))
    }

    async fn stats(&self) -> BackendResult<QueueStats> {
        self.store.stats(&self.name).await
    }

    async fn shutdown(&self) -> BackendResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        tracing::info!(queue = %self.name, "Shutting down queue");

        self.cancel.send_replace(true);
        self.scheduler.shutdown().await?;

        let workers = std::mem::take(&mut *self.workers.lock().await);
        for worker in workers {
            if let Err(e) = worker.await {
                tracing::error!(queue = %self.name, "Worker task failed: {e}");
            }
        }

        tracing::info!(queue = %self.name, "Queue shut down");
        Ok(())
    }
}
