//! Recurring-job timers built on `tokio-cron-scheduler`.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};
use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing;
use uuid::Uuid;

use jobhub_core::JobId;
use jobhub_entity::{JobRecord, RecurringEntry};

use crate::error::{BackendError, BackendResult};
use crate::store::JobStore;
use crate::when::{Recurrence, parse_recurrence};

/// Drives recurring registrations: every tick enqueues a fresh copy of the
/// registered job into the store.
///
/// The underlying `JobScheduler` is created on first use, so a queue that
/// never arms a timer never spawns the scheduler's actor tasks.
pub struct RecurringScheduler {
    /// The underlying job scheduler
    scheduler: OnceCell<JobScheduler>,
    /// Registration id to scheduler job id
    timers: Mutex<HashMap<JobId, Uuid>>,
}

impl std::fmt::Debug for RecurringScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecurringScheduler")
            .field("initialized", &self.scheduler.initialized())
            .finish()
    }
}

impl Default for RecurringScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl RecurringScheduler {
    /// Create a new scheduler (not yet ticking)
    pub fn new() -> Self {
        Self {
            scheduler: OnceCell::new(),
            timers: Mutex::new(HashMap::new()),
        }
    }

    async fn scheduler(&self) -> BackendResult<&JobScheduler> {
        self.scheduler
            .get_or_try_init(|| async {
                JobScheduler::new().await.map_err(|e| {
                    BackendError::Scheduler(format!("Failed to create scheduler: {e}"))
                })
            })
            .await
    }

    /// Start ticking
    pub async fn start(&self) -> BackendResult<()> {
        self.scheduler()
            .await?
            .start()
            .await
            .map_err(|e| BackendError::Scheduler(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Recurring scheduler started");
        Ok(())
    }

    /// Start a timer for `entry`. Registering an id twice is a no-op.
    pub async fn register<S: JobStore>(
        &self,
        entry: &RecurringEntry,
        store: Arc<S>,
    ) -> BackendResult<()> {
        let mut timers = self.timers.lock().await;
        if timers.contains_key(&entry.id()) {
            return Ok(());
        }

        let template = entry.job.clone();
        let tick = move |_uuid: Uuid, _lock: JobScheduler| {
            let store = Arc::clone(&store);
            let job = template.occurrence();
            Box::pin(async move {
                let job_id = job.id;
                let job_name = job.name().to_string();
                tracing::debug!(%job_id, %job_name, "Enqueuing recurring occurrence");
                if let Err(e) = store.insert(JobRecord::pending(job)).await {
                    tracing::error!(%job_id, %job_name, "Failed to enqueue recurring job: {e}");
                }
            }) as std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>
        };

        let cron_job = match parse_recurrence(&entry.expression)? {
            Recurrence::Cron(expr) => CronJob::new_async(expr.as_str(), tick),
            Recurrence::Interval(every) => CronJob::new_repeated_async(every, tick),
        }
        .map_err(|e| BackendError::InvalidExpression {
            expression: entry.expression.clone(),
            reason: e.to_string(),
        })?;

        let uuid = self
            .scheduler()
            .await?
            .add(cron_job)
            .await
            .map_err(|e| BackendError::Scheduler(format!("Failed to add timer: {e}")))?;
        timers.insert(entry.id(), uuid);

        tracing::info!(
            registration_id = %entry.id(),
            job_name = entry.job.name(),
            expression = %entry.expression,
            "Registered recurring job"
        );
        Ok(())
    }

    /// Stop the timer of a registration. Returns whether one was running.
    pub async fn cancel(&self, id: JobId) -> BackendResult<bool> {
        let Some(uuid) = self.timers.lock().await.remove(&id) else {
            return Ok(false);
        };
        self.scheduler()
            .await?
            .remove(&uuid)
            .await
            .map_err(|e| BackendError::Scheduler(format!("Failed to remove timer: {e}")))?;

        tracing::info!(registration_id = %id, "Cancelled recurring job");
        Ok(true)
    }

    /// Number of running timers.
    pub async fn active(&self) -> usize {
        self.timers.lock().await.len()
    }

    /// Whether the underlying scheduler has been created.
    pub fn is_initialized(&self) -> bool {
        self.scheduler.initialized()
    }

    /// Shutdown the scheduler. A no-op if it was never created.
    pub async fn shutdown(&self) -> BackendResult<()> {
        let Some(scheduler) = self.scheduler.get() else {
            return Ok(());
        };
        let mut scheduler = scheduler.clone();
        scheduler
            .shutdown()
            .await
            .map_err(|e| BackendError::Scheduler(format!("Failed to shutdown scheduler: {e}")))?;
        self.timers.lock().await.clear();

        tracing::info!("Recurring scheduler shut down");
        Ok(())
    }
}
