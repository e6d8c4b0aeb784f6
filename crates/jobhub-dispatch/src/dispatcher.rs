//! The dispatcher: conversion, intent classification and backend calls.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing;

use jobhub_core::JobId;
use jobhub_entity::{BackendJob, JobDescriptor, RemovalResponse, RemoveCriteria};
use jobhub_queue::{BackendResult, QueueBackend};

use crate::converter::JobConverter;
use crate::error::DispatchError;
use crate::intent::SchedulingIntent;
use crate::job::AppJob;
use crate::registry::HandlerRegistry;

/// What `dispatch` hands back before the backend has seen the job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchResult {
    /// Identifier the backend will store the job (or registration) under.
    pub id: JobId,
    /// The converted job as submitted.
    pub job: BackendJob,
    /// How it was classified.
    pub intent: SchedulingIntent,
}

impl DispatchResult {
    /// The submitted descriptor.
    pub fn descriptor(&self) -> &JobDescriptor {
        &self.job.descriptor
    }
}

enum Command {
    Submit(BackendJob, SchedulingIntent),
    Drain(oneshot::Sender<()>),
    Close(oneshot::Sender<()>),
}

/// Front door for submitting, removing and consuming jobs.
///
/// Owns the process's single backend connection. Submissions are
/// fire-and-forget: they are queued to one background task, so backend
/// calls happen in dispatch order. Must be created inside a Tokio runtime.
#[derive(Debug)]
pub struct Dispatcher {
    backend: Arc<dyn QueueBackend>,
    registry: HandlerRegistry,
    submissions: mpsc::UnboundedSender<Command>,
    listening: AtomicBool,
    closed: AtomicBool,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Submit(job, intent) => f
                .debug_tuple("Submit")
                .field(&job.id)
                .field(&intent.kind())
                .finish(),
            Self::Drain(_) => f.write_str("Drain"),
            Self::Close(_) => f.write_str("Close"),
        }
    }
}

impl Dispatcher {
    /// Create a dispatcher over `backend` with the handlers in `registry`.
    pub fn new(backend: Arc<dyn QueueBackend>, registry: HandlerRegistry) -> Self {
        let (submissions, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_submitter(Arc::clone(&backend), rx));

        Self {
            backend,
            registry,
            submissions,
            listening: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// The backend connection.
    pub fn backend(&self) -> &Arc<dyn QueueBackend> {
        &self.backend
    }

    /// The handler registry.
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Submit `job` for immediate processing.
    pub fn dispatch<J: AppJob + ?Sized>(&self, job: &J) -> Result<DispatchResult, DispatchError> {
        self.submit(job, None)
    }

    /// Submit `job` according to `intent`: `"now"`, a recurring expression
    /// such as `"every 5 minutes"` or `"*/5 * * * *"`, or a timestamp or delay.
    pub fn dispatch_with<J: AppJob + ?Sized>(
        &self,
        job: &J,
        intent: &str,
    ) -> Result<DispatchResult, DispatchError> {
        self.submit(job, Some(intent))
    }

    fn submit<J: AppJob + ?Sized>(
        &self,
        job: &J,
        intent: Option<&str>,
    ) -> Result<DispatchResult, DispatchError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DispatchError::Closed);
        }

        let backend_job = JobConverter::convert(job, self.backend.queue_name())?;
        let intent = SchedulingIntent::parse(intent)?;

        tracing::debug!(
            job_id = %backend_job.id,
            job_name = backend_job.name(),
            queue = %backend_job.queue,
            intent = %intent,
            "Dispatching job"
        );

        let result = DispatchResult {
            id: backend_job.id,
            job: backend_job.clone(),
            intent: intent.clone(),
        };
        self.submissions
            .send(Command::Submit(backend_job, intent))
            .map_err(|_| DispatchError::Closed)?;

        Ok(result)
    }

    /// Wait until every submission made so far has reached the backend.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.submissions.send(Command::Drain(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    /// Remove by id, job instance, or query. The backend's response or
    /// error is returned unchanged.
    pub async fn remove(
        &self,
        criteria: impl Into<RemoveCriteria>,
    ) -> BackendResult<RemovalResponse> {
        self.flush().await;
        self.backend.remove(criteria.into()).await
    }

    /// Remove every job in the bound queue. The backend's response or error
    /// is returned unchanged.
    pub async fn clear(&self) -> BackendResult<RemovalResponse> {
        self.flush().await;
        self.backend.clear().await
    }

    /// Attach every registered handler and start recurring timers.
    ///
    /// Only the first successful call does anything; a failed attempt can
    /// be retried.
    pub async fn listen(&self) -> BackendResult<()> {
        if self.listening.swap(true, Ordering::AcqRel) {
            tracing::warn!("Dispatcher is already listening");
            return Ok(());
        }

        let attached = match self.attach().await {
            Ok(attached) => attached,
            Err(e) => {
                self.listening.store(false, Ordering::Release);
                tracing::error!(queue = self.backend.queue_name(), "Failed to listen: {e}");
                return Err(e);
            }
        };

        tracing::info!(
            queue = self.backend.queue_name(),
            handlers = attached,
            "Listening for jobs"
        );
        Ok(())
    }

    async fn attach(&self) -> BackendResult<usize> {
        let attached = self
            .registry
            .listen_for_app_jobs(self.backend.as_ref())
            .await?;
        self.backend.start().await?;
        Ok(attached)
    }

    /// Refuse new submissions, deliver the outstanding ones, then shut the
    /// backend down.
    ///
    /// Every submission that was accepted reaches the backend before it is
    /// shut down, including ones racing with this call.
    pub async fn shutdown(&self) -> BackendResult<()> {
        self.closed.store(true, Ordering::Release);
        let (tx, rx) = oneshot::channel();
        if self.submissions.send(Command::Close(tx)).is_ok() {
            let _ = rx.await;
        }
        self.backend.shutdown().await
    }
}

async fn run_submitter(backend: Arc<dyn QueueBackend>, mut rx: mpsc::UnboundedReceiver<Command>) {
    let mut closing = Vec::new();
    while let Some(command) = rx.recv().await {
        match command {
            Command::Submit(job, intent) => deliver(backend.as_ref(), job, intent).await,
            Command::Drain(done) => {
                let _ = done.send(());
            }
            Command::Close(done) => {
                // Later sends fail; whatever is already buffered is still delivered.
                rx.close();
                closing.push(done);
            }
        }
    }
    for done in closing {
        let _ = done.send(());
    }
}

/// Issue exactly one backend primitive for a submission.
async fn deliver(backend: &dyn QueueBackend, job: BackendJob, intent: SchedulingIntent) {
    let job_id = job.id;
    let job_name = job.name().to_string();

    let outcome = match &intent {
        SchedulingIntent::Immediate => backend.now(job).await,
        SchedulingIntent::Recurring { expression } => backend.every(expression, job).await,
        SchedulingIntent::DelayedAt { instant } => backend.schedule(instant, job).await,
        SchedulingIntent::DelayedBy { duration } => backend.schedule(duration, job).await,
    };

    match outcome {
        Ok(_) => tracing::debug!(%job_id, %job_name, intent = intent.kind(), "Job submitted"),
        Err(e) => tracing::error!(
            %job_id,
            %job_name,
            intent = %intent,
            "Failed to submit job: {e}"
        ),
    }
}
