//! Backend job and persisted job record.

use chrono::{DateTime, Utc};
use jobhub_core::JobId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::descriptor::JobDescriptor;
use super::options::JobOptions;
use super::status::JobStatus;

/// A job bound to a target queue, in the form the queue backend stores.
///
/// The identifier is assigned at conversion time, so callers know it
/// before the backend has acknowledged the submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendJob {
    /// Unique job identifier.
    pub id: JobId,
    /// Queue the job is bound to.
    pub queue: String,
    /// Name, payload and metadata.
    pub descriptor: JobDescriptor,
    /// Delivery options.
    pub options: JobOptions,
}

impl BackendJob {
    /// Bind a descriptor to a queue with a freshly generated id.
    pub fn new(queue: impl Into<String>, descriptor: JobDescriptor, options: JobOptions) -> Self {
        Self {
            id: JobId::new(),
            queue: queue.into(),
            descriptor,
            options,
        }
    }

    /// Job name (handler key).
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// Copy of this job under a new id. Used for each recurring occurrence.
    pub fn occurrence(&self) -> Self {
        Self {
            id: JobId::new(),
            ..self.clone()
        }
    }
}

/// A job as tracked by a queue backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    /// The job itself.
    pub job: BackendJob,
    /// Current status.
    pub status: JobStatus,
    /// Number of attempts started so far.
    pub attempts: u32,
    /// Earliest time a worker may pick the job up.
    pub run_at: DateTime<Utc>,
    /// Result data on completion.
    pub result: Option<serde_json::Value>,
    /// Last error message.
    pub error: Option<String>,
    /// When the current attempt started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal state.
    pub finished_at: Option<DateTime<Utc>>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// Record for a job that is ready immediately.
    pub fn pending(job: BackendJob) -> Self {
        let now = Utc::now();
        Self::build(job, JobStatus::Pending, now, now)
    }

    /// Record for a job that must wait until `run_at`.
    pub fn delayed(job: BackendJob, run_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        let status = if run_at > now {
            JobStatus::Delayed
        } else {
            JobStatus::Pending
        };
        Self::build(job, status, run_at, now)
    }

    fn build(job: BackendJob, status: JobStatus, run_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            job,
            status,
            attempts: 0,
            run_at,
            result: None,
            error: None,
            started_at: None,
            finished_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Job identifier.
    pub fn id(&self) -> JobId {
        self.job.id
    }

    /// Job name.
    pub fn name(&self) -> &str {
        self.job.name()
    }

    /// Raw payload.
    pub fn payload(&self) -> &serde_json::Value {
        self.job.descriptor.payload()
    }

    /// Deserialize the payload into a typed struct.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload().clone())
    }

    /// Whether a worker may claim this record at `now`.
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        self.status.is_waiting() && self.run_at <= now
    }

    /// Whether another attempt is allowed.
    pub fn can_retry(&self) -> bool {
        self.attempts < self.job.options.attempts
    }

    /// Transition to running and count the attempt.
    pub fn mark_running(&mut self) {
        let now = Utc::now();
        self.status = JobStatus::Running;
        self.attempts += 1;
        self.started_at = Some(now);
        self.updated_at = now;
    }

    /// Transition to completed.
    pub fn mark_completed(&mut self, result: Option<serde_json::Value>) {
        let now = Utc::now();
        self.status = JobStatus::Completed;
        self.result = result;
        self.error = None;
        self.finished_at = Some(now);
        self.updated_at = now;
    }

    /// Transition to failed.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        let now = Utc::now();
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        self.finished_at = Some(now);
        self.updated_at = now;
    }

    /// Put the job back in line for another attempt at `run_at`.
    pub fn reschedule(&mut self, run_at: DateTime<Utc>, error: impl Into<String>) {
        let now = Utc::now();
        self.status = if run_at > now {
            JobStatus::Delayed
        } else {
            JobStatus::Pending
        };
        self.run_at = run_at;
        self.error = Some(error.into());
        self.started_at = None;
        self.updated_at = now;
    }
}
