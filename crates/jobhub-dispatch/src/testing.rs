//! Recording queue backend for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use jobhub_core::JobId;
use jobhub_entity::{
    BackendJob, JobRecord, QueueStats, RecurringEntry, RemovalResponse, RemoveCriteria,
};
use jobhub_queue::{BackendError, BackendResult, JobHandler, QueueBackend};

/// One backend primitive invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Now(BackendJob),
    Every(String, BackendJob),
    Schedule(String, BackendJob),
    Remove(RemoveCriteria),
    Clear,
    Process(String),
    Start,
    Shutdown,
}

/// Backend that records every call and answers with scripted responses.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Mutex<Vec<Call>>,
    remove_responses: Mutex<VecDeque<BackendResult<RemovalResponse>>>,
    clear_responses: Mutex<VecDeque<BackendResult<RemovalResponse>>>,
    fail_submissions: AtomicBool,
    fail_next_process: AtomicBool,
}

impl RecordingBackend {
    pub fn arc() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn respond_to_remove(&self, response: BackendResult<RemovalResponse>) {
        self.remove_responses.lock().unwrap().push_back(response);
    }

    pub fn respond_to_clear(&self, response: BackendResult<RemovalResponse>) {
        self.clear_responses.lock().unwrap().push_back(response);
    }

    pub fn fail_submissions(&self) {
        self.fail_submissions.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_process(&self) {
        self.fail_next_process.store(true, Ordering::SeqCst);
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn submission(&self, id: JobId) -> BackendResult<JobId> {
        if self.fail_submissions.load(Ordering::SeqCst) {
            Err(BackendError::Connection("recording backend offline".into()))
        } else {
            Ok(id)
        }
    }
}

#[async_trait]
impl QueueBackend for RecordingBackend {
    fn queue_name(&self) -> &str {
        "test"
    }

    async fn now(&self, job: BackendJob) -> BackendResult<JobId> {
        let id = job.id;
        self.record(Call::Now(job));
        self.submission(id)
    }

    async fn every(&self, expression: &str, job: BackendJob) -> BackendResult<JobId> {
        let id = job.id;
        self.record(Call::Every(expression.to_string(), job));
        self.submission(id)
    }

    async fn schedule(&self, when: &str, job: BackendJob) -> BackendResult<JobId> {
        let id = job.id;
        self.record(Call::Schedule(when.to_string(), job));
        self.submission(id)
    }

    async fn remove(&self, criteria: RemoveCriteria) -> BackendResult<RemovalResponse> {
        self.record(Call::Remove(criteria));
        self.remove_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(RemovalResponse::default()))
    }

    async fn clear(&self) -> BackendResult<RemovalResponse> {
        self.record(Call::Clear);
        self.clear_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(RemovalResponse::default()))
    }

    async fn process(&self, name: &str, _handler: Arc<dyn JobHandler>) -> BackendResult<()> {
        self.record(Call::Process(name.to_string()));
        if self.fail_next_process.swap(false, Ordering::SeqCst) {
            return Err(BackendError::Connection("recording backend offline".into()));
        }
        Ok(())
    }

    async fn start(&self) -> BackendResult<()> {
        self.record(Call::Start);
        Ok(())
    }

    async fn get(&self, _id: JobId) -> BackendResult<Option<JobRecord>> {
        Ok(None)
    }

    async fn recurring(&self, _id: JobId) -> BackendResult<Option<RecurringEntry>> {
        Ok(None)
    }

    async fn stats(&self) -> BackendResult<QueueStats> {
        Ok(QueueStats {
            queue: "test".into(),
            ..QueueStats::default()
        })
    }

    async fn shutdown(&self) -> BackendResult<()> {
        self.record(Call::Shutdown);
        Ok(())
    }
}
