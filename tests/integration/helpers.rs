//! Shared test helpers for integration tests.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use jobhub_core::JobId;
use jobhub_core::config::queue::QueueConfig;
use jobhub_core::config::worker::WorkerConfig;
use jobhub_dispatch::{Dispatcher, HandlerRegistry};
use jobhub_entity::{JobRecord, JobStatus, QueueStats};
use jobhub_queue::{JobHandler, connect_backend, handler_fn};

/// Upper bound for anything the tests wait on
pub const WAIT: Duration = Duration::from_secs(5);

/// Jobs seen by recording handlers, in execution order
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    seen: Arc<Mutex<Vec<JobRecord>>>,
}

impl Recorder {
    /// A handler that records every job it receives and succeeds
    pub fn handler(&self) -> Arc<dyn JobHandler> {
        let seen = Arc::clone(&self.seen);
        handler_fn(move |job: JobRecord| {
            let seen = Arc::clone(&seen);
            async move {
                seen.lock().unwrap().push(job);
                Ok(None)
            }
        })
    }

    /// Every recorded job
    pub fn jobs(&self) -> Vec<JobRecord> {
        self.seen.lock().unwrap().clone()
    }

    /// Number of recorded jobs
    pub fn count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    /// Wait until at least `n` jobs have been recorded
    pub async fn wait_for(&self, n: usize) -> bool {
        eventually(WAIT, move || async move { self.count() >= n }).await
    }
}

/// Test application context
pub struct TestApp {
    /// Dispatcher over an in-memory backend, already listening
    pub dispatcher: Dispatcher,
    /// Records jobs handled by [`TestApp::new`] handlers
    pub recorder: Recorder,
}

impl TestApp {
    /// Start an app whose handlers record every job named in `names`
    pub async fn new(names: &[&str]) -> Self {
        let recorder = Recorder::default();
        let mut registry = HandlerRegistry::new();
        for name in names {
            registry.register(*name, recorder.handler());
        }
        Self::with_registry(registry, recorder).await
    }

    /// Start an app with a caller-built registry
    pub async fn with_registry(registry: HandlerRegistry, recorder: Recorder) -> Self {
        let queue = QueueConfig {
            name: "integration".to_string(),
            ..QueueConfig::default()
        };
        let worker = WorkerConfig {
            poll_interval_ms: 10,
            shutdown_grace_seconds: 1,
            ..WorkerConfig::default()
        };

        let backend = connect_backend(&queue, &worker)
            .await
            .expect("Failed to connect in-memory backend");
        let dispatcher = Dispatcher::new(backend, registry);
        dispatcher.listen().await.expect("Failed to listen");

        Self {
            dispatcher,
            recorder,
        }
    }

    /// Deliver outstanding submissions and read queue statistics
    pub async fn stats(&self) -> QueueStats {
        self.dispatcher.flush().await;
        self.dispatcher
            .backend()
            .stats()
            .await
            .expect("Failed to read stats")
    }

    /// Wait until the job record `id` reaches `status`
    pub async fn wait_for_status(&self, id: JobId, status: JobStatus) -> bool {
        let backend = self.dispatcher.backend();
        eventually(WAIT, move || async move {
            matches!(backend.get(id).await, Ok(Some(record)) if record.status == status)
        })
        .await
    }

    /// Shut the dispatcher and backend down
    pub async fn shutdown(self) {
        self.dispatcher.shutdown().await.expect("Failed to shut down");
    }
}

/// Poll `check` until it holds or `timeout` elapses. Returns the last result.
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
