//! Integration tests for handler failures, retries and TTL.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use jobhub_dispatch::{GenericJob, HandlerRegistry};
use jobhub_entity::{Backoff, JobOptions, JobRecord, JobStatus};
use jobhub_queue::JobExecutionError;

use crate::helpers::{Recorder, TestApp, WAIT, eventually};

/// A registry whose `flaky` handler fails transiently `failures` times
/// before succeeding, counting every call.
fn flaky_registry(failures: u32, calls: Arc<AtomicU32>) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry.register_fn("flaky", move |job: JobRecord| {
        let calls = Arc::clone(&calls);
        async move {
            let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= failures {
                return Err(JobExecutionError::Transient(format!(
                    "attempt {} of {} failed",
                    job.attempts, job.job.options.attempts
                )));
            }
            Ok(Some(serde_json::json!({ "call": call })))
        }
    });
    registry
}

fn retrying(attempts: u32) -> JobOptions {
    JobOptions::default()
        .with_attempts(attempts)
        .with_backoff(Backoff::Fixed { delay_ms: 20 })
}

#[tokio::test(flavor = "multi_thread")]
async fn test_transient_failures_retried_until_success() {
    let calls = Arc::new(AtomicU32::new(0));
    let app =
        TestApp::with_registry(flaky_registry(2, Arc::clone(&calls)), Recorder::default()).await;

    let result = app
        .dispatcher
        .dispatch(&GenericJob::new("flaky").with_options(retrying(3)))
        .unwrap();

    assert!(app.wait_for_status(result.id, JobStatus::Completed).await);
    let record = app
        .dispatcher
        .backend()
        .get(result.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.attempts, 3);
    assert_eq!(record.result, Some(serde_json::json!({ "call": 3 })));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_attempts_exhausted_marks_failed() {
    let calls = Arc::new(AtomicU32::new(0));
    let app =
        TestApp::with_registry(flaky_registry(10, Arc::clone(&calls)), Recorder::default()).await;

    let result = app
        .dispatcher
        .dispatch(&GenericJob::new("flaky").with_options(retrying(2)))
        .unwrap();

    assert!(app.wait_for_status(result.id, JobStatus::Failed).await);
    let record = app
        .dispatcher
        .backend()
        .get(result.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.attempts, 2);
    assert_eq!(record.error.as_deref(), Some("attempt 2 of 2 failed"));
    assert_eq!(app.stats().await.failed, 1);
    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_permanent_failure_is_not_retried() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let mut registry = HandlerRegistry::new();
    registry.register_fn("strict", move |_job: JobRecord| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(JobExecutionError::Permanent("malformed payload".into()))
        }
    });
    let app = TestApp::with_registry(registry, Recorder::default()).await;

    let result = app
        .dispatcher
        .dispatch(&GenericJob::new("strict").with_options(retrying(5)))
        .unwrap();

    assert!(app.wait_for_status(result.id, JobStatus::Failed).await);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ttl_expiry_fails_slow_job() {
    let mut registry = HandlerRegistry::new();
    registry.register_fn("slow", |_job: JobRecord| async {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(None)
    });
    let app = TestApp::with_registry(registry, Recorder::default()).await;

    let options = JobOptions::default().with_ttl(Duration::from_millis(100));
    let result = app
        .dispatcher
        .dispatch(&GenericJob::new("slow").with_options(options))
        .unwrap();

    assert!(app.wait_for_status(result.id, JobStatus::Failed).await);
    let record = app
        .dispatcher
        .backend()
        .get(result.id)
        .await
        .unwrap()
        .unwrap();
    assert!(record.error.unwrap().contains("timed out"));
    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_remove_on_complete_drops_record() {
    let app = TestApp::new(&["ephemeral"]).await;

    let options = JobOptions::default().remove_on_complete(true);
    let result = app
        .dispatcher
        .dispatch(&GenericJob::new("ephemeral").with_options(options))
        .unwrap();

    assert!(app.recorder.wait_for(1).await);
    let app_ref = &app;
    assert!(eventually(WAIT, move || async move { app_ref.stats().await.total() == 0 }).await);
    assert!(app.dispatcher.backend().get(result.id).await.unwrap().is_none());
    app.shutdown().await;
}
