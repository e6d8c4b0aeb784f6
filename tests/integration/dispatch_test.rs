//! Integration tests for immediate and delayed dispatch, removal and clear.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use jobhub_dispatch::{DispatchError, GenericJob, SchedulingIntent, TypedJob};
use jobhub_entity::{JobOptions, JobPriority, JobStatus, RemovalResponse, RemoveQuery};

use crate::helpers::TestApp;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct WelcomeEmail {
    to: String,
    template: String,
}

#[tokio::test(flavor = "multi_thread")]
async fn test_immediate_job_reaches_handler_with_payload() {
    let app = TestApp::new(&["send-email"]).await;
    let email = WelcomeEmail {
        to: "ada@example.com".into(),
        template: "welcome".into(),
    };
    let job = TypedJob::new("send-email", email.clone())
        .with_options(JobOptions::default().with_priority(JobPriority::High));

    let result = app.dispatcher.dispatch(&job).unwrap();
    assert_eq!(result.intent, SchedulingIntent::Immediate);
    assert_eq!(result.job.queue, "integration");

    assert!(app.recorder.wait_for(1).await);
    let handled = &app.recorder.jobs()[0];
    assert_eq!(handled.id(), result.id);
    assert_eq!(handled.payload_as::<WelcomeEmail>().unwrap(), email);
    assert_eq!(handled.job.descriptor.meta("priority"), Some("high"));

    assert!(app.wait_for_status(result.id, JobStatus::Completed).await);
    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_explicit_now_intent_is_immediate() {
    let app = TestApp::new(&["ping"]).await;

    let result = app
        .dispatcher
        .dispatch_with(&GenericJob::new("ping"), "now")
        .unwrap();
    assert_eq!(result.intent, SchedulingIntent::Immediate);

    assert!(app.recorder.wait_for(1).await);
    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delayed_by_duration_runs_after_delay() {
    let app = TestApp::new(&["reminder"]).await;

    let result = app
        .dispatcher
        .dispatch_with(&GenericJob::new("reminder"), "in 500ms")
        .unwrap();
    assert!(result.intent.is_delayed());

    let stats = app.stats().await;
    assert_eq!(stats.delayed, 1);
    assert_eq!(app.recorder.count(), 0);

    assert!(app.recorder.wait_for(1).await);
    let handled = &app.recorder.jobs()[0];
    assert!(handled.run_at <= handled.started_at.unwrap());
    assert!(handled.run_at - handled.created_at >= chrono::Duration::milliseconds(400));
    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delayed_at_timestamp_runs() {
    let app = TestApp::new(&["report"]).await;
    let at = (Utc::now() + chrono::Duration::milliseconds(300)).to_rfc3339();

    let result = app
        .dispatcher
        .dispatch_with(&GenericJob::new("report"), &at)
        .unwrap();
    assert!(matches!(result.intent, SchedulingIntent::DelayedAt { .. }));

    assert!(app.recorder.wait_for(1).await);
    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_invalid_delay_is_dropped_by_backend() {
    let app = TestApp::new(&["report"]).await;

    // Classified as a delay, rejected by the backend, logged by the submitter.
    let result = app
        .dispatcher
        .dispatch_with(&GenericJob::new("report"), "whenever you like")
        .unwrap();
    assert!(matches!(result.intent, SchedulingIntent::DelayedBy { .. }));

    assert_eq!(app.stats().await.total(), 0);
    assert!(app.dispatcher.backend().get(result.id).await.unwrap().is_none());
    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_empty_intent_and_missing_name_are_rejected_synchronously() {
    let app = TestApp::new(&[]).await;

    let err = app
        .dispatcher
        .dispatch_with(&GenericJob::new("report"), "")
        .unwrap_err();
    assert!(matches!(err, DispatchError::Ambiguous(_)));

    let err = app.dispatcher.dispatch(&GenericJob::new("")).unwrap_err();
    assert!(matches!(err, DispatchError::Conversion(_)));

    assert_eq!(app.stats().await.total(), 0);
    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unhandled_jobs_wait_then_remove_by_id_and_query() {
    let app = TestApp::new(&[]).await;

    let first = app.dispatcher.dispatch(&GenericJob::new("orphan")).unwrap();
    app.dispatcher.dispatch(&GenericJob::new("orphan")).unwrap();
    app.dispatcher.dispatch(&GenericJob::new("stray")).unwrap();
    assert_eq!(app.stats().await.pending, 3);

    let removed = app.dispatcher.remove(first.id).await.unwrap();
    assert_eq!(removed, RemovalResponse::new(1));

    let again = app.dispatcher.remove(&first.job).await.unwrap();
    assert_eq!(again, RemovalResponse::new(0));

    let removed = app
        .dispatcher
        .remove(RemoveQuery::by_name("orphan"))
        .await
        .unwrap();
    assert_eq!(removed, RemovalResponse::new(1));

    let nothing = app.dispatcher.remove(RemoveQuery::default()).await.unwrap();
    assert_eq!(nothing, RemovalResponse::new(0));

    assert_eq!(app.stats().await.pending, 1);
    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_clear_removes_everything_in_queue() {
    let app = TestApp::new(&[]).await;

    app.dispatcher.dispatch(&GenericJob::new("orphan")).unwrap();
    app.dispatcher
        .dispatch_with(&GenericJob::new("orphan"), "in 1 hour")
        .unwrap();
    app.dispatcher
        .dispatch_with(&GenericJob::new("digest"), "every 1 day")
        .unwrap();

    let stats = app.stats().await;
    assert_eq!((stats.pending, stats.delayed, stats.recurring), (1, 1, 1));

    let cleared = app.dispatcher.clear().await.unwrap();
    assert_eq!(cleared, RemovalResponse::new(3));
    assert_eq!(app.stats().await, jobhub_entity::QueueStats {
        queue: "integration".into(),
        ..Default::default()
    });
    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_dispatch_after_shutdown_is_refused() {
    let app = TestApp::new(&[]).await;
    app.dispatcher.shutdown().await.unwrap();

    let err = app
        .dispatcher
        .dispatch(&GenericJob::new("late"))
        .unwrap_err();
    assert!(matches!(err, DispatchError::Closed));
}
