//! Integration tests for recurring registrations.

use std::time::Duration;

use jobhub_dispatch::{GenericJob, SchedulingIntent};
use jobhub_entity::{JobOptions, RemovalResponse, RemoveQuery};

use crate::helpers::TestApp;

/// Count executions over a quiet period once in-flight occurrences settle.
async fn executions_after_settling(app: &TestApp) -> (usize, usize) {
    tokio::time::sleep(Duration::from_millis(300)).await;
    let before = app.recorder.count();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    (before, app.recorder.count())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_interval_registration_repeats_until_removed() {
    let app = TestApp::new(&["heartbeat"]).await;

    let result = app
        .dispatcher
        .dispatch_with(&GenericJob::new("heartbeat"), "every 1 second")
        .unwrap();
    assert_eq!(
        result.intent,
        SchedulingIntent::Recurring {
            expression: "1 second".into()
        }
    );

    assert!(app.recorder.wait_for(2).await);
    let ids: Vec<_> = app.recorder.jobs().iter().map(|j| j.id()).collect();
    assert_ne!(ids[0], ids[1], "each occurrence is a fresh job");
    assert!(ids.iter().all(|id| *id != result.id));

    let removed = app.dispatcher.remove(result.id).await.unwrap();
    assert_eq!(removed, RemovalResponse::new(1));
    assert_eq!(app.stats().await.recurring, 0);

    let (before, after) = executions_after_settling(&app).await;
    assert_eq!(before, after);
    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cron_registration_fires() {
    let app = TestApp::new(&["tick"]).await;

    let result = app
        .dispatcher
        .dispatch_with(&GenericJob::new("tick"), "*/1 * * * * *")
        .unwrap();
    assert_eq!(
        result.intent,
        SchedulingIntent::Recurring {
            expression: "*/1 * * * * *".into()
        }
    );

    assert!(app.recorder.wait_for(1).await);

    app.dispatcher
        .remove(RemoveQuery::by_name("tick"))
        .await
        .unwrap();
    let (before, after) = executions_after_settling(&app).await;
    assert_eq!(before, after);
    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unique_key_replaces_registration() {
    let app = TestApp::new(&[]).await;
    let job =
        GenericJob::new("digest").with_options(JobOptions::default().with_unique("daily-digest"));

    app.dispatcher.dispatch_with(&job, "every 1 day").unwrap();
    let latest = app.dispatcher.dispatch_with(&job, "every 12 hours").unwrap();
    assert_eq!(app.stats().await.recurring, 1);

    let removed = app
        .dispatcher
        .remove(RemoveQuery::by_unique("daily-digest"))
        .await
        .unwrap();
    assert_eq!(removed, RemovalResponse::new(1));

    let again = app.dispatcher.remove(latest.id).await.unwrap();
    assert_eq!(again, RemovalResponse::new(0));
    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_invalid_expression_registers_nothing() {
    let app = TestApp::new(&[]).await;

    app.dispatcher
        .dispatch_with(&GenericJob::new("report"), "every blue moon")
        .unwrap();
    assert_eq!(app.stats().await.recurring, 0);
    app.shutdown().await;
}
