//! End-to-end tests: producer, notification channel, consumer, handler and
//! acknowledgment.

#![cfg(unix)]

mod helpers;

use std::sync::Arc;

use tokio::sync::watch;

use printhub_core::events::ConsumerEvent;
use printhub_core::types::{DeliverySource, Transport};
use printhub_service::SubmitStatus;
use printhub_worker::{ConsumerRunner, handlers};

use helpers::{TestEnv, USER, assert_quiet, next_event, request, wait_until};

#[tokio::test]
async fn test_live_job_is_saved_and_spool_cleaned() {
    let env = TestEnv::new();
    let (mut consumer, events) = env.consumer();
    consumer.start().await.unwrap();

    let handler = handlers::from_config(&env.config.consumer, None, Arc::clone(&env.store));
    let runner = ConsumerRunner::new(handler, consumer.acknowledger());
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let run = tokio::spawn(async move { runner.run(events, cancel_rx).await });

    let status = env
        .producer()
        .submit(request("101", "Quarterly Report", b"%PDF-1.7 quarterly"))
        .await;
    assert_eq!(status, SubmitStatus::Delivered(Transport::Unix));

    let saved = env.output_dir().join("Quarterly Report.pdf");
    wait_until(|| saved.exists() && consumer.pending_jobs().is_empty()).await;
    assert_eq!(std::fs::read(&saved).unwrap(), b"%PDF-1.7 quarterly");

    cancel_tx.send(true).unwrap();
    run.await.unwrap();
    consumer.stop().await;

    let spool_dir = env.store.spool_dir(USER).unwrap();
    let payloads = std::fs::read_dir(&spool_dir)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "pdf"))
        .count();
    assert_eq!(payloads, 0);
    assert!(!env.store.pending_path(USER).unwrap().exists());
}

#[tokio::test]
async fn test_offline_job_is_replayed_on_startup() {
    let env = TestEnv::new();

    let status = env
        .producer()
        .submit(request("202", "Letter", b"%PDF-1.4 letter"))
        .await;
    assert_eq!(status, SubmitStatus::Pending);
    assert_eq!(status.exit_code(), 0);
    assert!(env.store.pending_path(USER).unwrap().exists());

    let (mut consumer, mut events) = env.consumer();
    consumer.start().await.unwrap();

    let ConsumerEvent::JobAvailable { mut job, source } = next_event(&mut events).await;
    assert_eq!(source, DeliverySource::Pending);
    assert_eq!(job.job_id, "202");
    assert_eq!(std::fs::read(&job.file_path).unwrap(), b"%PDF-1.4 letter");

    consumer.mark_processed(&mut job).await.unwrap();
    consumer.stop().await;

    assert!(env.store.load_pending(USER).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_pending_and_live_jobs_surface_once_each() {
    let env = TestEnv::new();
    let producer = env.producer();

    assert_eq!(
        producer.submit(request("1", "Offline", b"offline")).await,
        SubmitStatus::Pending
    );

    let (mut consumer, mut events) = env.consumer();
    consumer.start().await.unwrap();

    assert_eq!(
        producer.submit(request("2", "Online", b"online")).await,
        SubmitStatus::Delivered(Transport::Unix)
    );

    let first = next_event(&mut events).await;
    let second = next_event(&mut events).await;
    assert_eq!(first.job().job_id, "1");
    assert!(matches!(
        first,
        ConsumerEvent::JobAvailable {
            source: DeliverySource::Pending,
            ..
        }
    ));
    assert_eq!(second.job().job_id, "2");
    assert!(matches!(
        second,
        ConsumerEvent::JobAvailable {
            source: DeliverySource::Live(Transport::Unix),
            ..
        }
    ));
    assert_quiet(&mut events).await;

    consumer.stop().await;
}

#[tokio::test]
async fn test_acknowledged_job_is_not_replayed_after_restart() {
    let env = TestEnv::new();
    env.producer().submit(request("3", "Once", b"once")).await;

    let (mut consumer, mut events) = env.consumer();
    consumer.start().await.unwrap();
    let mut job = next_event(&mut events).await.job().clone();
    consumer.mark_processed(&mut job).await.unwrap();
    consumer.stop().await;

    let (mut restarted, mut events) = env.consumer();
    restarted.start().await.unwrap();
    assert_quiet(&mut events).await;
    restarted.stop().await;
}

#[tokio::test]
async fn test_unacknowledged_job_survives_restart() {
    let env = TestEnv::new();
    env.producer().submit(request("4", "Again", b"again")).await;

    let (mut consumer, mut events) = env.consumer();
    consumer.start().await.unwrap();
    assert_eq!(next_event(&mut events).await.job().job_id, "4");
    consumer.stop().await;

    let (mut restarted, mut events) = env.consumer();
    restarted.start().await.unwrap();
    assert_eq!(next_event(&mut events).await.job().job_id, "4");
    restarted.stop().await;
}
