//! Consumer runner: drains consumer events, hands each job to a handler,
//! and acknowledges it.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{error, info};

use printhub_core::events::ConsumerEvent;

use crate::consumer::JobAcknowledger;
use crate::executor::{JobHandler, JobOutcome};

/// Headless stand-in for the presentation layer.
#[derive(Debug)]
pub struct ConsumerRunner {
    handler: Arc<dyn JobHandler>,
    acknowledger: JobAcknowledger,
}

impl ConsumerRunner {
    /// Create a runner acknowledging through `acknowledger`.
    pub fn new(handler: Arc<dyn JobHandler>, acknowledger: JobAcknowledger) -> Self {
        Self {
            handler,
            acknowledger,
        }
    }

    /// Handle events until the cancel signal is received or the consumer
    /// drops its event sender.
    pub async fn run(
        &self,
        mut events: mpsc::UnboundedReceiver<ConsumerEvent>,
        mut cancel: watch::Receiver<bool>,
    ) {
        info!(handler = self.handler.name(), "Consumer runner started");

        loop {
            tokio::select! {
                _ = cancel.changed() => {
                    if *cancel.borrow() {
                        info!("Consumer runner received shutdown signal");
                        break;
                    }
                }
                event = events.recv() => {
                    match event {
                        Some(event) => self.process(event).await,
                        None => break,
                    }
                }
            }
        }

        info!("Consumer runner stopped");
    }

    /// Handle one event. Handler failures are logged and the job is
    /// acknowledged anyway; its payload stays in the spool directory.
    pub async fn process(&self, event: ConsumerEvent) {
        let ConsumerEvent::JobAvailable { mut job, source } = event;
        info!(job_id = %job.job_id, %source, title = %job.title, copies = job.copies, "Handling job");

        match self.handler.handle(&job).await {
            Ok(JobOutcome::Saved(path)) => {
                info!(job_id = %job.job_id, path = %path.display(), "Job saved");
            }
            Ok(JobOutcome::Retained) => {
                info!(job_id = %job.job_id, path = %job.file_path.display(), "Job retained");
            }
            Err(e) => {
                error!(
                    job_id = %job.job_id,
                    handler = self.handler.name(),
                    error = %e,
                    "Job handling failed, payload retained"
                );
            }
        }

        if let Err(e) = self.acknowledger.mark_processed(&mut job).await {
            error!(job_id = %job.job_id, error = %e, "Failed to acknowledge job");
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    use std::time::Duration;

    use async_trait::async_trait;

    use printhub_core::config::{ChannelConfig, ConsumerConfig, SpoolConfig};
    use printhub_core::error::AppError;
    use printhub_core::result::AppResult;
    use printhub_core::types::PrintJob;
    use printhub_storage::{PayloadSource, SpoolStore};

    use crate::consumer::JobConsumer;

    #[derive(Debug)]
    struct FailingHandler;

    #[async_trait]
    impl JobHandler for FailingHandler {
        fn name(&self) -> &str {
            "failing"
        }

        async fn handle(&self, _job: &PrintJob) -> AppResult<JobOutcome> {
            Err(AppError::internal("disk full"))
        }
    }

    #[tokio::test]
    async fn test_failed_job_is_acknowledged_and_payload_kept() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SpoolStore::new(&SpoolConfig {
            root_dir: dir.path().join("spool").to_string_lossy().into_owned(),
            ..SpoolConfig::default()
        }));
        let path = store
            .write_payload(
                "alice",
                "1",
                "Doc",
                "20240101_120000",
                PayloadSource::from_reader(&b"%PDF"[..]),
            )
            .await
            .unwrap();
        let job = PrintJob::new("1", "alice", "Doc", 1, "", path.clone(), "20240101_120000");
        store.append_pending("alice", &job).await.unwrap();

        let channel = ChannelConfig {
            socket_path: dir.path().join("printhub.sock").to_string_lossy().into_owned(),
            enable_tcp: false,
            poll_interval_ms: 50,
            ..ChannelConfig::default()
        };
        let (mut consumer, events) =
            JobConsumer::new("alice", Arc::clone(&store), channel, ConsumerConfig::default());
        consumer.start().await.unwrap();

        let runner = ConsumerRunner::new(Arc::new(FailingHandler), consumer.acknowledger());
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let run = tokio::spawn(async move { runner.run(events, cancel_rx).await });

        tokio::time::timeout(Duration::from_secs(5), async {
            while !consumer.pending_jobs().is_empty() {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .unwrap();

        cancel_tx.send(true).unwrap();
        run.await.unwrap();
        consumer.stop().await;

        assert!(path.exists());
        assert!(store.load_pending("alice").await.unwrap().is_empty());
    }
}
