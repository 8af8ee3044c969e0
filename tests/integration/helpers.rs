//! Shared test helpers for integration tests.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use printhub_core::config::{
    AppConfig, ChannelConfig, ConsumerConfig, LauncherConfig, SpoolConfig,
};
use printhub_core::events::ConsumerEvent;
use printhub_service::{JobProducer, SubmitRequest};
use printhub_storage::{PayloadSource, SpoolStore};
use printhub_worker::JobConsumer;

/// Account name used throughout the pipeline tests.
pub const USER: &str = "alice";

/// Isolated spool root, socket path, and output directory.
pub struct TestEnv {
    /// Keeps the temporary directory alive.
    pub dir: tempfile::TempDir,
    /// Application config pointing into `dir`.
    pub config: AppConfig,
    /// Spool store over `config.spool`.
    pub store: Arc<SpoolStore>,
}

impl TestEnv {
    /// Fresh environment with TCP and consumer launch disabled.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = AppConfig {
            spool: SpoolConfig {
                root_dir: dir.path().join("spool").to_string_lossy().into_owned(),
                ..SpoolConfig::default()
            },
            channel: ChannelConfig {
                socket_path: dir
                    .path()
                    .join("printhub.sock")
                    .to_string_lossy()
                    .into_owned(),
                enable_tcp: false,
                poll_interval_ms: 50,
                connect_timeout_ms: 500,
                ..ChannelConfig::default()
            },
            consumer: ConsumerConfig {
                output_dir: dir.path().join("out").to_string_lossy().into_owned(),
                shutdown_grace_seconds: 2,
                ..ConsumerConfig::default()
            },
            launcher: LauncherConfig {
                enabled: false,
                ..LauncherConfig::default()
            },
            ..AppConfig::default()
        };
        let store = Arc::new(SpoolStore::new(&config.spool));
        Self { dir, config, store }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    /// Producer wired the way the backend binary wires it.
    pub fn producer(&self) -> JobProducer {
        JobProducer::from_config(&self.config)
    }

    /// Consumer for [`USER`] sharing this environment's store.
    pub fn consumer(&self) -> (JobConsumer, mpsc::UnboundedReceiver<ConsumerEvent>) {
        JobConsumer::new(
            USER,
            Arc::clone(&self.store),
            self.config.channel.clone(),
            self.config.consumer.clone(),
        )
    }
}

/// Submission for [`USER`] carrying `data` as its payload.
pub fn request(job_id: &str, title: &str, data: &'static [u8]) -> SubmitRequest {
    SubmitRequest {
        job_id: job_id.to_string(),
        user: USER.to_string(),
        title: title.to_string(),
        copies: 1,
        options: String::new(),
        source: PayloadSource::from_reader(data),
    }
}

/// Next consumer event; panics after five seconds.
pub async fn next_event(events: &mut mpsc::UnboundedReceiver<ConsumerEvent>) -> ConsumerEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("event timeout")
        .expect("event channel closed")
}

/// Assert that no further event arrives within a short window.
pub async fn assert_quiet(events: &mut mpsc::UnboundedReceiver<ConsumerEvent>) {
    let extra = tokio::time::timeout(Duration::from_millis(300), events.recv()).await;
    assert!(extra.is_err(), "unexpected event: {extra:?}");
}

/// Poll `check` until it holds; panics after five seconds.
pub async fn wait_until(mut check: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("condition not reached");
}
