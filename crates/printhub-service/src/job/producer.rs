//! Job producer: one print-job invocation becomes one spooled job.

use std::fmt;
use std::sync::Arc;

use tracing::{error, info, warn};

use printhub_core::config::AppConfig;
use printhub_core::types::job::current_timestamp;
use printhub_core::types::{PrintJob, Transport};
use printhub_realtime::NotificationSender;
use printhub_storage::{PayloadSource, SpoolStore};

use super::launcher::{CommandLauncher, ConsumerLauncher, DisabledLauncher};

/// One incoming print job.
#[derive(Debug)]
pub struct SubmitRequest {
    /// Job identifier from the printing subsystem.
    pub job_id: String,
    /// Owning account.
    pub user: String,
    /// Document title.
    pub title: String,
    /// Copy count (0 is treated as 1).
    pub copies: u32,
    /// Opaque options string.
    pub options: String,
    /// Raw print data.
    pub source: PayloadSource,
}

/// Result of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStatus {
    /// Payload stored and handed to a live consumer.
    Delivered(Transport),
    /// Payload stored and queued in the pending list.
    Pending,
    /// Payload could not be stored; no job exists.
    Failed,
}

impl SubmitStatus {
    /// Process exit code for the printing subsystem.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Delivered(_) | Self::Pending => 0,
            Self::Failed => 1,
        }
    }
}

impl fmt::Display for SubmitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivered(transport) => write!(f, "delivered via {transport}"),
            Self::Pending => write!(f, "queued as pending"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Orchestrates spool write, live delivery, and the pending fallback.
#[derive(Debug, Clone)]
pub struct JobProducer {
    /// Spool store.
    store: Arc<SpoolStore>,
    /// Notification sender.
    sender: NotificationSender,
    /// Wakes a consumer when none is listening.
    launcher: Arc<dyn ConsumerLauncher>,
}

impl JobProducer {
    /// Creates a new producer.
    pub fn new(
        store: Arc<SpoolStore>,
        sender: NotificationSender,
        launcher: Arc<dyn ConsumerLauncher>,
    ) -> Self {
        Self {
            store,
            sender,
            launcher,
        }
    }

    /// Wire a producer from application configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        let launcher: Arc<dyn ConsumerLauncher> = if config.launcher.enabled {
            Arc::new(CommandLauncher::new(&config.launcher))
        } else {
            Arc::new(DisabledLauncher)
        };
        Self::new(
            Arc::new(SpoolStore::new(&config.spool)),
            NotificationSender::new(&config.channel),
            launcher,
        )
    }

    /// Capture one job.
    ///
    /// Only a failure to store the payload fails the submission. Delivery,
    /// pending-list and launch problems are logged; the payload stays in the
    /// spool directory either way.
    pub async fn submit(&self, request: SubmitRequest) -> SubmitStatus {
        let SubmitRequest {
            job_id,
            user,
            title,
            copies,
            options,
            source,
        } = request;

        if let Err(e) = self.store.resolve_spool_dir(&user).await {
            error!(job_id = %job_id, user = %user, error = %e, "Cannot prepare spool directory");
            return SubmitStatus::Failed;
        }

        let timestamp = current_timestamp();
        let file_path = match self
            .store
            .write_payload(&user, &job_id, &title, &timestamp, source)
            .await
        {
            Ok(path) => path,
            Err(e) => {
                error!(job_id = %job_id, user = %user, error = %e, "Failed to store job payload");
                return SubmitStatus::Failed;
            }
        };

        let job = PrintJob::new(job_id, user, title, copies, options, file_path, timestamp);

        if let Some(transport) = self.sender.deliver(&job).await {
            return SubmitStatus::Delivered(transport);
        }

        info!(job_id = %job.job_id, user = %job.user, "No consumer listening, queueing job");
        if let Err(e) = self.store.append_pending(&job.user, &job).await {
            error!(job_id = %job.job_id, user = %job.user, error = %e, "Failed to queue pending job");
        }

        if let Err(e) = self.launcher.launch(&job.user) {
            warn!(user = %job.user, error = %e, "Could not launch a consumer");
        }

        SubmitStatus::Pending
    }
}
