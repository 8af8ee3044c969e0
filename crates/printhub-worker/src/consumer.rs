//! Job consumer lifecycle.
//!
//! The consumer binds every enabled notification receiver, replays the
//! user's persisted pending list, then serves live notifications until
//! stopped. Each job is raised once per process lifetime through an
//! unbounded event channel drained by the presentation layer, which must
//! call [`JobAcknowledger::mark_processed`] exactly once per delivered job.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use printhub_core::config::{ChannelConfig, ConsumerConfig};
use printhub_core::error::AppError;
use printhub_core::events::ConsumerEvent;
use printhub_core::result::AppResult;
use printhub_core::types::{DeliverySource, PrintJob, ReceivedJob};
use printhub_realtime::bind_all;
use printhub_storage::SpoolStore;

use crate::ledger::DeliveryLedger;
use crate::state::ConsumerState;

/// In-memory record of jobs raised in this process lifetime.
type JobList = Arc<Mutex<Vec<PrintJob>>>;

/// Resources owned while running.
#[derive(Debug)]
struct Running {
    shutdown_tx: watch::Sender<bool>,
    receivers: Vec<JoinHandle<()>>,
    dispatcher: JoinHandle<()>,
}

/// Receiving side of job delivery for one user.
#[derive(Debug)]
pub struct JobConsumer {
    user: String,
    store: Arc<SpoolStore>,
    channel: ChannelConfig,
    config: ConsumerConfig,
    events: mpsc::UnboundedSender<ConsumerEvent>,
    jobs: JobList,
    ledger: Arc<DeliveryLedger>,
    state: ConsumerState,
    running: Option<Running>,
}

impl JobConsumer {
    /// Create a stopped consumer and the event stream it will feed.
    pub fn new(
        user: impl Into<String>,
        store: Arc<SpoolStore>,
        channel: ChannelConfig,
        config: ConsumerConfig,
    ) -> (Self, mpsc::UnboundedReceiver<ConsumerEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let consumer = Self {
            user: user.into(),
            store,
            channel,
            config,
            events,
            jobs: Arc::new(Mutex::new(Vec::new())),
            ledger: Arc::new(DeliveryLedger::new()),
            state: ConsumerState::Stopped,
            running: None,
        };
        (consumer, events_rx)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConsumerState {
        self.state
    }

    /// Bind receivers, replay the pending list, and start serving.
    ///
    /// Pending jobs are raised in stored order before any live job. Fails
    /// without touching the pending list when no receiver can be bound.
    pub async fn start(&mut self) -> AppResult<()> {
        if self.state != ConsumerState::Stopped {
            return Err(AppError::validation(format!(
                "Consumer cannot start while {}",
                self.state
            )));
        }
        self.store.spool_dir(&self.user)?;

        self.state = ConsumerState::Starting;
        info!(user = %self.user, "Starting job consumer");

        let receivers = match bind_all(&self.channel).await {
            Ok(receivers) => receivers,
            Err(e) => {
                self.state = ConsumerState::Stopped;
                return Err(e);
            }
        };

        self.replay_pending().await;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (sink, received) = mpsc::unbounded_channel();
        let receivers: Vec<JoinHandle<()>> = receivers
            .into_iter()
            .map(|receiver| tokio::spawn(receiver.serve(sink.clone(), shutdown_rx.clone())))
            .collect();
        drop(sink);

        let dispatcher = tokio::spawn(dispatch_live(
            received,
            LiveContext {
                user: self.user.clone(),
                store: Arc::clone(&self.store),
                persist: self.config.persist_live_jobs,
                events: self.events.clone(),
                jobs: Arc::clone(&self.jobs),
                ledger: Arc::clone(&self.ledger),
            },
        ));

        self.running = Some(Running {
            shutdown_tx,
            receivers,
            dispatcher,
        });
        self.state = ConsumerState::Running;
        info!(user = %self.user, "Job consumer running");
        Ok(())
    }

    /// Signal the accept loops to exit and wait for them to release their
    /// sockets. Live dispatch is given the grace period to drain in-flight
    /// connections and is then cancelled, so no job is raised after this
    /// returns.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        self.state = ConsumerState::Stopping;
        info!(user = %self.user, "Stopping job consumer");

        let _ = running.shutdown_tx.send(true);
        let grace = Duration::from_secs(self.config.shutdown_grace_seconds);

        for handle in running.receivers {
            match tokio::time::timeout(grace, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Receiver task failed"),
                Err(_) => warn!("Receiver did not stop within grace period"),
            }
        }
        let mut dispatcher = running.dispatcher;
        if tokio::time::timeout(grace, &mut dispatcher).await.is_err() {
            debug!("Dispatcher still draining after grace period, cancelling");
            dispatcher.abort();
            let _ = dispatcher.await;
        }

        self.requeue_unacknowledged().await;

        self.state = ConsumerState::Stopped;
        info!(user = %self.user, "Job consumer stopped");
    }

    /// Jobs raised so far and not yet acknowledged, oldest first.
    pub fn pending_jobs(&self) -> Vec<PrintJob> {
        let jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        jobs.iter().filter(|j| !j.processed).cloned().collect()
    }

    /// Acknowledge a delivered job. See [`JobAcknowledger::mark_processed`].
    pub async fn mark_processed(&self, job: &mut PrintJob) -> AppResult<()> {
        self.acknowledger().mark_processed(job).await
    }

    /// Handle for acknowledging jobs from another task.
    pub fn acknowledger(&self) -> JobAcknowledger {
        JobAcknowledger {
            user: self.user.clone(),
            store: Arc::clone(&self.store),
            jobs: Arc::clone(&self.jobs),
        }
    }

    /// Write jobs raised but never acknowledged back to the pending list so
    /// the next start raises them again.
    async fn requeue_unacknowledged(&self) {
        let unacknowledged: Vec<PrintJob> = self
            .pending_jobs()
            .into_iter()
            .filter(PrintJob::payload_exists)
            .collect();
        if unacknowledged.is_empty() {
            return;
        }

        let count = unacknowledged.len();
        let result = self
            .store
            .update_pending(&self.user, move |persisted| {
                for job in unacknowledged {
                    if !persisted.iter().any(|p| p.same_job(&job)) {
                        persisted.push(job);
                    }
                }
            })
            .await;
        match result {
            Ok(()) => info!(user = %self.user, count, "Re-queued unacknowledged jobs"),
            Err(e) => warn!(user = %self.user, error = %e, "Failed to re-queue unacknowledged jobs"),
        }
    }

    async fn replay_pending(&self) {
        let pending = match self.store.load_pending(&self.user).await {
            Ok(pending) => pending,
            Err(e) => {
                warn!(user = %self.user, error = %e, "Could not load pending jobs");
                return;
            }
        };

        for job in pending {
            if !owned_by(&self.store, &self.user, &job).await {
                continue;
            }
            if !self.ledger.record(&job) {
                debug!(job_id = %job.job_id, "Duplicate pending record skipped");
                continue;
            }
            remember(&self.jobs, &job);
            let event = ConsumerEvent::JobAvailable {
                job: job.clone(),
                source: DeliverySource::Pending,
            };
            if self.events.send(event).is_err() {
                warn!(job_id = %job.job_id, "No event listener, re-queueing pending job");
                if let Err(e) = self.store.append_pending(&self.user, &job).await {
                    warn!(job_id = %job.job_id, error = %e, "Failed to re-queue pending job");
                }
            }
        }
    }
}

/// Cloneable acknowledgment handle.
#[derive(Debug, Clone)]
pub struct JobAcknowledger {
    user: String,
    store: Arc<SpoolStore>,
    jobs: JobList,
}

impl JobAcknowledger {
    /// Mark `job` processed and rewrite the persisted pending list.
    ///
    /// The new list is the persisted one without `job`, followed by every
    /// other job raised in this process that is still unacknowledged and not
    /// already on disk. An empty result deletes the file.
    /// The in-memory snapshot is taken while the pending list is locked, so
    /// concurrent acknowledgments never write back each other's jobs.
    pub async fn mark_processed(&self, job: &mut PrintJob) -> AppResult<()> {
        job.processed = true;
        {
            let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
            for known in jobs.iter_mut().filter(|known| known.same_job(job)) {
                known.processed = true;
            }
            jobs.retain(|known| !known.processed);
        }

        let acknowledged = job.clone();
        let jobs = Arc::clone(&self.jobs);
        let remaining = self
            .store
            .update_pending(&self.user, move |persisted| {
                let unprocessed = jobs.lock().unwrap_or_else(|e| e.into_inner()).clone();
                persisted.retain(|p| !p.same_job(&acknowledged));
                for j in unprocessed {
                    if !persisted.iter().any(|p| p.same_job(&j)) {
                        persisted.push(j);
                    }
                }
                persisted.len()
            })
            .await?;

        info!(user = %self.user, job_id = %job.job_id, remaining, "Job acknowledged");
        Ok(())
    }
}

struct LiveContext {
    user: String,
    store: Arc<SpoolStore>,
    persist: bool,
    events: mpsc::UnboundedSender<ConsumerEvent>,
    jobs: JobList,
    ledger: Arc<DeliveryLedger>,
}

/// Forward live notifications as events until every receiver has exited.
async fn dispatch_live(mut received: mpsc::UnboundedReceiver<ReceivedJob>, ctx: LiveContext) {
    while let Some(ReceivedJob { job, transport }) = received.recv().await {
        if !owned_by(&ctx.store, &ctx.user, &job).await {
            continue;
        }
        if !ctx.ledger.record(&job) {
            debug!(job_id = %job.job_id, %transport, "Job already delivered, ignoring");
            continue;
        }

        if ctx.persist {
            if let Err(e) = ctx.store.append_pending(&ctx.user, &job).await {
                warn!(job_id = %job.job_id, error = %e, "Failed to persist live job");
            }
        }

        remember(&ctx.jobs, &job);
        info!(job_id = %job.job_id, %transport, title = %job.title, "Job available");
        let event = ConsumerEvent::JobAvailable {
            job,
            source: DeliverySource::Live(transport),
        };
        if ctx.events.send(event).is_err() {
            debug!("Event listener gone, dropping live job");
        }
    }
    debug!("Live dispatch finished");
}

/// Only records naming this user and a payload inside their spool directory
/// are raised. Anything else could point handlers at arbitrary files.
async fn owned_by(store: &SpoolStore, user: &str, job: &PrintJob) -> bool {
    if job.user == user && store.owns_payload(user, &job.file_path).await {
        return true;
    }
    warn!(
        user,
        job_id = %job.job_id,
        job_user = %job.user,
        path = %job.file_path.display(),
        "Ignoring job record outside the user's spool"
    );
    false
}

fn remember(jobs: &JobList, job: &PrintJob) {
    let mut jobs = jobs.lock().unwrap_or_else(|e| e.into_inner());
    jobs.push(job.clone());
}
