//! Notification receiver capability.
//!
//! Each transport is an independent listener behind this trait so a
//! platform lacking one transport can omit it without touching the producer
//! or the consumer's lifecycle.

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use crate::types::{ReceivedJob, Transport};

/// Channel into which receivers push decoded jobs.
pub type ReceivedJobSink = mpsc::UnboundedSender<ReceivedJob>;

/// A bound listener that accepts job notifications until shut down.
#[async_trait]
pub trait NotificationReceiver: Send + Sync + std::fmt::Debug + 'static {
    /// Transport served by this receiver.
    fn transport(&self) -> Transport;

    /// Run the accept loop.
    ///
    /// Every accepted connection carrying a valid job is forwarded to `sink`.
    /// The loop observes `shutdown` at least once per poll interval, releases
    /// its listening resources and returns once the flag turns `true` (or the
    /// sender is dropped).
    async fn serve(self: Box<Self>, sink: ReceivedJobSink, shutdown: watch::Receiver<bool>);
}
