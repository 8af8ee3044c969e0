//! Events raised by the job consumer for the presentation layer.
//!
//! The consumer pushes events into an unbounded channel; the presentation
//! layer drains it on its own scheduling thread and must acknowledge every
//! delivered job exactly once.

use serde::{Deserialize, Serialize};

use crate::types::{DeliverySource, PrintJob};

/// Event emitted by the consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ConsumerEvent {
    /// A job is ready to be handled.
    JobAvailable {
        /// The full job record.
        job: PrintJob,
        /// Where the job came from.
        source: DeliverySource,
    },
}

impl ConsumerEvent {
    /// The job carried by this event.
    pub fn job(&self) -> &PrintJob {
        match self {
            Self::JobAvailable { job, .. } => job,
        }
    }
}
