//! Delivery transports and the origin of a delivered job.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::job::PrintJob;

/// A notification channel transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Local-domain (Unix) stream socket.
    Unix,
    /// Loopback TCP fallback.
    Tcp,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix => write!(f, "unix"),
            Self::Tcp => write!(f, "tcp"),
        }
    }
}

/// Where the consumer obtained a job from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "transport", rename_all = "lowercase")]
pub enum DeliverySource {
    /// Loaded from the persisted pending list at startup.
    Pending,
    /// Received live over a notification transport.
    Live(Transport),
}

impl fmt::Display for DeliverySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Live(transport) => write!(f, "live/{transport}"),
        }
    }
}

/// A job decoded by a notification receiver.
#[derive(Debug, Clone)]
pub struct ReceivedJob {
    /// The decoded record.
    pub job: PrintJob,
    /// Transport that carried it.
    pub transport: Transport,
}
