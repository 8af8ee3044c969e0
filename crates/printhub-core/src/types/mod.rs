//! Shared value types: the print job record and delivery transports.

pub mod job;
pub mod transport;

pub use job::{PrintJob, TIMESTAMP_FORMAT};
pub use transport::{DeliverySource, ReceivedJob, Transport};
