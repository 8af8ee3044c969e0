//! Job capture services: producer orchestration and consumer launch.

pub mod launcher;
pub mod producer;

pub use launcher::{CommandLauncher, ConsumerLauncher, DisabledLauncher};
pub use producer::{JobProducer, SubmitRequest, SubmitStatus};
