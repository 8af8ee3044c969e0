//! # printhub-service
//!
//! Job producer for PrintHub. Turns one print-job invocation into a durable
//! spooled payload plus a best-effort live notification, falling back to the
//! pending list and waking a consumer when nobody is listening.
//!
//! Dependencies are injected at construction time via `Arc` references.

pub mod job;

pub use job::{
    CommandLauncher, ConsumerLauncher, DisabledLauncher, JobProducer, SubmitRequest, SubmitStatus,
};
