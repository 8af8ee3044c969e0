//! # printhub-worker
//!
//! Long-running job consumer for PrintHub. Reconciles the persisted pending
//! list at startup, owns the notification receivers while running, surfaces
//! each job once as a [`ConsumerEvent`](printhub_core::events::ConsumerEvent),
//! and rewrites the pending list when the presentation layer acknowledges a
//! job.

pub mod consumer;
pub mod executor;
pub mod handlers;
pub mod ledger;
pub mod runner;
pub mod state;

pub use consumer::{JobAcknowledger, JobConsumer};
pub use executor::{JobHandler, JobOutcome};
pub use runner::ConsumerRunner;
pub use state::ConsumerState;
