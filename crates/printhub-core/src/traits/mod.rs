//! Core traits defined in `printhub-core` and implemented by other crates.

pub mod receiver;

pub use receiver::{NotificationReceiver, ReceivedJobSink};
