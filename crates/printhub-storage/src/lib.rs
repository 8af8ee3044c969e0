//! # printhub-storage
//!
//! Spool store for PrintHub. Each user owns one directory under a shared
//! spool root holding raw job payloads and a JSON list of jobs not yet
//! claimed by a consumer.

pub mod layout;
pub mod payload;
pub mod pending;
pub mod platform;
pub mod store;

pub use payload::PayloadSource;
pub use store::SpoolStore;
