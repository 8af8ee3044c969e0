//! # printhub-core
//!
//! Core crate for PrintHub. Contains configuration schemas, the print job
//! record shared by producer and consumer, delivery events, the notification
//! receiver capability trait, and the unified error system.
//!
//! This crate has **no** internal dependencies on other PrintHub crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
