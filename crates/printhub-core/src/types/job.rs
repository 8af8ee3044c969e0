//! The print job record exchanged between producer and consumer.
//!
//! The same JSON object shape is used on the wire (one object per
//! connection, newline-terminated) and inside the per-user pending list.

use std::path::PathBuf;

use chrono::Local;
use serde::{Deserialize, Serialize};

/// `strftime` pattern for job timestamps. Lexicographic order matches
/// chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Metadata for one captured print job.
///
/// `processed` is consumer-local: it is never serialized, and a decoded
/// record always starts unprocessed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintJob {
    /// Producer-assigned or printing-subsystem job identifier.
    pub job_id: String,
    /// Owning account name.
    #[serde(default)]
    pub user: String,
    /// Display title; may contain arbitrary characters.
    #[serde(default = "default_title")]
    pub title: String,
    /// Requested copy count.
    #[serde(default = "default_copies")]
    pub copies: u32,
    /// Opaque printing options string.
    #[serde(default)]
    pub options: String,
    /// Absolute path of the payload inside the owner's spool directory.
    pub file_path: PathBuf,
    /// Creation time formatted with [`TIMESTAMP_FORMAT`].
    #[serde(default = "current_timestamp")]
    pub timestamp: String,
    /// Set once the presentation layer acknowledged the job.
    #[serde(skip)]
    pub processed: bool,
}

impl PrintJob {
    /// Build a fresh, unprocessed job record.
    pub fn new(
        job_id: impl Into<String>,
        user: impl Into<String>,
        title: impl Into<String>,
        copies: u32,
        options: impl Into<String>,
        file_path: impl Into<PathBuf>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            user: user.into(),
            title: title.into(),
            copies: copies.max(1),
            options: options.into(),
            file_path: file_path.into(),
            timestamp: timestamp.into(),
            processed: false,
        }
    }

    /// Identity used to recognize the same job arriving twice.
    pub fn key(&self) -> String {
        format!("{}:{}", self.job_id, self.file_path.display())
    }

    /// Whether this record refers to the same job as `other`.
    pub fn same_job(&self, other: &PrintJob) -> bool {
        self.job_id == other.job_id && self.file_path == other.file_path
    }

    /// Whether the payload file still exists.
    pub fn payload_exists(&self) -> bool {
        self.file_path.is_file()
    }
}

/// Current local time formatted with [`TIMESTAMP_FORMAT`].
pub fn current_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

fn default_title() -> String {
    "Untitled".to_string()
}

fn default_copies() -> u32 {
    1
}
