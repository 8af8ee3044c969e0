//! Spool store configuration.

use serde::{Deserialize, Serialize};

/// Per-user spool area configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpoolConfig {
    /// Shared root under which one directory per user is created.
    #[serde(default = "default_root_dir")]
    pub root_dir: String,
    /// File name of the pending-jobs index inside each user directory.
    #[serde(default = "default_pending_file")]
    pub pending_file: String,
    /// Chunk size in bytes used when streaming payloads to disk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size_bytes: usize,
    /// Maximum number of title characters kept in a payload file name.
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,
}

impl Default for SpoolConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            pending_file: default_pending_file(),
            chunk_size_bytes: default_chunk_size(),
            title_max_chars: default_title_max_chars(),
        }
    }
}

fn default_root_dir() -> String {
    "/tmp/printhub-spool".to_string()
}

fn default_pending_file() -> String {
    "pending_jobs.json".to_string()
}

fn default_chunk_size() -> usize {
    65_536 // 64 KiB
}

fn default_title_max_chars() -> usize {
    50
}
