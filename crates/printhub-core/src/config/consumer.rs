//! Job consumer configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// What the headless listener does with each delivered job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsumerAction {
    /// Copy the payload into the output directory.
    Save,
    /// Leave the payload in the spool directory for later use.
    Retain,
}

/// Long-running job consumer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerConfig {
    /// Handling applied to delivered jobs.
    #[serde(default = "default_action")]
    pub action: ConsumerAction,
    /// Destination directory for saved documents (empty = `$HOME/Documents/PDFs`).
    #[serde(default)]
    pub output_dir: String,
    /// Remove the spool payload after it was saved successfully.
    #[serde(default = "default_true")]
    pub delete_after_save: bool,
    /// Persist live-delivered jobs to the pending list on receipt.
    #[serde(default)]
    pub persist_live_jobs: bool,
    /// Seconds to wait for accept loops to exit on shutdown.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
}

impl ConsumerConfig {
    /// Resolve the output directory, defaulting below the given home directory.
    pub fn resolve_output_dir(&self, home: Option<PathBuf>) -> PathBuf {
        if !self.output_dir.is_empty() {
            return PathBuf::from(&self.output_dir);
        }
        home.unwrap_or_else(std::env::temp_dir)
            .join("Documents")
            .join("PDFs")
    }
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            action: default_action(),
            output_dir: String::new(),
            delete_after_save: true,
            persist_live_jobs: false,
            shutdown_grace_seconds: default_shutdown_grace(),
        }
    }
}

fn default_action() -> ConsumerAction {
    ConsumerAction::Save
}

fn default_true() -> bool {
    true
}

fn default_shutdown_grace() -> u64 {
    5
}
