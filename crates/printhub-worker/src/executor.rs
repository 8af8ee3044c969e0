//! Presentation-layer job handling.

use std::path::PathBuf;

use async_trait::async_trait;

use printhub_core::result::AppResult;
use printhub_core::types::PrintJob;

/// What a handler did with a job's payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Copied to a final destination.
    Saved(PathBuf),
    /// Left in the spool directory.
    Retained,
}

/// Reacts to one delivered job. The runner acknowledges the job afterwards
/// whatever the result.
#[async_trait]
pub trait JobHandler: Send + Sync + std::fmt::Debug {
    /// Short handler name for logs.
    fn name(&self) -> &str;

    /// Handle the job. On error the payload must be left in place.
    async fn handle(&self, job: &PrintJob) -> AppResult<JobOutcome>;
}
