//! Leave payloads in the spool directory.

use async_trait::async_trait;
use tracing::info;

use printhub_core::result::AppResult;
use printhub_core::types::PrintJob;

use crate::executor::{JobHandler, JobOutcome};

/// Keeps every payload where the producer stored it.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetainHandler;

#[async_trait]
impl JobHandler for RetainHandler {
    fn name(&self) -> &str {
        "retain"
    }

    async fn handle(&self, job: &PrintJob) -> AppResult<JobOutcome> {
        info!(
            job_id = %job.job_id,
            title = %job.title,
            path = %job.file_path.display(),
            "Payload retained in spool"
        );
        Ok(JobOutcome::Retained)
    }
}
