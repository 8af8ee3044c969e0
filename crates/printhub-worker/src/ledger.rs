//! Record of jobs already surfaced during this process lifetime.

use std::collections::HashSet;
use std::sync::Mutex;

use printhub_core::types::PrintJob;

/// Suppresses a second event for a job that was already delivered, e.g. a
/// live notification for a job also replayed from the pending list.
#[derive(Debug, Default)]
pub struct DeliveryLedger {
    /// Keys of delivered jobs.
    seen: Mutex<HashSet<String>>,
}

impl DeliveryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `job`. Returns `true` if it had not been delivered before.
    pub fn record(&self, job: &PrintJob) -> bool {
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        seen.insert(job.key())
    }
}
