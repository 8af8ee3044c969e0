//! Copy payloads into an output directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tracing::{info, warn};

use printhub_core::error::{AppError, ErrorKind};
use printhub_core::result::AppResult;
use printhub_core::types::PrintJob;
use printhub_storage::SpoolStore;

use crate::executor::{JobHandler, JobOutcome};

/// Name used when a title has no usable characters.
const FALLBACK_NAME: &str = "document";

/// Saves each payload as `{title}.pdf` in a fixed directory.
#[derive(Debug)]
pub struct SaveHandler {
    output_dir: PathBuf,
    delete_after_save: bool,
    store: Arc<SpoolStore>,
}

impl SaveHandler {
    /// Create a handler writing into `output_dir`.
    pub fn new(output_dir: PathBuf, delete_after_save: bool, store: Arc<SpoolStore>) -> Self {
        Self {
            output_dir,
            delete_after_save,
            store,
        }
    }
}

#[async_trait]
impl JobHandler for SaveHandler {
    fn name(&self) -> &str {
        "save"
    }

    async fn handle(&self, job: &PrintJob) -> AppResult<JobOutcome> {
        if !job.payload_exists() {
            return Err(AppError::not_found(format!(
                "Payload for job {} is missing: {}",
                job.job_id,
                job.file_path.display()
            )));
        }

        fs::create_dir_all(&self.output_dir).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create output directory: {}", self.output_dir.display()),
                e,
            )
        })?;

        let dest = unique_destination(&self.output_dir, &display_safe_title(&job.title)).await;
        fs::copy(&job.file_path, &dest).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to save {} to {}", job.file_path.display(), dest.display()),
                e,
            )
        })?;
        info!(job_id = %job.job_id, path = %dest.display(), "Document saved");

        if self.delete_after_save {
            if let Err(e) = self.store.discard_payload(job).await {
                warn!(job_id = %job.job_id, error = %e, "Saved, but spool payload could not be removed");
            }
        }

        Ok(JobOutcome::Saved(dest))
    }
}

/// Keep alphanumerics, space, `.`, `_`, `-`; replace the rest with `_`.
pub fn display_safe_title(title: &str) -> String {
    let safe: String = title
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, ' ' | '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let safe = safe.trim();
    if safe.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        safe.to_string()
    }
}

/// First of `{stem}.pdf`, `{stem}_1.pdf`, `{stem}_2.pdf`, … that does not exist.
async fn unique_destination(dir: &Path, stem: &str) -> PathBuf {
    let mut candidate = dir.join(format!("{stem}.pdf"));
    let mut n = 1u32;
    while fs::try_exists(&candidate).await.unwrap_or(false) {
        candidate = dir.join(format!("{stem}_{n}.pdf"));
        n += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    use printhub_core::config::SpoolConfig;
    use printhub_storage::PayloadSource;

    #[test]
    fn test_display_safe_title() {
        assert_eq!(display_safe_title("Invoice #42/2024"), "Invoice _42_2024");
        assert_eq!(display_safe_title("  Report  "), "Report");
        assert_eq!(display_safe_title("   "), "document");
        assert_eq!(display_safe_title(""), "document");
    }

    async fn setup(dir: &Path) -> (Arc<SpoolStore>, PrintJob) {
        let store = Arc::new(SpoolStore::new(&SpoolConfig {
            root_dir: dir.join("spool").to_string_lossy().into_owned(),
            ..SpoolConfig::default()
        }));
        let path = store
            .write_payload(
                "alice",
                "1",
                "Report",
                "20240101_120000",
                PayloadSource::from_reader(&b"%PDF-1.4 body"[..]),
            )
            .await
            .unwrap();
        let job = PrintJob::new("1", "alice", "Report", 1, "", path, "20240101_120000");
        (store, job)
    }

    #[tokio::test]
    async fn test_save_copies_and_discards_payload() {
        let dir = tempfile::tempdir().unwrap();
        let (store, job) = setup(dir.path()).await;
        let handler = SaveHandler::new(dir.path().join("out"), true, store);

        let outcome = handler.handle(&job).await.unwrap();

        let expected = dir.path().join("out").join("Report.pdf");
        assert_eq!(outcome, JobOutcome::Saved(expected.clone()));
        assert_eq!(std::fs::read(&expected).unwrap(), b"%PDF-1.4 body");
        assert!(!job.file_path.exists());
    }

    #[tokio::test]
    async fn test_save_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let (store, job) = setup(dir.path()).await;
        let out = dir.path().join("out");
        std::fs::create_dir_all(&out).unwrap();
        std::fs::write(out.join("Report.pdf"), b"existing").unwrap();
        let handler = SaveHandler::new(out.clone(), false, store);

        let outcome = handler.handle(&job).await.unwrap();

        assert_eq!(outcome, JobOutcome::Saved(out.join("Report_1.pdf")));
        assert_eq!(std::fs::read(out.join("Report.pdf")).unwrap(), b"existing");
        assert!(job.file_path.exists());
    }

    #[tokio::test]
    async fn test_missing_payload_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let (store, job) = setup(dir.path()).await;
        store.discard_payload(&job).await.unwrap();
        let handler = SaveHandler::new(dir.path().join("out"), true, store);

        let err = handler.handle(&job).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
