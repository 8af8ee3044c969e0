//! Per-user spool store.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use printhub_core::config::SpoolConfig;
use printhub_core::error::{AppError, ErrorKind};
use printhub_core::result::AppResult;
use printhub_core::types::PrintJob;

use crate::layout;
use crate::payload::{self, PayloadSource};
use crate::pending::PendingFile;
use crate::platform;

/// Durable storage of job payloads and the pending-job list, one directory
/// per user under a shared root.
#[derive(Debug, Clone)]
pub struct SpoolStore {
    root: PathBuf,
    pending_file: String,
    chunk_size: usize,
    title_max_chars: usize,
}

impl SpoolStore {
    /// Create a store from configuration. Nothing is touched on disk until
    /// a user directory is resolved.
    pub fn new(config: &SpoolConfig) -> Self {
        Self {
            root: PathBuf::from(&config.root_dir),
            pending_file: config.pending_file.clone(),
            chunk_size: config.chunk_size_bytes,
            title_max_chars: config.title_max_chars,
        }
    }

    /// Deterministic spool directory for `user`, without creating it.
    pub fn spool_dir(&self, user: &str) -> AppResult<PathBuf> {
        layout::validate_user(user)?;
        Ok(self.root.join(user))
    }

    /// Location of `user`'s pending list.
    pub fn pending_path(&self, user: &str) -> AppResult<PathBuf> {
        Ok(self.spool_dir(user)?.join(&self.pending_file))
    }

    /// Create `user`'s spool directory if needed and open it up to that
    /// account. Mode and ownership adjustments are best-effort.
    pub async fn resolve_spool_dir(&self, user: &str) -> AppResult<PathBuf> {
        let dir = self.spool_dir(user)?;

        if !self.root.is_dir() {
            fs::create_dir_all(&self.root).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create spool root: {}", self.root.display()),
                    e,
                )
            })?;
            platform::share_dir(&self.root, None);
        }

        if !dir.is_dir() {
            fs::create_dir_all(&dir).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create spool directory: {}", dir.display()),
                    e,
                )
            })?;
            debug!(user, path = %dir.display(), "Created spool directory");
        }
        platform::share_dir(&dir, platform::lookup_account(user).as_ref());

        Ok(dir)
    }

    /// Stream a payload into `user`'s spool directory and return its path.
    ///
    /// The file is fully written and closed before this returns. Any failure
    /// is fatal to the submission and leaves no file behind. An existing
    /// payload with the same name is kept and a numbered name is used.
    pub async fn write_payload(
        &self,
        user: &str,
        job_id: &str,
        title: &str,
        timestamp: &str,
        source: PayloadSource,
    ) -> AppResult<PathBuf> {
        let dir = self.resolve_spool_dir(user).await?;
        let stem = layout::payload_stem(timestamp, job_id, title, self.title_max_chars);

        let (path, bytes) = payload::write_payload(source, &dir, &stem, self.chunk_size).await?;
        platform::share_file(&path, platform::lookup_account(user).as_ref());

        info!(user, job_id, path = %path.display(), bytes, "Stored job payload");
        Ok(path)
    }

    /// Append `job` to the end of `user`'s pending list.
    pub async fn append_pending(&self, user: &str, job: &PrintJob) -> AppResult<()> {
        let job = job.clone();
        let count = self
            .update_pending(user, move |jobs| {
                jobs.push(job);
                jobs.len()
            })
            .await?;
        debug!(user, pending = count, "Appended pending job");
        Ok(())
    }

    /// Read and delete `user`'s pending list.
    ///
    /// Records whose payload no longer exists are dropped. A malformed or
    /// unreadable list reads as empty.
    pub async fn load_pending(&self, user: &str) -> AppResult<Vec<PrintJob>> {
        if !self.spool_dir(user)?.is_dir() {
            return Ok(Vec::new());
        }
        let pending = self.pending_for(user)?;
        let jobs = run_blocking(move || pending.take()).await?;

        let total = jobs.len();
        let jobs: Vec<PrintJob> = jobs
            .into_iter()
            .filter(|job| {
                let exists = job.payload_exists();
                if !exists {
                    debug!(user, job_id = %job.job_id, path = %job.file_path.display(), "Skipping pending job without payload");
                }
                exists
            })
            .collect();

        if total > 0 {
            info!(user, loaded = jobs.len(), skipped = total - jobs.len(), "Loaded pending jobs");
        }
        Ok(jobs)
    }

    /// Delete `user`'s pending list.
    pub async fn clear_pending(&self, user: &str) -> AppResult<()> {
        if !self.spool_dir(user)?.is_dir() {
            return Ok(());
        }
        let pending = self.pending_for(user)?;
        run_blocking(move || pending.clear()).await
    }

    /// Locked read-modify-write of `user`'s pending list.
    pub async fn update_pending<F, R>(&self, user: &str, f: F) -> AppResult<R>
    where
        F: FnOnce(&mut Vec<PrintJob>) -> R + Send + 'static,
        R: Send + 'static,
    {
        self.resolve_spool_dir(user).await?;
        let pending = self.pending_for(user)?;
        run_blocking(move || pending.update(f)).await
    }

    /// Whether `path` is a regular payload file directly inside `user`'s
    /// spool directory. Symlinks are resolved before the check.
    pub async fn owns_payload(&self, user: &str, path: &Path) -> bool {
        let Ok(dir) = self.spool_dir(user) else {
            return false;
        };
        let (Ok(dir), Ok(file)) = (fs::canonicalize(&dir).await, fs::canonicalize(path).await)
        else {
            return false;
        };
        let is_payload = file
            .extension()
            .is_some_and(|ext| ext == layout::PAYLOAD_EXTENSION);
        let is_file = fs::metadata(&file).await.is_ok_and(|m| m.is_file());
        file.parent() == Some(dir.as_path()) && is_payload && is_file
    }

    /// Delete a job's payload file. A file that is already gone is not an
    /// error. Paths outside the job owner's spool directory are refused.
    pub async fn discard_payload(&self, job: &PrintJob) -> AppResult<()> {
        if !fs::try_exists(&job.file_path).await.unwrap_or(true) {
            return Ok(());
        }
        if !self.owns_payload(&job.user, &job.file_path).await {
            return Err(AppError::validation(format!(
                "Refusing to delete file outside {}'s spool: {}",
                job.user,
                job.file_path.display()
            )));
        }
        match fs::remove_file(&job.file_path).await {
            Ok(()) => {
                debug!(job_id = %job.job_id, path = %job.file_path.display(), "Discarded payload");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to delete payload: {}", job.file_path.display()),
                e,
            )),
        }
    }

    fn pending_for(&self, user: &str) -> AppResult<PendingFile> {
        Ok(PendingFile::new(
            self.pending_path(user)?,
            platform::lookup_account(user),
        ))
    }
}

async fn run_blocking<T: Send + 'static>(
    f: impl FnOnce() -> AppResult<T> + Send + 'static,
) -> AppResult<T> {
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Internal, "Pending list task failed", e))?
}
