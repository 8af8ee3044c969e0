//! Blocking primitives for the per-user pending-job list.
//!
//! The list is a JSON array of job records. Every mutation replaces the file
//! atomically (temporary file in the same directory, then rename) while an
//! exclusive advisory lock on a sibling `.lock` file is held, so producers
//! and the consumer never interleave their read-modify-write cycles. An empty
//! list is represented by the file's absence.
//!
//! These functions block; [`crate::SpoolStore`] runs them on the blocking
//! thread pool.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use printhub_core::error::{AppError, ErrorKind};
use printhub_core::result::AppResult;
use printhub_core::types::PrintJob;

use crate::platform::{self, Account};

/// The pending list of one user plus its lock file.
#[derive(Debug, Clone)]
pub struct PendingFile {
    path: PathBuf,
    lock_path: PathBuf,
    owner: Option<Account>,
}

/// Held for the duration of one read-modify-write cycle.
#[cfg(unix)]
type LockGuard = nix::fcntl::Flock<File>;

#[cfg(not(unix))]
type LockGuard = File;

impl PendingFile {
    /// Describe the pending list stored at `path`.
    pub fn new(path: PathBuf, owner: Option<Account>) -> Self {
        let mut lock_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        lock_name.push(".lock");
        let lock_path = path.with_file_name(lock_name);
        Self {
            path,
            lock_path,
            owner,
        }
    }

    /// Run `f` over the current list under the lock and persist the result.
    pub fn update<R>(&self, f: impl FnOnce(&mut Vec<PrintJob>) -> R) -> AppResult<R> {
        let _guard = self.lock();
        let mut jobs = self.read().unwrap_or_default();
        let result = f(&mut jobs);
        self.write(&jobs)?;
        Ok(result)
    }

    /// Read the list and delete the file when the read succeeded.
    ///
    /// A malformed or unreadable file is reported as empty and left alone.
    pub fn take(&self) -> AppResult<Vec<PrintJob>> {
        let _guard = self.lock();
        let Some(jobs) = self.read() else {
            return Ok(Vec::new());
        };
        self.remove()?;
        Ok(jobs)
    }

    /// Delete the list.
    pub fn clear(&self) -> AppResult<()> {
        let _guard = self.lock();
        self.remove()
    }

    /// Parse the list. `None` means nothing usable could be read; a missing
    /// file is `Some(empty)`.
    fn read(&self) -> Option<Vec<PrintJob>> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Some(Vec::new()),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Pending list unreadable, treating as empty");
                return None;
            }
        };

        let records: Vec<serde_json::Value> = match serde_json::from_slice(&data) {
            Ok(records) => records,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Pending list malformed, treating as empty");
                return None;
            }
        };

        let jobs = records
            .into_iter()
            .filter_map(|record| match serde_json::from_value::<PrintJob>(record) {
                Ok(job) => Some(job),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Skipping malformed pending record");
                    None
                }
            })
            .collect();
        Some(jobs)
    }

    fn write(&self, jobs: &[PrintJob]) -> AppResult<()> {
        if jobs.is_empty() {
            return self.remove();
        }

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::Builder::new()
            .prefix(".pending-")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create temporary pending list in {}", dir.display()),
                    e,
                )
            })?;

        let data = serde_json::to_vec_pretty(jobs)?;
        tmp.write_all(&data)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| {
                AppError::with_source(ErrorKind::Storage, "Failed to write pending list", e)
            })?;

        platform::share_file(tmp.path(), self.owner.as_ref());

        tmp.persist(&self.path).map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to replace pending list {}", self.path.display()),
                e.error,
            )
        })?;

        debug!(path = %self.path.display(), jobs = jobs.len(), "Pending list written");
        Ok(())
    }

    fn remove(&self) -> AppResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Pending list removed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to remove pending list {}", self.path.display()),
                e,
            )),
        }
    }

    /// Acquire the exclusive lock. When the lock file cannot be opened or
    /// locked the caller proceeds unlocked.
    fn lock(&self) -> Option<LockGuard> {
        let file = match self.open_lock_file() {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %self.lock_path.display(), error = %e, "Pending list lock unavailable");
                return None;
            }
        };

        acquire(file, &self.lock_path)
    }

    fn open_lock_file(&self) -> io::Result<File> {
        let mut options = OpenOptions::new();
        options.read(true).write(true).create(true).truncate(false);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(platform::LOCK_FILE_MODE);
        }

        match options.open(&self.lock_path) {
            Ok(file) => {
                // umask may have narrowed the mode.
                let _ = platform::set_mode(&self.lock_path, platform::LOCK_FILE_MODE);
                Ok(file)
            }
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => File::open(&self.lock_path),
            Err(e) => Err(e),
        }
    }
}

#[cfg(unix)]
fn acquire(file: File, lock_path: &Path) -> Option<LockGuard> {
    use nix::fcntl::{Flock, FlockArg};
    match Flock::lock(file, FlockArg::LockExclusive) {
        Ok(guard) => Some(guard),
        Err((_, errno)) => {
            warn!(path = %lock_path.display(), error = %errno, "Failed to lock pending list");
            None
        }
    }
}

#[cfg(not(unix))]
fn acquire(file: File, _lock_path: &Path) -> Option<LockGuard> {
    Some(file)
}
