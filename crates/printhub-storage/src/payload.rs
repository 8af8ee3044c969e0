//! Streaming payload writer.

use std::fmt;
use std::path::{Path, PathBuf};

use futures::stream::StreamExt;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use printhub_core::error::{AppError, ErrorKind};
use printhub_core::result::AppResult;

use crate::layout;

/// Where the raw print data for a job comes from.
pub enum PayloadSource {
    /// An existing file to copy.
    File(PathBuf),
    /// A live byte stream, typically the process's standard input.
    Reader(Box<dyn AsyncRead + Send + Unpin>),
}

impl PayloadSource {
    /// Read the payload from standard input.
    pub fn stdin() -> Self {
        Self::Reader(Box::new(tokio::io::stdin()))
    }

    /// Read the payload from any async reader.
    pub fn from_reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self::Reader(Box::new(reader))
    }

    async fn open(self) -> AppResult<Box<dyn AsyncRead + Send + Unpin>> {
        match self {
            Self::File(path) => {
                let file = fs::File::open(&path).await.map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        AppError::not_found(format!("Payload file not found: {}", path.display()))
                    } else {
                        AppError::with_source(
                            ErrorKind::Storage,
                            format!("Failed to open payload file: {}", path.display()),
                            e,
                        )
                    }
                })?;
                Ok(Box::new(file))
            }
            Self::Reader(reader) => Ok(reader),
        }
    }
}

impl fmt::Debug for PayloadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

/// Copy `source` into a new file in `dir` named after `stem`, in chunks of
/// at most `chunk_size` bytes. Returns the path and the byte count.
///
/// An existing file is never replaced: when `{stem}.pdf` is taken the next
/// free `{stem}_N.pdf` is used. The file is flushed and synced before
/// returning. On failure the partial file is removed so nothing ever
/// references truncated data.
pub async fn write_payload(
    source: PayloadSource,
    dir: &Path,
    stem: &str,
    chunk_size: usize,
) -> AppResult<(PathBuf, u64)> {
    let reader = source.open().await?;
    let (mut file, dest) = create_unique(dir, stem).await?;

    let result = async {
        let mut stream = ReaderStream::with_capacity(reader, chunk_size.max(1));
        let mut total_bytes = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                AppError::with_source(ErrorKind::Storage, "Payload read error", e)
            })?;
            total_bytes += chunk.len() as u64;
            file.write_all(&chunk).await.map_err(|e| {
                AppError::with_source(ErrorKind::Storage, "Failed to write payload chunk", e)
            })?;
        }

        file.flush().await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to flush payload file", e)
        })?;
        file.sync_all().await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to sync payload file", e)
        })?;
        Ok::<u64, AppError>(total_bytes)
    }
    .await;

    drop(file);

    match result {
        Ok(total_bytes) => {
            debug!(path = %dest.display(), bytes = total_bytes, "Wrote payload");
            Ok((dest, total_bytes))
        }
        Err(e) => {
            if let Err(remove_err) = fs::remove_file(&dest).await {
                warn!(
                    path = %dest.display(),
                    error = %remove_err,
                    "Failed to remove partial payload"
                );
            }
            Err(e)
        }
    }
}

/// Create the first candidate name for `stem` that does not exist yet.
async fn create_unique(dir: &Path, stem: &str) -> AppResult<(fs::File, PathBuf)> {
    let mut attempt = 0u32;
    loop {
        let dest = dir.join(layout::payload_file_name(stem, attempt));
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&dest)
            .await
        {
            Ok(file) => return Ok((file, dest)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                debug!(path = %dest.display(), "Payload name taken, trying next");
                attempt = attempt.checked_add(1).ok_or_else(|| {
                    AppError::new(ErrorKind::Storage, format!("No free payload name for {stem}"))
                })?;
            }
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create payload file: {}", dest.display()),
                    e,
                ));
            }
        }
    }
}
