//! Local-domain socket receiver.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UnixListener;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use printhub_core::config::ChannelConfig;
use printhub_core::error::{AppError, ErrorKind};
use printhub_core::result::AppResult;
use printhub_core::traits::{NotificationReceiver, ReceivedJobSink};
use printhub_core::types::Transport;

use super::handle_connection;

/// Socket file mode: any local account may connect.
pub const SOCKET_MODE: u32 = 0o666;

/// Accepts job notifications on a Unix stream socket.
#[derive(Debug)]
pub struct UnixReceiver {
    listener: UnixListener,
    path: PathBuf,
    poll_interval: Duration,
    max_message_bytes: usize,
}

impl UnixReceiver {
    /// Bind the configured socket path.
    ///
    /// A stale socket left by a dead listener is replaced. Fails if a live
    /// listener already owns the path or the path is not a socket.
    pub async fn bind(config: &ChannelConfig) -> AppResult<Self> {
        let path = PathBuf::from(&config.socket_path);
        cleanup_socket(&path)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    AppError::with_source(
                        ErrorKind::Transport,
                        format!("Failed to create socket directory {}", parent.display()),
                        e,
                    )
                })?;
            }
        }

        let listener = UnixListener::bind(&path).map_err(|e| {
            AppError::with_source(
                ErrorKind::Transport,
                format!("Failed to bind Unix receiver on {}", path.display()),
                e,
            )
        })?;
        set_socket_permissions(&path)?;

        info!(path = %path.display(), "Unix receiver listening");
        Ok(Self {
            listener,
            path,
            poll_interval: config.poll_interval(),
            max_message_bytes: config.max_message_bytes,
        })
    }

    /// Socket path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl NotificationReceiver for UnixReceiver {
    fn transport(&self) -> Transport {
        Transport::Unix
    }

    async fn serve(self: Box<Self>, sink: ReceivedJobSink, mut shutdown: watch::Receiver<bool>) {
        while !*shutdown.borrow() {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                accepted = tokio::time::timeout(self.poll_interval, self.listener.accept()) => {
                    match accepted {
                        Ok(Ok((stream, _))) => {
                            let sink = sink.clone();
                            let max = self.max_message_bytes;
                            tokio::spawn(handle_connection(
                                stream,
                                Transport::Unix,
                                "local".to_string(),
                                max,
                                sink,
                            ));
                        }
                        Ok(Err(e)) => warn!(error = %e, "Unix accept failed"),
                        Err(_) => {}
                    }
                }
            }
        }

        let Self { listener, path, .. } = *self;
        drop(listener);
        if let Err(e) = std::fs::remove_file(&path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "Failed to remove socket file");
            }
        }
        debug!(path = %path.display(), "Unix receiver stopped");
    }
}

/// Remove a stale socket file if it exists.
fn cleanup_socket(path: &Path) -> AppResult<()> {
    use std::os::unix::fs::FileTypeExt;

    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            return Err(AppError::with_source(
                ErrorKind::Transport,
                format!("Failed to stat {}", path.display()),
                e,
            ));
        }
    };

    if !metadata.file_type().is_socket() {
        return Err(AppError::transport(format!(
            "Path {} exists but is not a socket",
            path.display()
        )));
    }

    if std::os::unix::net::UnixStream::connect(path).is_ok() {
        return Err(AppError::transport(format!(
            "Another listener is already serving {}",
            path.display()
        )));
    }

    std::fs::remove_file(path).map_err(|e| {
        AppError::with_source(
            ErrorKind::Transport,
            format!("Failed to remove stale socket {}", path.display()),
            e,
        )
    })?;

    debug!(path = %path.display(), "Removed stale socket file");
    Ok(())
}

fn set_socket_permissions(path: &Path) -> AppResult<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(SOCKET_MODE)).map_err(|e| {
        AppError::with_source(
            ErrorKind::Transport,
            format!("Failed to set socket permissions on {}", path.display()),
            e,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::os::unix::fs::PermissionsExt;

    use tokio::io::AsyncWriteExt;
    use tokio::net::UnixStream;
    use tokio::sync::mpsc;

    use printhub_core::types::PrintJob;

    use crate::message::encode_job;

    fn config(dir: &Path) -> ChannelConfig {
        ChannelConfig {
            socket_path: dir.join("printhub.sock").to_string_lossy().into_owned(),
            poll_interval_ms: 50,
            ..ChannelConfig::default()
        }
    }

    #[tokio::test]
    async fn test_socket_is_world_connectable_and_removed_on_stop() {
        let dir = tempfile::tempdir().unwrap();
        let receiver = UnixReceiver::bind(&config(dir.path())).await.unwrap();
        let path = receiver.path().to_path_buf();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, SOCKET_MODE);

        let (sink, _jobs) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(Box::new(receiver).serve(sink, shutdown_rx));

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_receives_job() {
        let dir = tempfile::tempdir().unwrap();
        let receiver = UnixReceiver::bind(&config(dir.path())).await.unwrap();
        let path = receiver.path().to_path_buf();
        let (sink, mut jobs) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(Box::new(receiver).serve(sink, shutdown_rx));

        let job = PrintJob::new("9", "alice", "Doc", 2, "", "/tmp/9.pdf", "20240101_120000");
        let mut stream = UnixStream::connect(&path).await.unwrap();
        stream.write_all(&encode_job(&job).unwrap()).await.unwrap();
        drop(stream);

        let received = tokio::time::timeout(Duration::from_secs(5), jobs.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.job, job);
        assert_eq!(received.transport, Transport::Unix);

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_replaces_stale_socket() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let stale = std::os::unix::net::UnixListener::bind(&config.socket_path).unwrap();
        drop(stale);
        assert!(Path::new(&config.socket_path).exists());

        let receiver = UnixReceiver::bind(&config).await.unwrap();
        assert_eq!(receiver.path(), Path::new(&config.socket_path));
    }

    #[tokio::test]
    async fn test_refuses_live_socket_and_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let _live = UnixReceiver::bind(&config).await.unwrap();
        let err = UnixReceiver::bind(&config).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Transport);

        let other = ChannelConfig {
            socket_path: dir.path().join("plain").to_string_lossy().into_owned(),
            ..config
        };
        std::fs::write(&other.socket_path, b"data").unwrap();
        let err = UnixReceiver::bind(&other).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Transport);
        assert!(Path::new(&other.socket_path).exists());
    }
}
