//! Producer side of the notification channel.

use std::path::PathBuf;
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{debug, info};

use printhub_core::config::ChannelConfig;
use printhub_core::error::{AppError, ErrorKind};
use printhub_core::result::AppResult;
use printhub_core::types::{PrintJob, Transport};

use crate::message::encode_job;

/// Sends one job record to a live consumer, trying the Unix socket first
/// and loopback TCP second.
#[derive(Debug, Clone)]
pub struct NotificationSender {
    socket_path: Option<PathBuf>,
    tcp_addr: Option<String>,
    timeout: Duration,
}

impl NotificationSender {
    /// Create a sender for the enabled transports.
    pub fn new(config: &ChannelConfig) -> Self {
        Self {
            socket_path: (cfg!(unix) && config.enable_unix)
                .then(|| PathBuf::from(&config.socket_path)),
            tcp_addr: config.enable_tcp.then(|| config.tcp_addr()),
            timeout: config.connect_timeout(),
        }
    }

    /// Deliver `job` once. Returns the transport that carried it, or `None`
    /// when no listener was reachable. Failures are expected whenever no
    /// consumer runs and are only logged at debug level.
    pub async fn deliver(&self, job: &PrintJob) -> Option<Transport> {
        let frame = match encode_job(job) {
            Ok(frame) => frame,
            Err(e) => {
                debug!(job_id = %job.job_id, error = %e, "Failed to encode job");
                return None;
            }
        };

        if let Some(path) = &self.socket_path {
            if path.exists() {
                match self.send_unix(path, &frame).await {
                    Ok(()) => {
                        info!(job_id = %job.job_id, transport = %Transport::Unix, "Job delivered");
                        return Some(Transport::Unix);
                    }
                    Err(e) => debug!(job_id = %job.job_id, error = %e, "Unix delivery failed"),
                }
            }
        }

        if let Some(addr) = &self.tcp_addr {
            match self.send_tcp(addr, &frame).await {
                Ok(()) => {
                    info!(job_id = %job.job_id, transport = %Transport::Tcp, "Job delivered");
                    return Some(Transport::Tcp);
                }
                Err(e) => debug!(job_id = %job.job_id, error = %e, "TCP delivery failed"),
            }
        }

        None
    }

    #[cfg(unix)]
    async fn send_unix(&self, path: &std::path::Path, frame: &[u8]) -> AppResult<()> {
        let stream = timeout(self.timeout, tokio::net::UnixStream::connect(path))
            .await
            .map_err(|_| AppError::transport(format!("Timed out connecting to {}", path.display())))?
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Transport,
                    format!("Failed to connect to {}", path.display()),
                    e,
                )
            })?;
        self.send_frame(stream, frame).await
    }

    #[cfg(not(unix))]
    async fn send_unix(&self, path: &std::path::Path, _frame: &[u8]) -> AppResult<()> {
        Err(AppError::transport(format!(
            "Unix sockets are unavailable for {}",
            path.display()
        )))
    }

    async fn send_tcp(&self, addr: &str, frame: &[u8]) -> AppResult<()> {
        let stream = timeout(self.timeout, tokio::net::TcpStream::connect(addr))
            .await
            .map_err(|_| AppError::transport(format!("Timed out connecting to {addr}")))?
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Transport,
                    format!("Failed to connect to {addr}"),
                    e,
                )
            })?;
        self.send_frame(stream, frame).await
    }

    async fn send_frame<S>(&self, mut stream: S, frame: &[u8]) -> AppResult<()>
    where
        S: AsyncWrite + Unpin,
    {
        let write = async {
            stream.write_all(frame).await?;
            stream.shutdown().await
        };
        timeout(self.timeout, write)
            .await
            .map_err(|_| AppError::transport("Timed out sending notification"))?
            .map_err(|e| AppError::with_source(ErrorKind::Transport, "Failed to send notification", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::sync::{mpsc, watch};

    use printhub_core::traits::NotificationReceiver;

    use crate::receiver::tcp::TcpReceiver;

    fn job() -> PrintJob {
        PrintJob::new("5", "alice", "Doc", 1, "", "/tmp/5.pdf", "20240101_120000")
    }

    #[tokio::test]
    async fn test_no_listener_is_not_delivered() {
        let dir = tempfile::tempdir().unwrap();
        let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = probe.local_addr().unwrap().port();
        drop(probe);

        let sender = NotificationSender::new(&ChannelConfig {
            socket_path: dir.path().join("absent.sock").to_string_lossy().into_owned(),
            tcp_port: port,
            connect_timeout_ms: 500,
            ..ChannelConfig::default()
        });

        assert_eq!(sender.deliver(&job()).await, None);
    }

    #[tokio::test]
    async fn test_falls_back_to_tcp_when_socket_absent() {
        let dir = tempfile::tempdir().unwrap();
        let config = ChannelConfig {
            socket_path: dir.path().join("absent.sock").to_string_lossy().into_owned(),
            tcp_port: 0,
            poll_interval_ms: 50,
            ..ChannelConfig::default()
        };
        let receiver = TcpReceiver::bind(&config).await.unwrap();
        let sender = NotificationSender::new(&ChannelConfig {
            tcp_port: receiver.local_addr().port(),
            ..config
        });
        let (sink, mut jobs) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(Box::new(receiver).serve(sink, shutdown_rx));

        assert_eq!(sender.deliver(&job()).await, Some(Transport::Tcp));
        let received = timeout(Duration::from_secs(5), jobs.recv()).await.unwrap().unwrap();
        assert_eq!(received.job, job());

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_prefers_unix_socket() {
        use crate::receiver::unix::UnixReceiver;

        let dir = tempfile::tempdir().unwrap();
        let config = ChannelConfig {
            socket_path: dir.path().join("printhub.sock").to_string_lossy().into_owned(),
            tcp_port: 0,
            poll_interval_ms: 50,
            ..ChannelConfig::default()
        };
        let receiver = UnixReceiver::bind(&config).await.unwrap();
        let sender = NotificationSender::new(&config);
        let (sink, mut jobs) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(Box::new(receiver).serve(sink, shutdown_rx));

        assert_eq!(sender.deliver(&job()).await, Some(Transport::Unix));
        let received = timeout(Duration::from_secs(5), jobs.recv()).await.unwrap().unwrap();
        assert_eq!(received.transport, Transport::Unix);

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
    }
}
