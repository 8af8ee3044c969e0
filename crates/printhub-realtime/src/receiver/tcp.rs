//! Loopback TCP receiver.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use printhub_core::config::ChannelConfig;
use printhub_core::error::{AppError, ErrorKind};
use printhub_core::result::AppResult;
use printhub_core::traits::{NotificationReceiver, ReceivedJobSink};
use printhub_core::types::Transport;

use super::handle_connection;

/// Accepts job notifications on a loopback TCP port.
#[derive(Debug)]
pub struct TcpReceiver {
    listener: TcpListener,
    local_addr: SocketAddr,
    poll_interval: Duration,
    max_message_bytes: usize,
}

impl TcpReceiver {
    /// Bind `tcp_host:tcp_port`. Non-loopback hosts are rejected.
    pub async fn bind(config: &ChannelConfig) -> AppResult<Self> {
        let ip: IpAddr = config.tcp_host.parse().map_err(|_| {
            AppError::validation(format!("Invalid TCP host '{}'", config.tcp_host))
        })?;
        if !ip.is_loopback() {
            return Err(AppError::validation(format!(
                "TCP receiver must bind a loopback address, got {ip}"
            )));
        }

        let addr = SocketAddr::new(ip, config.tcp_port);
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Transport,
                format!("Failed to bind TCP receiver on {addr}"),
                e,
            )
        })?;
        let local_addr = listener.local_addr()?;

        info!(addr = %local_addr, "TCP receiver listening");
        Ok(Self {
            listener,
            local_addr,
            poll_interval: config.poll_interval(),
            max_message_bytes: config.max_message_bytes,
        })
    }

    /// Address actually bound.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

#[async_trait]
impl NotificationReceiver for TcpReceiver {
    fn transport(&self) -> Transport {
        Transport::Tcp
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
                        Ok(Ok((stream, peer))) => {
                            let sink = sink.clone();
                            let max = self.max_message_bytes;
                            tokio::spawn(handle_connection(
                                stream,
                                Transport::Tcp,
                                peer.to_string(),
                                max,
                                sink,
                            ));
                        }
                        Ok(Err(e)) => warn!(error = %e, "TCP accept failed"),
                        Err(_) => {}
                    }
                }
            }
        }

        debug!(addr = %self.local_addr, "TCP receiver stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;
    use tokio::sync::mpsc;

    use printhub_core::types::PrintJob;

    use crate::message::encode_job;

    fn config() -> ChannelConfig {
        ChannelConfig {
            tcp_port: 0,
            poll_interval_ms: 50,
            ..ChannelConfig::default()
        }
    }

    #[tokio::test]
    async fn test_rejects_non_loopback_host() {
        let config = ChannelConfig {
            tcp_host: "0.0.0.0".to_string(),
            ..config()
        };
        let err = TcpReceiver::bind(&config).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_receives_job_and_survives_malformed_input() {
        let receiver = TcpReceiver::bind(&config()).await.unwrap();
        let addr = receiver.local_addr();
        let (sink, mut jobs) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(Box::new(receiver).serve(sink, shutdown_rx));

        let mut bad = TcpStream::connect(addr).await.unwrap();
        bad.write_all(b"not json\n").await.unwrap();
        drop(bad);

        let job = PrintJob::new("7", "alice", "Doc", 1, "", "/tmp/7.pdf", "20240101_120000");
        let mut good = TcpStream::connect(addr).await.unwrap();
        good.write_all(&encode_job(&job).unwrap()).await.unwrap();
        drop(good);

        let received = tokio::time::timeout(Duration::from_secs(5), jobs.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.job, job);
        assert_eq!(received.transport, Transport::Tcp);

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert!(jobs.try_recv().is_err());
    }
}
