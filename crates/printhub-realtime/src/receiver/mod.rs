//! Notification receivers, one per transport.

pub mod tcp;
#[cfg(unix)]
pub mod unix;

use tokio::io::AsyncRead;
use tracing::{debug, info, warn};

use printhub_core::config::ChannelConfig;
use printhub_core::error::AppError;
use printhub_core::result::AppResult;
use printhub_core::traits::{NotificationReceiver, ReceivedJobSink};
use printhub_core::types::{ReceivedJob, Transport};

use crate::message::read_job;

/// Bind every enabled transport.
///
/// A transport that fails to bind is logged and omitted. Fails when no
/// transport could be bound at all.
pub async fn bind_all(config: &ChannelConfig) -> AppResult<Vec<Box<dyn NotificationReceiver>>> {
    let mut receivers: Vec<Box<dyn NotificationReceiver>> = Vec::new();

    #[cfg(unix)]
    {
        if config.enable_unix {
            match unix::UnixReceiver::bind(config).await {
                Ok(receiver) => receivers.push(Box::new(receiver)),
                Err(e) => warn!(path = %config.socket_path, error = %e, "Unix receiver unavailable"),
            }
        }
    }

    if config.enable_tcp {
        match tcp::TcpReceiver::bind(config).await {
            Ok(receiver) => receivers.push(Box::new(receiver)),
            Err(e) => warn!(addr = %config.tcp_addr(), error = %e, "TCP receiver unavailable"),
        }
    }

    if receivers.is_empty() {
        return Err(AppError::transport(
            "No notification receiver could be bound",
        ));
    }

    info!(
        transports = ?receivers.iter().map(|r| r.transport()).collect::<Vec<_>>(),
        "Notification receivers bound"
    );
    Ok(receivers)
}

/// Read one job from an accepted connection and forward it.
///
/// Malformed input is logged and dropped.
pub(crate) async fn handle_connection<S>(
    stream: S,
    transport: Transport,
    peer: String,
    max_message_bytes: usize,
    sink: ReceivedJobSink,
) where
    S: AsyncRead + Unpin,
{
    match read_job(stream, max_message_bytes).await {
        Ok(job) => {
            debug!(%transport, peer = %peer, job_id = %job.job_id, "Received job notification");
            if sink.send(ReceivedJob { job, transport }).is_err() {
                debug!(%transport, "Job sink closed, dropping notification");
            }
        }
        Err(e) => {
            warn!(%transport, peer = %peer, error = %e, "Dropping malformed notification");
        }
    }
}
