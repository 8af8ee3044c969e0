//! JSON encoding of job records and newline framing.

use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};

use printhub_core::error::{AppError, ErrorKind};
use printhub_core::result::AppResult;
use printhub_core::types::PrintJob;

use super::validator::validate_inbound;

/// Encode a job as one wire frame.
pub fn encode_job(job: &PrintJob) -> AppResult<Vec<u8>> {
    let mut frame = serde_json::to_vec(job)?;
    frame.push(b'\n');
    Ok(frame)
}

/// Decode one frame. Everything after the first `\n` is ignored.
pub fn decode_job(frame: &str, max_bytes: usize) -> AppResult<PrintJob> {
    let line = frame.split('\n').next().unwrap_or_default();
    validate_inbound(line, max_bytes)?;
    Ok(serde_json::from_str(line)?)
}

/// Read bytes until the first `\n` or end of stream and decode them.
///
/// There is no overall deadline; a silent sender stalls only this read.
pub async fn read_job<R>(reader: R, max_bytes: usize) -> AppResult<PrintJob>
where
    R: AsyncRead + Unpin,
{
    let mut frames = FramedRead::new(reader, LinesCodec::new_with_max_length(max_bytes));
    match frames.next().await {
        Some(Ok(line)) => decode_job(&line, max_bytes),
        Some(Err(LinesCodecError::MaxLineLengthExceeded)) => Err(AppError::validation(format!(
            "Message exceeds maximum size of {max_bytes} bytes"
        ))),
        Some(Err(LinesCodecError::Io(e))) => Err(AppError::with_source(
            ErrorKind::Transport,
            "Failed to read notification",
            e,
        )),
        None => Err(AppError::validation("Empty message")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> PrintJob {
        PrintJob::new(
            "42",
            "alice",
            "Invoice #42/2024",
            3,
            r#"media="A4" sides=two-sided"#,
            "/tmp/printhub-spool/alice/20240101_120000_42_Invoice__42_2024.pdf",
            "20240101_120000",
        )
    }

    #[test]
    fn test_encode_is_single_line() {
        let frame = encode_job(&job()).unwrap();
        assert_eq!(frame.last(), Some(&b'\n'));
        assert_eq!(frame.iter().filter(|b| **b == b'\n').count(), 1);
    }

    #[tokio::test]
    async fn test_read_job_preserves_all_fields() {
        let mut original = job();
        let frame = encode_job(&original).unwrap();
        assert_eq!(read_job(&frame[..], 65_536).await.unwrap(), original);

        original.options = String::new();
        let frame = encode_job(&original).unwrap();
        assert_eq!(read_job(&frame[..], 65_536).await.unwrap(), original);
    }

    #[tokio::test]
    async fn test_read_job_without_trailing_newline() {
        let frame = serde_json::to_vec(&job()).unwrap();
        assert_eq!(read_job(&frame[..], 65_536).await.unwrap(), job());
    }

    #[tokio::test]
    async fn test_read_job_ignores_bytes_after_newline() {
        let mut frame = encode_job(&job()).unwrap();
        frame.extend_from_slice(b"garbage that is not json");
        assert_eq!(read_job(&frame[..], 65_536).await.unwrap(), job());
    }

    #[tokio::test]
    async fn test_read_job_rejects_malformed_and_empty() {
        let err = read_job(&b"{\"job_id\": \n"[..], 65_536).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Serialization);

        let err = read_job(&b""[..], 65_536).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_read_job_rejects_oversized() {
        let frame = encode_job(&job()).unwrap();
        let err = read_job(&frame[..], 16).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn test_decode_job_defaults() {
        let decoded = decode_job(r#"{"job_id":"1","file_path":"/tmp/a.pdf"}"#, 1024).unwrap();
        assert_eq!(decoded.title, "Untitled");
        assert_eq!(decoded.copies, 1);
    }
}
