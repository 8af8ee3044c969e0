//! Job capture invocation.

use std::path::PathBuf;

use tracing::info;

use printhub_core::config::AppConfig;
use printhub_service::{JobProducer, SubmitRequest, SubmitStatus};
use printhub_storage::PayloadSource;

use crate::output;

/// Arguments of one job invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitArgs {
    /// Scheduler job id.
    pub job_id: String,
    /// Submitting account.
    pub user: String,
    /// Document title.
    pub title: String,
    /// Parsed copy count.
    pub copies: u32,
    /// Raw options string.
    pub options: String,
    /// Payload file; standard input when absent.
    pub file: Option<PathBuf>,
}

impl SubmitArgs {
    /// Build the producer request.
    pub fn into_request(self) -> SubmitRequest {
        let source = match self.file {
            Some(path) => PayloadSource::File(path),
            None => PayloadSource::stdin(),
        };
        SubmitRequest {
            job_id: self.job_id,
            user: self.user,
            title: self.title,
            copies: self.copies,
            options: self.options,
            source,
        }
    }
}

/// Lenient copy count: anything but a positive integer becomes 1.
pub fn parse_copies(raw: &str) -> u32 {
    raw.trim().parse::<u32>().ok().filter(|&n| n > 0).unwrap_or(1)
}

/// Capture the job and report the outcome. Returns the exit code.
pub async fn execute(args: SubmitArgs, config: &AppConfig) -> i32 {
    output::print_info(&format!(
        "Processing job {} for user {}: {}",
        args.job_id, args.user, args.title
    ));

    let job_id = args.job_id.clone();
    let producer = JobProducer::from_config(config);
    let status = producer.submit(args.into_request()).await;
    info!(job_id = %job_id, %status, "Backend invocation finished");

    match status {
        SubmitStatus::Delivered(_) | SubmitStatus::Pending => {
            output::print_info(&format!("Job {job_id} {status}"));
        }
        SubmitStatus::Failed => {
            output::print_error(&format!("Job {job_id} could not be stored"));
        }
    }
    status.exit_code()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_copies_is_lenient() {
        assert_eq!(parse_copies("3"), 3);
        assert_eq!(parse_copies(" 2 "), 2);
        assert_eq!(parse_copies("0"), 1);
        assert_eq!(parse_copies("many"), 1);
        assert_eq!(parse_copies(""), 1);
        assert_eq!(parse_copies("-4"), 1);
    }

    #[test]
    fn test_file_argument_selects_file_source() {
        let args = SubmitArgs {
            job_id: "1".to_string(),
            user: "alice".to_string(),
            title: "Doc".to_string(),
            copies: 1,
            options: String::new(),
            file: Some(PathBuf::from("/var/spool/cups/d00001-001")),
        };
        let request = args.into_request();
        assert!(matches!(request.source, PayloadSource::File(ref p) if p.ends_with("d00001-001")));
    }
}
