//! Path and file-name rules for the spool area.

use printhub_core::error::AppError;
use printhub_core::result::AppResult;

/// Extension given to every payload file.
pub const PAYLOAD_EXTENSION: &str = "pdf";

/// Reject account names that cannot safely be used as a path component.
pub fn validate_user(user: &str) -> AppResult<()> {
    if user.is_empty() {
        return Err(AppError::validation("User name must not be empty"));
    }
    if user == "." || user == ".." {
        return Err(AppError::validation(format!(
            "User name '{user}' is not a valid directory name"
        )));
    }
    if user.contains('/') || user.contains('\0') {
        return Err(AppError::validation(format!(
            "User name '{}' contains a path separator or NUL byte",
            user.escape_default()
        )));
    }
    Ok(())
}

/// Replace every character outside `[A-Za-z0-9._-]` with `_`.
///
/// Applying it twice yields the same result as applying it once.
pub fn sanitize_segment(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Truncate a title to `max_chars` characters, then sanitize it.
pub fn sanitize_title(title: &str, max_chars: usize) -> String {
    let truncated: String = title.chars().take(max_chars).collect();
    sanitize_segment(&truncated)
}

/// Build the `{timestamp}_{jobId}_{title}` stem of a payload file name.
pub fn payload_stem(timestamp: &str, job_id: &str, title: &str, max_chars: usize) -> String {
    format!(
        "{}_{}_{}",
        sanitize_segment(timestamp),
        sanitize_segment(job_id),
        sanitize_title(title, max_chars)
    )
}

/// Candidate file name number `attempt` for `stem`: `{stem}.pdf` first, then
/// `{stem}_1.pdf`, `{stem}_2.pdf`, ...
pub fn payload_file_name(stem: &str, attempt: u32) -> String {
    if attempt == 0 {
        format!("{stem}.{PAYLOAD_EXTENSION}")
    } else {
        format!("{stem}_{attempt}.{PAYLOAD_EXTENSION}")
    }
}
