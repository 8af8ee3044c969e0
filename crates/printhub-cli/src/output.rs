//! Status lines understood by the printing subsystem.
//!
//! The scheduler scans backend stderr for lines prefixed with a severity.

/// Print an informational status line.
pub fn print_info(msg: &str) {
    eprintln!("INFO: {msg}");
}

/// Print an error status line.
pub fn print_error(msg: &str) {
    eprintln!("ERROR: {msg}");
}

/// Print a line on standard output.
pub fn print_line(msg: &str) {
    println!("{msg}");
}
