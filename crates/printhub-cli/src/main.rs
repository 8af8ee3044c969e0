//! PrintHub printing-subsystem backend entry point.
//!
//! Invoked with no arguments it prints the device discovery line. Invoked
//! as `printhub-backend job-id user title copies options [file]` it captures
//! one job, reading the payload from `file` or standard input.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::Cli;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    let code = cli.execute().await;
    std::process::exit(code);
}
