//! PrintHub listener: long-running job consumer for the logged-in user.
//!
//! Binds the notification receivers, replays the user's pending jobs, and
//! hands every job to the configured headless handler until Ctrl+C or
//! SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt};

use printhub_core::config::AppConfig;
use printhub_core::error::AppError;
use printhub_storage::{SpoolStore, platform};
use printhub_worker::{ConsumerRunner, JobConsumer, handlers};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Listener error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let config_path = AppConfig::resolve_path();
    AppConfig::load(&config_path)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let (writer, ansi) = match config.logging.file.as_deref() {
        Some(path) => match std::fs::OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => (BoxMakeWriter::new(std::sync::Mutex::new(file)), false),
            Err(e) => {
                eprintln!("Cannot open log file {path}: {e}; logging to stderr");
                (BoxMakeWriter::new(std::io::stderr), true)
            }
        },
        None => (BoxMakeWriter::new(std::io::stderr), true),
    };

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(ansi)
                .with_target(true)
                .init();
        }
    }
}

/// Main listener run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting PrintHub listener v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Resolve the account we serve ─────────────────────
    let user = platform::current_user()?;
    let home = std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| platform::lookup_account(&user).map(|a| a.home));
    tracing::info!(user = %user, "Serving print jobs");

    // ── Step 2: Spool store ──────────────────────────────────────
    let store = Arc::new(SpoolStore::new(&config.spool));
    store.resolve_spool_dir(&user).await?;

    // ── Step 3: Job handler ──────────────────────────────────────
    let handler = handlers::from_config(&config.consumer, home, Arc::clone(&store));
    tracing::info!(handler = handler.name(), "Job handler selected");

    // ── Step 4: Consumer (receivers + pending replay) ────────────
    let (mut consumer, events) = JobConsumer::new(
        user,
        Arc::clone(&store),
        config.channel.clone(),
        config.consumer.clone(),
    );
    consumer.start().await?;

    // ── Step 5: Shutdown channel ─────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Step 6: Start runner ─────────────────────────────────────
    let runner = ConsumerRunner::new(handler, consumer.acknowledger());
    let runner_handle = tokio::spawn(async move {
        runner.run(events, shutdown_rx).await;
    });

    // ── Step 7: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received");
    let _ = shutdown_tx.send(true);

    consumer.stop().await;

    // ── Step 8: Wait for the runner ──────────────────────────────
    let grace = Duration::from_secs(config.consumer.shutdown_grace_seconds);
    if tokio::time::timeout(grace, runner_handle).await.is_err() {
        tracing::warn!("Runner did not finish within grace period");
    }

    tracing::info!("PrintHub listener shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
