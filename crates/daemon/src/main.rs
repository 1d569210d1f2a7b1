// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IM2 Registry Daemon (im2d)
//!
//! Single-process job registry for the audio pipeline: HTTP+JSON surface,
//! durable job store (WAL + snapshot), and lifecycle event publication.
//! Stage workers, the watcher, and the notifier are separate services that
//! talk to this one.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use im2_daemon::env::Config;
use im2_daemon::http::{self, AppState};
use im2_daemon::lifecycle::{self, LifecycleError};
use std::sync::Arc;
use std::time::Instant;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("im2d {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("im2d {}", env!("CARGO_PKG_VERSION"));
                println!("IM2 registry daemon - job queue and state-transition coordinator");
                println!();
                println!("USAGE:");
                println!("    im2d");
                println!();
                println!("Configuration is environment-based: IM2_DATA_DIR, IM2_LISTEN_ADDR,");
                println!("IM2_START_PAUSED, IM2_REQUEST_TIMEOUT_SECS, IM2_POLL_INTERVAL_SECS.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: im2d [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::from_env()?;
    rotate_log_if_needed(&config.log_path);
    let _log_guard = setup_logging(&config)?;

    info!(
        data_dir = %config.data_dir.display(),
        addr = %config.listen_addr,
        poll_interval_secs = config.poll_interval.as_secs(),
        "starting im2d",
    );

    let daemon = match lifecycle::startup(config) {
        Ok(daemon) => daemon,
        Err(LifecycleError::LockFailed(path)) => {
            // Another daemon owns the data directory — print a readable
            // message instead of a raw debug error.
            eprintln!("im2d is already running (lock: {})", path.display());
            std::process::exit(1);
        }
        Err(e) => {
            error!("failed to start im2d: {e}");
            return Err(e.into());
        }
    };

    let listener = tokio::net::TcpListener::bind(daemon.config.listen_addr).await?;

    lifecycle::spawn_checkpoint(Arc::clone(&daemon.store));

    let state = Arc::new(AppState {
        registry: Arc::clone(&daemon.registry),
        started_at: Instant::now(),
        request_timeout: daemon.config.request_timeout,
        poll_interval: daemon.config.poll_interval,
    });
    let app = http::router(state);

    info!(addr = %daemon.config.listen_addr, "im2d ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    daemon.shutdown();
    info!("im2d stopped");
    Ok(())
}

/// Resolve on SIGTERM or SIGINT.
async fn shutdown_signal() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sig) => sig,
        Err(e) => {
            error!("failed to install SIGTERM handler: {e}");
            std::future::pending::<()>().await;
            return;
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(sig) => sig,
        Err(e) => {
            error!("failed to install SIGINT handler: {e}");
            std::future::pending::<()>().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }
}

/// Maximum log file size before startup rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Rotated log files to keep (im2d.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the daemon log at startup once it exceeds [`MAX_LOG_SIZE`].
///
/// The current log becomes `.log.1`, pushing older rotations back until the
/// oldest falls off. Best-effort: a failed rename must not keep the daemon
/// from starting.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let grown = std::fs::metadata(log_path)
        .map(|meta| meta.len() >= MAX_LOG_SIZE)
        .unwrap_or(false);
    if !grown {
        return;
    }

    let numbered = |n: u32| log_path.with_extension(format!("log.{n}"));

    let _ = std::fs::remove_file(numbered(MAX_ROTATED_LOGS));
    for n in (1..MAX_ROTATED_LOGS).rev() {
        let _ = std::fs::rename(numbered(n), numbered(n + 1));
    }
    let _ = std::fs::rename(log_path, numbered(1));
}

/// Non-blocking file appender with env-filter, writing to `config.log_path`.
fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = config
        .log_path
        .parent()
        .ok_or("log path has no parent directory")?;
    std::fs::create_dir_all(log_dir)?;
    let log_file = config
        .log_path
        .file_name()
        .ok_or("log path has no file name")?;

    // Size-based rotation happens at startup via rotate_log_if_needed
    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
