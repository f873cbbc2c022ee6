// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Logbook Daemon (lbd)
//!
//! Background process that accepts log submissions over a Unix socket and
//! persists them through the event store.
//!
//! Usage: `lbd [PROJECT_ROOT] [dropdb] [migratedb] [stop] [ci]`

use std::path::PathBuf;
use std::sync::Arc;

use lb_daemon::config::{Config, ConfigError};
use lb_daemon::lifecycle::{self, LifecycleError, Maintenance};
use lb_daemon::server;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse arguments
    let (steps, rest) = Maintenance::parse(std::env::args().skip(1));
    let project_root = match rest.first() {
        Some(root) => PathBuf::from(root),
        None => std::env::current_dir()?,
    };

    // Load configuration
    let config = Config::for_project(&project_root)?;

    // Write startup marker to log (before tracing setup, so CLI can find it)
    write_startup_marker(&config)?;

    // Set up logging
    let log_guard = setup_logging(&config)?;

    info!("Starting lbd for project: {}", project_root.display());

    if !steps.is_empty() {
        if let Err(e) = lifecycle::run_maintenance(&config, steps) {
            write_startup_error(&config, &e);
            error!("Maintenance failed: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
        if steps.stop {
            info!("Maintenance complete, not serving");
            return Ok(());
        }
    }

    // Start daemon
    let mut daemon = match lifecycle::startup(&config) {
        Ok(d) => d,
        Err(e) => {
            // Write error synchronously (tracing is non-blocking and may not flush in time)
            write_startup_error(&config, &e);
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    // Set up signal handlers
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(
        "Daemon ready, listening on {}",
        config.socket_path.display()
    );

    // Signal ready for parent process (e.g., systemd, CLI waiting for startup)
    println!("READY");

    let ctx = Arc::clone(&daemon.ctx);

    // Main event loop
    loop {
        tokio::select! {
            // Accept client connections
            result = daemon.listener.accept() => {
                match result {
                    Ok((stream, _)) => {
                        let ctx = Arc::clone(&ctx);
                        tokio::spawn(async move {
                            if let Err(e) = server::handle_connection(ctx, stream).await {
                                error!("Error handling connection: {}", e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                    }
                }
            }

            // Shutdown requested via IPC
            _ = ctx.shutdown.notified() => {
                info!("Shutdown requested via IPC, shutting down...");
                daemon.shutdown().await?;
                break;
            }

            // Graceful shutdown on SIGTERM
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                daemon.shutdown().await?;
                break;
            }

            // Graceful shutdown on SIGINT
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down...");
                daemon.shutdown().await?;
                break;
            }
        }
    }

    info!("Daemon stopped");
    Ok(())
}

/// Startup marker prefix written to log before anything else.
/// Full format: "--- lbd: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- lbd: starting (pid: ";

/// Write startup marker to log file (appends to existing log)
fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    use std::io::Write;

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write startup error synchronously to log file.
fn write_startup_error(config: &Config, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let dir = config
        .log_path
        .parent()
        .ok_or(LifecycleError::Config(ConfigError::NoStateDir))?;
    let file_name = config
        .log_path
        .file_name()
        .ok_or(LifecycleError::Config(ConfigError::NoStateDir))?;
    std::fs::create_dir_all(dir)?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Set up subscriber with env filter
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
