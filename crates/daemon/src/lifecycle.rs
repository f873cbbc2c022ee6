// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: maintenance, startup, shutdown.

use std::fs::File;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use lb_core::{SystemClock, UuidIdGen};
use lb_engine::{Runtime, StartError};
use lb_storage::{EventStore, StoreError, Wal, WalError};
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::config::{Config, ConfigError};

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(std::path::PathBuf, std::io::Error),

    #[error("WAL error: {0}")]
    Wal(#[from] WalError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] StartError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Maintenance steps requested on the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Maintenance {
    /// Delete the event log
    pub dropdb: bool,
    /// Create directories and repair a torn log tail
    pub migratedb: bool,
    /// Exit after maintenance instead of serving
    pub stop: bool,
}

impl Maintenance {
    /// Pick maintenance keywords out of `args`; `ci` means all three
    ///
    /// Returns the steps and the arguments that were not keywords.
    pub fn parse<I, S>(args: I) -> (Self, Vec<String>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut steps = Self::default();
        let mut rest = Vec::new();
        for arg in args {
            let arg = arg.into();
            match arg.as_str() {
                "ci" => {
                    steps = Self {
                        dropdb: true,
                        migratedb: true,
                        stop: true,
                    }
                }
                "dropdb" => steps.dropdb = true,
                "migratedb" => steps.migratedb = true,
                "stop" => steps.stop = true,
                _ => rest.push(arg),
            }
        }
        (steps, rest)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Run maintenance steps while holding the daemon lock
pub fn run_maintenance(config: &Config, steps: Maintenance) -> Result<(), LifecycleError> {
    if !steps.dropdb && !steps.migratedb {
        return Ok(());
    }
    let lock_file = acquire_lock(config)?;

    if steps.dropdb {
        let removed = Wal::remove(&config.wal_path)?;
        info!(path = %config.wal_path.display(), removed, "dropdb: event log removed");
    }
    if steps.migratedb {
        if let Some(parent) = config.wal_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let truncated = Wal::repair(&config.wal_path)?;
        if truncated > 0 {
            warn!(bytes = truncated, "migratedb: truncated corrupt log tail");
        }
        // Creates an empty log if none exists
        Wal::open(&config.wal_path)?;
        info!(path = %config.wal_path.display(), "migratedb: event log ready");
    }

    drop(lock_file);
    remove_if_exists(&config.lock_path);
    Ok(())
}

/// State shared by every connection task
pub struct ServerContext {
    pub runtime: Runtime,
    pub start_time: Instant,
    /// Notified when a client asks the daemon to stop
    pub shutdown: Notify,
}

/// Daemon state during operation
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub listener: UnixListener,
    pub ctx: Arc<ServerContext>,
}

impl DaemonState {
    /// Drain the persistence queue and remove runtime files
    pub async fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        let stats = self.ctx.runtime.shutdown().await;
        info!(
            items = stats.items,
            events = stats.events_appended,
            failed = stats.failed_items,
            "persistence queue drained"
        );

        remove_if_exists(&self.config.socket_path);
        remove_if_exists(&self.config.lock_path);
        remove_if_exists(&self.config.version_path);

        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Start the daemon
///
/// Must be called from within a tokio runtime.
pub fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    match startup_inner(config) {
        Ok(state) => Ok(state),
        // Another daemon owns these files
        Err(e @ LifecycleError::LockFailed(_)) => Err(e),
        Err(e) => {
            cleanup_on_failure(config);
            Err(e)
        }
    }
}

fn startup_inner(config: &Config) -> Result<DaemonState, LifecycleError> {
    // 1. Acquire lock file FIRST - prevents races
    let lock_file = acquire_lock(config)?;

    // 2. Create directories and version file
    if let Some(parent) = config.socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&config.version_path, env!("CARGO_PKG_VERSION"))?;

    // 3. Rebuild the store from the event log
    let (store, report) = EventStore::open(&config.wal_path)?;
    info!(
        events = report.events_loaded,
        streams = report.streams,
        "Loaded event log"
    );
    for key in &report.corrupted_streams {
        warn!(aggregate_key = %key, "stream refused: sequence integrity violated");
    }

    // 4. Start the runtime (persistence worker + dispatch table)
    let runtime = Runtime::start(
        Arc::new(store),
        SystemClock,
        UuidIdGen,
        config.settings.runtime_config(),
    )?;

    // 5. Remove stale socket and bind (LAST - only after all validation passes)
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    info!(
        "Daemon started for project: {}",
        config.project_root.display()
    );

    Ok(DaemonState {
        config: config.clone(),
        lock_file,
        listener,
        ctx: Arc::new(ServerContext {
            runtime,
            start_time: Instant::now(),
            shutdown: Notify::new(),
        }),
    })
}

/// Open the lock file, take an exclusive lock and record our PID
fn acquire_lock(config: &Config) -> Result<File, LifecycleError> {
    if let Some(parent) = config.lock_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut lock_file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    Ok(lock_file)
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    remove_if_exists(&config.socket_path);
    remove_if_exists(&config.version_path);
}

fn remove_if_exists(path: &std::path::Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
