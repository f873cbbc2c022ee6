// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon paths and tunables
//!
//! Paths derive from the project root: state lives under
//! `$XDG_STATE_HOME/logbook/projects/<hash>` (or `~/.local/state/...`),
//! the socket under `$LOGBOOK_SOCKET_DIR` (default `/tmp/logbook`).
//! Tunables come from an optional `logbook.toml` in the project root,
//! then from `LOGBOOK_*` environment variables.

use lb_engine::{QueueConfig, RetryPolicy, RuntimeConfig, DEFAULT_CAPACITY};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Name of the optional settings file in the project root
pub const SETTINGS_FILE: &str = "logbook.toml";

pub const ENV_QUEUE_CAPACITY: &str = "LOGBOOK_QUEUE_CAPACITY";
pub const ENV_APPEND_RETRIES: &str = "LOGBOOK_APPEND_RETRIES";
pub const ENV_SOCKET_DIR: &str = "LOGBOOK_SOCKET_DIR";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Project not found at {0}: {1}")]
    ProjectNotFound(PathBuf, std::io::Error),

    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to read {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("Invalid settings in {0}: {1}")]
    Parse(PathBuf, toml::de::Error),

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

/// Tunables for the persistence pipeline
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Items the persistence queue holds before refusing commands
    pub queue_capacity: usize,
    /// Attempts per event append, including the first
    pub append_retries: u32,
    #[serde(with = "humantime_serde")]
    pub retry_backoff: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            queue_capacity: DEFAULT_CAPACITY,
            append_retries: retry.max_attempts,
            retry_backoff: retry.backoff,
        }
    }
}

impl Settings {
    /// Read `logbook.toml` from `project_root`; defaults when absent
    pub fn load(project_root: &Path) -> Result<Self, ConfigError> {
        let path = project_root.join(SETTINGS_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::Read(path, e)),
        };
        let settings: Settings =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(path, e))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Apply `LOGBOOK_*` overrides
    ///
    /// `lookup` is `std::env::var` in production.
    pub fn with_env(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(value) = lookup(ENV_QUEUE_CAPACITY) {
            self.queue_capacity = parse_env(ENV_QUEUE_CAPACITY, &value)?;
        }
        if let Some(value) = lookup(ENV_APPEND_RETRIES) {
            self.append_retries = parse_env(ENV_APPEND_RETRIES, &value)?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            queue: QueueConfig {
                capacity: self.queue_capacity,
                retry: RetryPolicy {
                    max_attempts: self.append_retries,
                    backoff: self.retry_backoff,
                },
            },
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "queue_capacity".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.append_retries == 0 {
            return Err(ConfigError::Invalid {
                key: "append_retries".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key: key.to_string(),
        message: format!("{:?}: {}", value, e),
    })
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Project root directory
    pub project_root: PathBuf,
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to version file
    pub version_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Path to the event log
    pub wal_path: PathBuf,
    pub settings: Settings,
}

impl Config {
    /// Create config for a project
    pub fn for_project(project_root: &Path) -> Result<Self, ConfigError> {
        let canonical = project_root
            .canonicalize()
            .map_err(|e| ConfigError::ProjectNotFound(project_root.to_path_buf(), e))?;
        let settings = Settings::load(&canonical)?.with_env(|key| std::env::var(key).ok())?;
        Ok(Self::with_dirs(canonical, &state_dir()?, &socket_dir(), settings))
    }

    /// Lay out paths under explicit state and socket directories
    pub fn with_dirs(
        project_root: PathBuf,
        state_root: &Path,
        socket_dir: &Path,
        settings: Settings,
    ) -> Self {
        let hash = project_hash(&project_root);
        let state_dir = state_root.join("projects").join(&hash);
        Self {
            project_root,
            socket_path: socket_dir.join(format!("{}.sock", hash)),
            lock_path: state_dir.join("daemon.pid"),
            version_path: state_dir.join("daemon.version"),
            log_path: state_dir.join("daemon.log"),
            wal_path: state_dir.join("wal").join("events.wal"),
            settings,
        }
    }
}

/// Get the state directory for logbook
fn state_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("logbook"));
    }

    let home = std::env::var("HOME").map_err(|_| ConfigError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/logbook"))
}

/// Get the socket directory for logbook
///
/// Uses /tmp/logbook by default to keep paths short (macOS SUN_LEN = 104).
fn socket_dir() -> PathBuf {
    std::env::var(ENV_SOCKET_DIR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp/logbook"))
}

/// Compute project hash for unique daemon directory
fn project_hash(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    let result = hasher.finalize();
    // First 8 bytes, 16 hex chars
    result[..8].iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
