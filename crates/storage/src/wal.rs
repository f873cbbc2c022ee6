// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log for durable event storage
//!
//! One JSON line per event, each carrying a CRC32 of the serialized event.
//! Every append is fsync'd before returning. Replay stops at the first line
//! that is torn (no trailing newline), unparseable, or fails its checksum;
//! [`Wal::repair`] truncates the file back to the last good line.

use lb_core::Event;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur in WAL operations
#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// First unreadable line found during replay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalCorruption {
    /// 1-based line number
    pub line: u64,
    /// Byte offset where the bad line starts
    pub offset: u64,
    pub reason: String,
}

/// Result of reading a WAL file from the start
#[derive(Debug, Default)]
pub struct WalReplay {
    pub events: Vec<Event>,
    /// Length in bytes of the readable prefix
    pub valid_len: u64,
    pub corruption: Option<WalCorruption>,
}

/// Append-only event log on disk
pub struct Wal {
    path: PathBuf,
    file: File,
    appended: u64,
}

impl Wal {
    /// Open or create a WAL at the given path
    pub fn open(path: &Path) -> Result<Self, WalError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            appended: 0,
        })
    }

    /// Append an event to the log
    ///
    /// The event is durable once this returns `Ok`.
    pub fn append(&mut self, event: &Event) -> Result<(), WalError> {
        let entry = EntryRef {
            checksum: checksum(event)?,
            event,
        };
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');

        write_durably(&mut self.file, &line, File::sync_data)?;

        self.appended += 1;
        Ok(())
    }

    /// Number of events appended through this handle
    pub fn appended(&self) -> u64 {
        self.appended
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every valid event from the log
    ///
    /// A missing file replays as empty.
    pub fn replay(path: &Path) -> Result<WalReplay, WalError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(WalReplay::default()),
            Err(e) => return Err(e.into()),
        };

        let mut reader = BufReader::new(file);
        let mut replay = WalReplay::default();
        let mut line = String::new();
        let mut line_number = 0u64;

        loop {
            line.clear();
            let bytes_read = match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    replay.corruption = Some(WalCorruption {
                        line: line_number + 1,
                        offset: replay.valid_len,
                        reason: e.to_string(),
                    });
                    break;
                }
                Err(e) => return Err(e.into()),
            };
            line_number += 1;

            if !line.ends_with('\n') {
                replay.corruption = Some(WalCorruption {
                    line: line_number,
                    offset: replay.valid_len,
                    reason: "truncated entry".to_string(),
                });
                break;
            }

            let trimmed = line.trim();
            if !trimmed.is_empty() {
                match parse_line(trimmed) {
                    Ok(event) => replay.events.push(event),
                    Err(reason) => {
                        replay.corruption = Some(WalCorruption {
                            line: line_number,
                            offset: replay.valid_len,
                            reason,
                        });
                        break;
                    }
                }
            }
            replay.valid_len += bytes_read as u64;
        }

        Ok(replay)
    }

    /// Truncate the log at its first corrupt line
    ///
    /// Returns the number of bytes removed (0 when the log is intact or
    /// missing).
    pub fn repair(path: &Path) -> Result<u64, WalError> {
        let replay = Self::replay(path)?;
        let Some(corruption) = replay.corruption else {
            return Ok(0);
        };

        let file = OpenOptions::new().write(true).open(path)?;
        let old_len = file.metadata()?.len();
        file.set_len(replay.valid_len)?;
        file.sync_all()?;

        tracing::info!(
            line = corruption.line,
            reason = %corruption.reason,
            kept_events = replay.events.len(),
            "WAL truncated at corruption point"
        );
        Ok(old_len.saturating_sub(replay.valid_len))
    }

    /// Delete the log file
    ///
    /// Returns whether a file was removed.
    pub fn remove(path: &Path) -> Result<bool, WalError> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Serialize)]
struct EntryRef<'a> {
    checksum: u32,
    event: &'a Event,
}

#[derive(Deserialize)]
struct Entry {
    checksum: u32,
    event: Event,
}

fn checksum(event: &Event) -> Result<u32, WalError> {
    let json = serde_json::to_string(event)?;
    Ok(crc32fast::hash(json.as_bytes()))
}

fn parse_line(line: &str) -> Result<Event, String> {
    let entry: Entry = serde_json::from_str(line).map_err(|e| e.to_string())?;
    let expected = checksum(&entry.event).map_err(|e| e.to_string())?;
    if expected != entry.checksum {
        return Err("checksum mismatch".to_string());
    }
    Ok(entry.event)
}

/// Write `line` and sync it, or leave the file as it was
///
/// A failed append must not leave a partial or unsynced line behind: the
/// caller retries the same event, and a second copy would read back as a
/// position regression.
fn write_durably(
    file: &mut File,
    line: &[u8],
    sync: impl FnOnce(&File) -> io::Result<()>,
) -> io::Result<()> {
    let prev_len = file.metadata()?.len();
    let result = match file.write_all(line) {
        Ok(()) => sync(file),
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        if let Err(rollback) = file.set_len(prev_len) {
            tracing::error!(
                error = %rollback,
                len = prev_len,
                "failed to roll back partial WAL append"
            );
        }
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
