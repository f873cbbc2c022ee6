// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event store: durable append plus replay-based queries
//!
//! ```text
//! PendingEvent → append → Journal (fsync) → StoreState index
//!                                               ↓
//!                 load_events / load_entity / load_all → fold → Aggregate
//! ```
//!
//! Appends are serialized by a writer lock that covers numbering, the
//! journal write and the index update, so sequence numbers are assigned
//! without gaps. Readers only take the index read lock: they see an event
//! once its append has returned and never see a half-written one.

use crate::journal::{Journal, MemoryJournal};
use crate::state::{EventFilter, EventStream, IntegrityError, StoreState};
use crate::wal::{Wal, WalError};
use lb_core::{replay, Aggregate, Event, PendingEvent, Scope};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

/// Errors from EventStore operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("WAL error: {0}")]
    Wal(#[from] WalError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("integrity error: {0}")]
    Integrity(#[from] IntegrityError),
}

impl StoreError {
    /// Integrity errors are permanent; retrying cannot fix them
    pub fn is_integrity(&self) -> bool {
        matches!(self, StoreError::Integrity(_))
    }
}

/// Summary of what `open` found in the log
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    pub events_loaded: usize,
    pub streams: usize,
    /// Streams refused because of ordering violations
    pub corrupted_streams: Vec<String>,
    /// Line of the first unreadable WAL entry, if any
    pub truncated_at_line: Option<u64>,
}

/// Append-only event store
pub struct EventStore {
    journal: Mutex<Box<dyn Journal>>,
    state: RwLock<StoreState>,
    path: Option<PathBuf>,
}

impl EventStore {
    /// Open a WAL-backed store, replaying existing events
    ///
    /// A torn or corrupt tail is repaired before the writer reopens the
    /// file, so new entries never follow garbage.
    pub fn open(path: &Path) -> Result<(Self, RecoveryReport), StoreError> {
        let replayed = Wal::replay(path)?;
        let truncated_at_line = replayed.corruption.as_ref().map(|c| c.line);
        if let Some(corruption) = &replayed.corruption {
            tracing::warn!(
                line = corruption.line,
                reason = %corruption.reason,
                "stopping WAL replay at unreadable entry"
            );
            Wal::repair(path)?;
        }

        let mut state = StoreState::new();
        for event in replayed.events {
            let (id, key) = (event.id.clone(), event.aggregate_key.clone());
            if let Err(e) = state.apply(event) {
                tracing::warn!(event_id = %id, aggregate_key = %key, error = %e, "event refused during replay");
            }
        }

        let report = RecoveryReport {
            events_loaded: state.len(),
            streams: state.stream_count(),
            corrupted_streams: state
                .corrupted_streams()
                .into_iter()
                .map(str::to_string)
                .collect(),
            truncated_at_line,
        };
        tracing::info!(
            events = report.events_loaded,
            streams = report.streams,
            corrupted = report.corrupted_streams.len(),
            path = %path.display(),
            "event store opened"
        );

        let wal = Wal::open(path)?;
        Ok((
            Self {
                journal: Mutex::new(Box::new(wal)),
                state: RwLock::new(state),
                path: Some(path.to_path_buf()),
            },
            report,
        ))
    }

    /// Store that lives only in memory
    pub fn in_memory() -> Self {
        Self::with_journal(MemoryJournal::new())
    }

    /// Empty store writing through the given journal
    pub fn with_journal(journal: impl Journal + 'static) -> Self {
        Self {
            journal: Mutex::new(Box::new(journal)),
            state: RwLock::new(StoreState::new()),
            path: None,
        }
    }

    /// Path of the backing WAL, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Durably append an event
    ///
    /// Assigns the next sequence number of the event's stream and the next
    /// store position. On error nothing is indexed and numbering is
    /// unchanged, so the append can be retried.
    pub fn append(&self, pending: PendingEvent) -> Result<Event, StoreError> {
        let mut journal = self.journal.lock().unwrap_or_else(|e| e.into_inner());

        let (sequence, position) = {
            let state = self.read();
            (
                state.next_sequence(&pending.aggregate_key)?,
                state.next_position(),
            )
        };
        let event = pending.into_event(sequence, position);

        journal.append(&event)?;
        self.write().apply(event.clone())?;

        tracing::debug!(
            journal = journal.name(),
            aggregate_key = %event.aggregate_key,
            sequence,
            position,
            "event appended"
        );
        Ok(event)
    }

    /// Events of one stream, ascending by sequence
    pub fn load_events(&self, aggregate_key: &str) -> Result<EventStream, StoreError> {
        Ok(self.read().stream(aggregate_key)?)
    }

    /// Events about one entity, in store order
    pub fn load_entity(&self, entity_id: &str) -> Result<EventStream, StoreError> {
        Ok(self.read().entity(entity_id)?)
    }

    /// Events matching `filter`, in store order
    pub fn load_all(&self, filter: &EventFilter) -> Result<EventStream, StoreError> {
        Ok(self.read().select(filter)?)
    }

    /// Rebuild an aggregate by replaying its events
    ///
    /// `Ok(None)` means no events exist for `id`.
    pub fn query<A: Aggregate>(&self, id: &str) -> Result<Option<A>, StoreError> {
        let events = match A::SCOPE {
            Scope::Stream => self.load_events(id)?,
            Scope::Entity => self.load_entity(id)?,
        };
        Ok(replay(&events))
    }

    /// Keys of streams refused because of an integrity violation
    ///
    /// Bulk reads leave these streams out; callers that list should report
    /// them alongside the results.
    pub fn corrupted_streams(&self) -> Vec<String> {
        self.read()
            .corrupted_streams()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Total number of stored events
    pub fn event_count(&self) -> usize {
        self.read().len()
    }

    /// Number of events in one stream
    pub fn stream_len(&self, aggregate_key: &str) -> usize {
        self.read().last_sequence(aggregate_key) as usize
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
