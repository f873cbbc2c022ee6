// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable sinks the event store writes through

use crate::store::StoreError;
use crate::wal::Wal;
use lb_core::Event;

/// Where appended events are made durable
///
/// The store calls `append` with its writer lock held, so implementations
/// see one event at a time, in position order.
pub trait Journal: Send {
    /// Short name for logs
    fn name(&self) -> &'static str;

    fn append(&mut self, event: &Event) -> Result<(), StoreError>;
}

impl Journal for Wal {
    fn name(&self) -> &'static str {
        "wal"
    }

    fn append(&mut self, event: &Event) -> Result<(), StoreError> {
        Wal::append(self, event).map_err(StoreError::from)
    }
}

/// Journal that keeps nothing beyond the process lifetime
#[derive(Debug, Default)]
pub struct MemoryJournal {
    appended: u64,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Journal for MemoryJournal {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn append(&mut self, _event: &Event) -> Result<(), StoreError> {
        self.appended += 1;
        Ok(())
    }
}
