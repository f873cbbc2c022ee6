// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lb-storage: durable, ordered event storage
//!
//! - [`Wal`]: checksummed JSONL log, fsync'd per append
//! - [`StoreState`]: per-stream and per-entity indexes with integrity checks
//! - [`EventStore`]: the append/load/query surface the engine uses

#[cfg(any(test, feature = "test-support"))]
pub mod faulty;
mod journal;
mod state;
mod store;
mod wal;

#[cfg(any(test, feature = "test-support"))]
pub use faulty::{FaultPlan, FaultyJournal};
pub use journal::{Journal, MemoryJournal};
pub use state::{EventFilter, EventStream, IntegrityError, StoreState};
pub use store::{EventStore, RecoveryReport, StoreError};
pub use wal::{Wal, WalCorruption, WalError, WalReplay};
