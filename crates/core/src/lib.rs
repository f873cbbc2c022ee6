// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lb-core: domain types for the logbook service
//!
//! This crate provides:
//! - Commands accepted from clients (`CreateLog`) and the `LogLevel` vocabulary
//! - The append-only `Event` record and its typed payloads
//! - Aggregates rebuilt by folding events (`Log`, `ClientActivity`)
//! - Clock and id generation abstractions for testable time and identity

pub mod aggregate;
pub mod clock;
pub mod command;
pub mod event;
pub mod id;

pub use aggregate::{replay, Aggregate, ClientActivity, Log, LogSummary, Scope};
pub use clock::{Clock, FakeClock, SystemClock};
pub use command::{CreateLog, LogLevel, ParseLevelError};
pub use event::{Event, LogCreated, LogEvent, PendingEvent};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
