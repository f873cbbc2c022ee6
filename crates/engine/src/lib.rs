// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Logbook engine: command dispatch, background persistence and queries
//!
//! A command is validated and handled synchronously; the handler's events
//! go onto a bounded queue and the caller gets its acknowledgment right
//! away. One worker thread appends queued events to the store in order.

mod error;
mod handlers;
mod pipeline;
pub mod queries;
mod queue;
mod runtime;
pub mod validation;
mod worker;

pub use error::{DispatchError, RegistrationError, StartError};
pub use handlers::{CreateLogHandler, LogAccepted};
pub use pipeline::{Command, Dispatcher, Handler};
pub use queue::{
    Completion, PersistError, PersistenceQueue, QueueConfig, QueueError, RetryPolicy,
    WorkerHandle, DEFAULT_CAPACITY,
};
pub use runtime::{Runtime, RuntimeConfig};
pub use validation::{FieldError, ValidationErrors, MAX_MESSAGE_LEN};
pub use worker::{StatsSnapshot, WorkerStats};
