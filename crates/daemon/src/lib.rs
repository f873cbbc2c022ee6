// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Logbook daemon (lbd) library
//!
//! Serves the log runtime over a Unix socket. The binary in `main.rs`
//! owns the accept loop; everything else lives here so it can be tested.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod lifecycle;
pub mod protocol;
pub mod server;

pub use config::{Config, ConfigError, Settings};
pub use lifecycle::{DaemonState, LifecycleError, Maintenance, ServerContext};
pub use protocol::{Request, Response};
