// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier generation for logs and events

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Generates unique opaque identifiers
///
/// Handlers draw both the log id returned to the client and the id of each
/// event from the same generator.
pub trait IdGen: Clone + Send + Sync {
    fn next(&self) -> String;
}

/// UUIDv4 generator used in production
#[derive(Clone, Default)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn next(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Deterministic generator for tests: `prefix-1`, `prefix-2`, ...
#[derive(Clone)]
pub struct SequentialIdGen {
    prefix: String,
    counter: Arc<AtomicU64>,
}

impl SequentialIdGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Number of ids handed out so far
    pub fn issued(&self) -> u64 {
        self.counter.load(Ordering::SeqCst) - 1
    }
}

impl Default for SequentialIdGen {
    fn default() -> Self {
        Self::new("id")
    }
}

impl IdGen for SequentialIdGen {
    fn next(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}-{}", self.prefix, n)
    }
}
