// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Journal wrapper that fails on demand, for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::journal::Journal;
use crate::store::StoreError;
use lb_core::Event;
use std::sync::{Arc, Mutex};

type Predicate = Box<dyn Fn(&Event) -> bool + Send>;

#[derive(Default)]
struct Plan {
    fail_when: Option<Predicate>,
    fail_next: u32,
    attempts: u64,
    failures: u64,
}

/// Controls a [`FaultyJournal`] after it has been handed to a store
#[derive(Clone, Default)]
pub struct FaultPlan {
    inner: Arc<Mutex<Plan>>,
}

impl FaultPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every append of an event matching `predicate`
    pub fn fail_when(&self, predicate: impl Fn(&Event) -> bool + Send + 'static) {
        self.lock().fail_when = Some(Box::new(predicate));
    }

    /// Fail the next `count` appends, whatever the event
    pub fn fail_next(&self, count: u32) {
        self.lock().fail_next = count;
    }

    /// Stop injecting failures
    pub fn heal(&self) {
        let mut plan = self.lock();
        plan.fail_when = None;
        plan.fail_next = 0;
    }

    /// Appends attempted, failed or not
    pub fn attempts(&self) -> u64 {
        self.lock().attempts
    }

    /// Appends that were made to fail
    pub fn failures(&self) -> u64 {
        self.lock().failures
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Plan> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn should_fail(&self, event: &Event) -> bool {
        let mut plan = self.lock();
        plan.attempts += 1;
        let fail = if plan.fail_next > 0 {
            plan.fail_next -= 1;
            true
        } else {
            plan.fail_when.as_ref().is_some_and(|p| p(event))
        };
        if fail {
            plan.failures += 1;
        }
        fail
    }
}

/// Journal that consults a [`FaultPlan`] before delegating
pub struct FaultyJournal<J> {
    inner: J,
    plan: FaultPlan,
}

impl<J: Journal> FaultyJournal<J> {
    pub fn new(inner: J, plan: FaultPlan) -> Self {
        Self { inner, plan }
    }
}

impl<J: Journal> Journal for FaultyJournal<J> {
    fn name(&self) -> &'static str {
        "faulty"
    }

    fn append(&mut self, event: &Event) -> Result<(), StoreError> {
        if self.plan.should_fail(event) {
            return Err(StoreError::Io(std::io::Error::other(format!(
                "injected append failure for event {}",
                event.id
            ))));
        }
        self.inner.append(event)
    }
}
