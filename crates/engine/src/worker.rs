// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The single consumer of the persistence queue

use crate::queue::{Job, Outcome, PersistError, QueueItem, RetryPolicy};
use lb_core::{Event, PendingEvent};
use lb_storage::EventStore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Counters updated by the worker, readable from any thread
#[derive(Debug, Default)]
pub struct WorkerStats {
    items: AtomicU64,
    events_appended: AtomicU64,
    failed_items: AtomicU64,
    retries: AtomicU64,
}

/// Point-in-time copy of [`WorkerStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub items: u64,
    pub events_appended: u64,
    pub failed_items: u64,
    pub retries: u64,
}

impl WorkerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            items: self.items.load(Ordering::Relaxed),
            events_appended: self.events_appended.load(Ordering::Relaxed),
            failed_items: self.failed_items.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
        }
    }
}

/// Drain `rx` until every sender is gone or the queue is stopped and empty
///
/// Runs on its own thread; backoff sleeps block only this thread. A stop
/// job closes the channel, so later sends fail, but items already buffered
/// behind the stop are still processed.
pub(crate) fn run(
    store: Arc<EventStore>,
    mut rx: mpsc::Receiver<Job>,
    retry: RetryPolicy,
    stats: &WorkerStats,
) {
    while let Some(job) = rx.blocking_recv() {
        match job {
            Job::Append(item) => process(&store, item, retry, stats),
            Job::Stop => {
                tracing::info!("persistence worker stopping");
                rx.close();
            }
        }
    }
    let s = stats.snapshot();
    tracing::info!(
        items = s.items,
        events = s.events_appended,
        failed = s.failed_items,
        "persistence worker exited"
    );
}

fn process(store: &EventStore, item: QueueItem, retry: RetryPolicy, stats: &WorkerStats) {
    let QueueItem { events, done } = item;
    let outcome = persist(store, events, retry, stats);

    stats.items.fetch_add(1, Ordering::Relaxed);
    if let Err(e) = &outcome {
        stats.failed_items.fetch_add(1, Ordering::Relaxed);
        tracing::error!(error = %e, "failed to persist queued events");
    }
    // The submitter may have stopped listening; the outcome is logged above
    let _ = done.send(outcome);
}

/// Append an item's events in order
///
/// Stops at the first event that cannot be stored. Events appended before
/// it stay in the log.
fn persist(
    store: &EventStore,
    events: Vec<PendingEvent>,
    retry: RetryPolicy,
    stats: &WorkerStats,
) -> Outcome {
    let mut stored = Vec::with_capacity(events.len());
    for pending in events {
        let event = append_with_retry(store, pending, retry, stats)?;
        stats.events_appended.fetch_add(1, Ordering::Relaxed);
        stored.push(event);
    }
    Ok(stored)
}

fn append_with_retry(
    store: &EventStore,
    pending: PendingEvent,
    retry: RetryPolicy,
    stats: &WorkerStats,
) -> Result<Event, PersistError> {
    let max_attempts = retry.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match store.append(pending.clone()) {
            Ok(event) => return Ok(event),
            Err(e) if e.is_integrity() => return Err(PersistError::Rejected(e)),
            Err(e) if attempt >= max_attempts => {
                return Err(PersistError::Exhausted {
                    attempts: attempt,
                    source: e,
                })
            }
            Err(e) => {
                let delay = retry.delay(attempt);
                tracing::warn!(
                    event_id = %pending.id,
                    attempt,
                    max_attempts,
                    ?delay,
                    error = %e,
                    "append failed, retrying"
                );
                stats.retries.fetch_add(1, Ordering::Relaxed);
                std::thread::sleep(delay);
                attempt += 1;
            }
        }
    }
}
