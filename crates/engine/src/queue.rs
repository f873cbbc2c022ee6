// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded persistence queue
//!
//! Handlers enqueue pending events and return at once; a single worker
//! thread drains the queue in FIFO order and appends to the store. Each
//! item carries a oneshot that resolves once its events are durable (or
//! have definitively failed):
//!
//! ```text
//! handler ──try_send──▶ [ item | item | … ] ──blocking_recv──▶ worker ──▶ EventStore
//!    ▲                                                          │
//!    └──────────────────── Completion (oneshot) ◀───────────────┘
//! ```

use crate::worker::{self, WorkerStats};
use lb_core::{Event, PendingEvent};
use lb_storage::{EventStore, StoreError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Default number of items the queue holds before refusing work
pub const DEFAULT_CAPACITY: usize = 1024;

/// Enqueue was refused; nothing was accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("persistence queue is full ({capacity} items pending)")]
    Full { capacity: usize },
    #[error("persistence queue is closed")]
    Closed,
}

/// An accepted item could not be made durable
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("append failed after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: StoreError,
    },
    #[error("append rejected by the store: {0}")]
    Rejected(#[source] StoreError),
    #[error("persistence worker stopped before the item was processed")]
    WorkerGone,
}

/// How the worker retries a failed append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per event, including the first
    pub max_attempts: u32,
    /// Wait before retry `n` is `backoff * n`
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Try once, never retry
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(25),
        }
    }
}

/// Queue sizing and retry behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    pub capacity: usize,
    pub retry: RetryPolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            retry: RetryPolicy::default(),
        }
    }
}

pub(crate) type Outcome = Result<Vec<Event>, PersistError>;

/// Pending events plus the signal that reports their fate
pub(crate) struct QueueItem {
    pub(crate) events: Vec<PendingEvent>,
    pub(crate) done: oneshot::Sender<Outcome>,
}

pub(crate) enum Job {
    Append(QueueItem),
    Stop,
}

/// Resolves when an enqueued item has been processed
#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<Outcome>,
}

impl Completion {
    /// Wait for the worker to append (or give up on) the item
    ///
    /// Returns the stored events with their assigned sequence numbers.
    pub async fn wait(self) -> Result<Vec<Event>, PersistError> {
        self.rx.await.map_err(|_| PersistError::WorkerGone)?
    }

    /// Blocking form of [`Completion::wait`] for callers outside the runtime
    pub fn blocking_wait(self) -> Result<Vec<Event>, PersistError> {
        self.rx.blocking_recv().map_err(|_| PersistError::WorkerGone)?
    }
}

/// Handle used to enqueue work; cheap to clone
#[derive(Clone)]
pub struct PersistenceQueue {
    tx: mpsc::Sender<Job>,
    capacity: usize,
    closed: Arc<AtomicBool>,
}

/// Owns the worker thread; consumed by [`PersistenceQueue::shutdown`]
pub struct WorkerHandle {
    thread: JoinHandle<()>,
}

impl PersistenceQueue {
    /// Create the queue and start its worker thread
    pub fn start(
        store: Arc<EventStore>,
        config: QueueConfig,
        stats: Arc<WorkerStats>,
    ) -> std::io::Result<(Self, WorkerHandle)> {
        let capacity = config.capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let thread = std::thread::Builder::new()
            .name("persistence-worker".to_string())
            .spawn(move || worker::run(store, rx, config.retry, &stats))?;
        tracing::info!(capacity, max_attempts = config.retry.max_attempts, "persistence worker started");

        Ok((
            Self {
                tx,
                capacity,
                closed: Arc::new(AtomicBool::new(false)),
            },
            WorkerHandle { thread },
        ))
    }

    /// Accept `events` for persistence without waiting
    ///
    /// Fails fast when the queue is full. Events of one item are appended
    /// in order, after every previously accepted item.
    pub fn enqueue(&self, events: Vec<PendingEvent>) -> Result<Completion, QueueError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(QueueError::Closed);
        }
        let (done, rx) = oneshot::channel();
        self.tx
            .try_send(Job::Append(QueueItem { events, done }))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => {
                    tracing::warn!(capacity = self.capacity, "persistence queue full");
                    QueueError::Full {
                        capacity: self.capacity,
                    }
                }
                mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
            })?;
        Ok(Completion { rx })
    }

    /// Wait until every item accepted before this call has been processed
    pub async fn flush(&self) -> Result<(), QueueError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(QueueError::Closed);
        }
        let (done, rx) = oneshot::channel();
        self.tx
            .send(Job::Append(QueueItem {
                events: Vec::new(),
                done,
            }))
            .await
            .map_err(|_| QueueError::Closed)?;
        // The barrier holds no events, so only a vanished worker can fail it
        rx.await.map(|_| ()).map_err(|_| QueueError::Closed)
    }

    /// Items accepted but not yet picked up by the worker
    pub fn depth(&self) -> usize {
        self.capacity.saturating_sub(self.tx.capacity())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stop accepting work, drain what was accepted, and join the worker
    ///
    /// An item whose `enqueue` raced with this call is either refused with
    /// [`QueueError::Closed`] or persisted; it is never dropped.
    pub async fn shutdown(&self, handle: WorkerHandle) {
        self.closed.store(true, Ordering::Release);
        if self.tx.send(Job::Stop).await.is_err() {
            tracing::warn!("persistence worker exited before shutdown");
        }
        let joined = tokio::task::spawn_blocking(move || handle.thread.join()).await;
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(_)) => tracing::error!("persistence worker panicked"),
            Err(e) => tracing::error!(error = %e, "failed to join persistence worker"),
        }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
