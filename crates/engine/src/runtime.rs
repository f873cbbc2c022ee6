// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime wiring the dispatcher, persistence queue and store together

use crate::error::{DispatchError, StartError};
use crate::handlers::{CreateLogHandler, LogAccepted};
use crate::pipeline::{Command, Dispatcher};
use crate::queries;
use crate::queue::{PersistenceQueue, QueueConfig, QueueError, WorkerHandle};
use crate::validation::{create_log_limits, create_log_shape};
use crate::worker::{StatsSnapshot, WorkerStats};
use lb_core::{ClientActivity, Clock, CreateLog, IdGen, Log, LogSummary};
use lb_storage::{EventStore, StoreError};
use std::sync::{Arc, Mutex};

/// Runtime tuning
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub queue: QueueConfig,
}

/// Accepts commands and answers queries for one store
///
/// Built once at startup and shared by reference; there is no global
/// instance.
pub struct Runtime {
    store: Arc<EventStore>,
    queue: PersistenceQueue,
    dispatcher: Dispatcher,
    stats: Arc<WorkerStats>,
    worker: Mutex<Option<WorkerHandle>>,
}

impl Runtime {
    /// Start the persistence worker and register the command routes
    pub fn start<C, I>(
        store: Arc<EventStore>,
        clock: C,
        ids: I,
        config: RuntimeConfig,
    ) -> Result<Self, StartError>
    where
        C: Clock + 'static,
        I: IdGen + 'static,
    {
        let stats = Arc::new(WorkerStats::new());
        let (queue, worker) =
            PersistenceQueue::start(Arc::clone(&store), config.queue, Arc::clone(&stats))
                .map_err(StartError::WorkerSpawn)?;

        let mut dispatcher = Dispatcher::new();
        dispatcher.validate_with::<CreateLog>(create_log_shape);
        dispatcher.validate_with::<CreateLog>(create_log_limits);
        dispatcher.register::<CreateLog>(CreateLogHandler::new(queue.clone(), clock, ids))?;

        Ok(Self {
            store,
            queue,
            dispatcher,
            stats,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Route any registered command
    pub fn dispatch<Cmd: Command>(&self, command: Cmd) -> Result<Cmd::Response, DispatchError> {
        self.dispatcher.dispatch(command)
    }

    /// Validate and accept a new log
    ///
    /// Returns once the event is queued. The log becomes visible to
    /// queries after the worker appends it; await the returned completion
    /// to wait for that.
    pub fn submit_log(&self, command: CreateLog) -> Result<LogAccepted, DispatchError> {
        self.dispatch(command)
    }

    pub fn get_log(&self, log_id: &str) -> Result<Option<Log>, StoreError> {
        queries::get_log(&self.store, log_id)
    }

    pub fn list_logs(&self) -> Result<Vec<LogSummary>, StoreError> {
        queries::list_logs(&self.store)
    }

    /// Streams left out of listings because they failed integrity checks
    pub fn corrupted_streams(&self) -> Vec<String> {
        self.store.corrupted_streams()
    }

    pub fn client_activity(&self, client_id: &str) -> Result<Option<ClientActivity>, StoreError> {
        queries::client_activity(&self.store, client_id)
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    pub fn queue_depth(&self) -> usize {
        self.queue.depth()
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue.capacity()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Wait until everything accepted so far has been processed
    pub async fn flush(&self) -> Result<(), QueueError> {
        self.queue.flush().await
    }

    /// Refuse new commands, drain the queue and stop the worker
    ///
    /// Later calls return immediately.
    pub async fn shutdown(&self) -> StatsSnapshot {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(worker) = worker {
            self.queue.shutdown(worker).await;
        }
        self.stats.snapshot()
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
