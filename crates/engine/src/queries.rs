// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read side: aggregates rebuilt from the store on every call
//!
//! Queries never touch the persistence queue. A log accepted moments ago
//! may not be visible until the worker has appended it.

use lb_core::{replay, ClientActivity, Event, Log, LogSummary};
use lb_storage::{EventFilter, EventStore, StoreError};
use std::collections::HashMap;

/// One log by id; `Ok(None)` when it was never stored
pub fn get_log(store: &EventStore, log_id: &str) -> Result<Option<Log>, StoreError> {
    store.query::<Log>(log_id)
}

/// Activity of one client; `Ok(None)` when it has no events
pub fn client_activity(
    store: &EventStore,
    client_id: &str,
) -> Result<Option<ClientActivity>, StoreError> {
    store.query::<ClientActivity>(client_id)
}

/// Every readable log, in the order the logs were first stored
///
/// Streams marked corrupted are left out.
pub fn list_logs(store: &EventStore) -> Result<Vec<LogSummary>, StoreError> {
    let events = store.load_all(&EventFilter::all())?;

    let mut order: Vec<&str> = Vec::new();
    let mut by_entity: HashMap<&str, Vec<&Event>> = HashMap::new();
    for event in &events {
        by_entity
            .entry(event.entity_id.as_str())
            .or_insert_with(|| {
                order.push(event.entity_id.as_str());
                Vec::new()
            })
            .push(event);
    }

    Ok(order
        .into_iter()
        .filter_map(|id| by_entity.remove(id))
        .filter_map(replay::<Log, _>)
        // Entities without a creation event are not logs
        .filter(|log| !log.log_id.is_empty())
        .map(|log| LogSummary::from(&log))
        .collect())
}

#[cfg(test)]
#[path = "queries_tests.rs"]
mod tests;
