// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Utc;
use lb_core::{LogCreated, LogEvent, LogLevel, PendingEvent};

fn store_log(store: &EventStore, client_id: &str, log_id: &str, message: &str) {
    let pending = LogEvent::Created(LogCreated {
        log_id: log_id.to_string(),
        client_id: client_id.to_string(),
        level: LogLevel::Debug,
        message: message.to_string(),
    })
    .to_pending(format!("evt-{}", log_id), Utc::now())
    .unwrap();
    store.append(pending).unwrap();
}

#[test]
fn get_log_finds_stored_log() {
    let store = EventStore::in_memory();
    store_log(&store, "c", "log-1", "hello");

    let log = get_log(&store, "log-1").unwrap().unwrap();
    assert_eq!(log.message, "hello");
    assert_eq!(log.level, LogLevel::Debug);
}

#[test]
fn missing_ids_are_not_errors() {
    let store = EventStore::in_memory();
    assert_eq!(get_log(&store, "nope").unwrap(), None);
    assert_eq!(client_activity(&store, "nobody").unwrap(), None);
    assert!(list_logs(&store).unwrap().is_empty());
}

#[test]
fn repeated_queries_agree() {
    let store = EventStore::in_memory();
    store_log(&store, "c", "log-1", "hello");

    assert_eq!(get_log(&store, "log-1").unwrap(), get_log(&store, "log-1").unwrap());
    assert_eq!(list_logs(&store).unwrap(), list_logs(&store).unwrap());
}

#[test]
fn list_logs_follows_insertion_order_across_clients() {
    let store = EventStore::in_memory();
    store_log(&store, "b", "log-1", "first");
    store_log(&store, "a", "log-2", "second");
    store_log(&store, "b", "log-3", "third");

    let messages: Vec<String> = list_logs(&store)
        .unwrap()
        .into_iter()
        .map(|s| s.message)
        .collect();
    assert_eq!(messages, vec!["first", "second", "third"]);
}

#[test]
fn list_logs_skips_entities_without_a_creation_event() {
    let store = EventStore::in_memory();
    store_log(&store, "c", "log-1", "kept");
    store
        .append(PendingEvent {
            id: "evt-x".to_string(),
            aggregate_key: "c".to_string(),
            entity_id: "tag-9".to_string(),
            timestamp: Utc::now(),
            kind: "TagAdded".to_string(),
            payload: serde_json::json!({ "tag": "ops" }),
        })
        .unwrap();

    let logs = list_logs(&store).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].log_id, "log-1");

    // The unknown event still advances the client's stream
    let activity = client_activity(&store, "c").unwrap().unwrap();
    assert_eq!(activity.entries, 1);
    assert_eq!(activity.last_sequence, 2);
}
