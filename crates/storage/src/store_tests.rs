// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::faulty::{FaultPlan, FaultyJournal};
use chrono::Utc;
use lb_core::{ClientActivity, Log, LogCreated, LogEvent, LogLevel};
use std::io::Write;
use std::sync::Arc;

fn created(client_id: &str, log_id: &str, message: &str) -> PendingEvent {
    LogEvent::Created(LogCreated {
        log_id: log_id.to_string(),
        client_id: client_id.to_string(),
        level: LogLevel::Warning,
        message: message.to_string(),
    })
    .to_pending(format!("evt-{}", log_id), Utc::now())
    .unwrap()
}

#[test]
fn append_numbers_per_stream_and_globally() {
    let store = EventStore::in_memory();

    let a1 = store.append(created("a", "log-1", "one")).unwrap();
    let b1 = store.append(created("b", "log-2", "two")).unwrap();
    let a2 = store.append(created("a", "log-3", "three")).unwrap();

    assert_eq!((a1.sequence, a1.position), (1, 1));
    assert_eq!((b1.sequence, b1.position), (1, 2));
    assert_eq!((a2.sequence, a2.position), (2, 3));
    assert_eq!(store.event_count(), 3);
    assert_eq!(store.stream_len("a"), 2);
    assert_eq!(store.stream_len("missing"), 0);
}

#[test]
fn load_events_returns_stream_in_sequence_order() {
    let store = EventStore::in_memory();
    store.append(created("a", "log-1", "one")).unwrap();
    store.append(created("b", "log-2", "two")).unwrap();
    store.append(created("a", "log-3", "three")).unwrap();

    let sequences: Vec<u64> = store
        .load_events("a")
        .unwrap()
        .iter()
        .map(|e| e.sequence)
        .collect();
    assert_eq!(sequences, vec![1, 2]);
    assert!(store.load_events("nobody").unwrap().is_empty());
}

#[test]
fn query_rebuilds_aggregates_by_scope() {
    let store = EventStore::in_memory();
    store.append(created("a", "log-1", "one")).unwrap();
    store.append(created("a", "log-2", "two")).unwrap();

    let log: Log = store.query("log-2").unwrap().unwrap();
    assert_eq!(log.message, "two");
    assert_eq!(log.client_id, "a");
    assert_eq!(log.sequence, 2);

    let activity: ClientActivity = store.query("a").unwrap().unwrap();
    assert_eq!(activity.entries, 2);
    assert_eq!(activity.log_ids, vec!["log-1", "log-2"]);

    assert!(store.query::<Log>("log-404").unwrap().is_none());
    assert!(store.query::<ClientActivity>("nobody").unwrap().is_none());
}

#[test]
fn load_all_applies_filter() {
    let store = EventStore::in_memory();
    store.append(created("a", "log-1", "one")).unwrap();
    store.append(created("b", "log-2", "two")).unwrap();

    let all = store.load_all(&EventFilter::all()).unwrap();
    assert_eq!(all.len(), 2);

    let only_b = store
        .load_all(&EventFilter::all().kind(LogEvent::LOG_CREATED).aggregate_key("b"))
        .unwrap();
    assert_eq!(only_b.len(), 1);
    assert_eq!(only_b.first().unwrap().entity_id, "log-2");
}

#[test]
fn failed_append_leaves_numbering_unchanged() {
    let plan = FaultPlan::new();
    let store = EventStore::with_journal(FaultyJournal::new(MemoryJournal::new(), plan.clone()));

    store.append(created("a", "log-1", "one")).unwrap();
    plan.fail_next(1);
    let err = store.append(created("a", "log-2", "two")).unwrap_err();
    assert!(matches!(err, StoreError::Io(_)));
    assert!(!err.is_integrity());
    assert_eq!(store.event_count(), 1);

    let retried = store.append(created("a", "log-2", "two")).unwrap();
    assert_eq!((retried.sequence, retried.position), (2, 2));
    assert_eq!(plan.attempts(), 3);
    assert_eq!(plan.failures(), 1);
}

#[test]
fn reopen_replays_durable_events() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.wal");

    {
        let (store, report) = EventStore::open(&path).unwrap();
        assert_eq!(report, RecoveryReport::default());
        store.append(created("a", "log-1", "one")).unwrap();
        store.append(created("a", "log-2", "two")).unwrap();
    }

    let (store, report) = EventStore::open(&path).unwrap();
    assert_eq!(report.events_loaded, 2);
    assert_eq!(report.streams, 1);
    assert_eq!(store.path(), Some(path.as_path()));

    let next = store.append(created("a", "log-3", "three")).unwrap();
    assert_eq!((next.sequence, next.position), (3, 3));
}

#[test]
fn open_repairs_torn_tail() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.wal");
    {
        let (store, _) = EventStore::open(&path).unwrap();
        store.append(created("a", "log-1", "one")).unwrap();
    }
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(&path)
        .unwrap();
    file.write_all(br#"{"checksum":7,"eve"#).unwrap();
    drop(file);

    let (store, report) = EventStore::open(&path).unwrap();
    assert_eq!(report.truncated_at_line, Some(2));
    assert_eq!(report.events_loaded, 1);

    store.append(created("a", "log-2", "two")).unwrap();
    drop(store);

    let (_, report) = EventStore::open(&path).unwrap();
    assert_eq!(report.events_loaded, 2);
    assert_eq!(report.truncated_at_line, None);
}

#[test]
fn sequence_gap_on_disk_isolates_stream() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.wal");
    {
        let mut wal = Wal::open(&path).unwrap();
        wal.append(&created("a", "log-1", "one").into_event(1, 1))
            .unwrap();
        wal.append(&created("b", "log-2", "two").into_event(1, 2))
            .unwrap();
        wal.append(&created("a", "log-3", "three").into_event(3, 3))
            .unwrap();
    }

    let (store, report) = EventStore::open(&path).unwrap();
    assert_eq!(report.corrupted_streams, vec!["a"]);
    assert_eq!(store.corrupted_streams(), vec!["a"]);

    let err = store.load_events("a").unwrap_err();
    assert!(err.is_integrity());
    assert!(store.query::<Log>("log-1").is_err());
    assert!(store.append(created("a", "log-4", "four")).is_err());

    // Other streams keep working
    let b = store.append(created("b", "log-5", "five")).unwrap();
    assert_eq!((b.sequence, b.position), (2, 4));
    assert_eq!(store.load_all(&EventFilter::all()).unwrap().len(), 2);
}

#[test]
fn concurrent_appends_to_one_stream_stay_contiguous() {
    let store = Arc::new(EventStore::in_memory());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for i in 0..25 {
                    store
                        .append(created("shared", &format!("log-{}-{}", t, i), "m"))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let sequences: Vec<u64> = store
        .load_events("shared")
        .unwrap()
        .iter()
        .map(|e| e.sequence)
        .collect();
    assert_eq!(sequences, (1..=200).collect::<Vec<u64>>());
}
