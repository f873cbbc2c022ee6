// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Utc;

fn event(key: &str, entity: &str, sequence: u64, position: u64) -> Event {
    Event {
        id: format!("evt-{}", position),
        aggregate_key: key.to_string(),
        entity_id: entity.to_string(),
        sequence,
        position,
        timestamp: Utc::now(),
        kind: "LogCreated".to_string(),
        payload: serde_json::json!({}),
    }
}

#[test]
fn apply_indexes_streams_and_entities() {
    let mut state = StoreState::new();
    state.apply(event("a", "log-1", 1, 1)).unwrap();
    state.apply(event("b", "log-2", 1, 2)).unwrap();
    state.apply(event("a", "log-3", 2, 3)).unwrap();

    let stream: Vec<u64> = state.stream("a").unwrap().iter().map(|e| e.position).collect();
    assert_eq!(stream, vec![1, 3]);
    assert_eq!(state.entity("log-2").unwrap().len(), 1);
    assert_eq!(state.len(), 3);
    assert_eq!(state.stream_count(), 2);
    assert_eq!(state.next_sequence("a").unwrap(), 3);
    assert_eq!(state.next_sequence("new").unwrap(), 1);
    assert_eq!(state.next_position(), 4);
}

#[test]
fn unknown_keys_yield_empty_streams() {
    let state = StoreState::new();
    assert!(state.stream("missing").unwrap().is_empty());
    assert!(state.entity("missing").unwrap().is_empty());
}

#[test]
fn sequence_gap_corrupts_only_that_stream() {
    let mut state = StoreState::new();
    state.apply(event("a", "log-1", 1, 1)).unwrap();
    state.apply(event("b", "log-2", 1, 2)).unwrap();

    let err = state.apply(event("a", "log-3", 3, 3)).unwrap_err();
    assert_eq!(
        err,
        IntegrityError::SequenceGap {
            aggregate_key: "a".to_string(),
            expected: 2,
            found: 3,
        }
    );

    assert!(matches!(
        state.stream("a"),
        Err(IntegrityError::StreamCorrupted { .. })
    ));
    assert!(matches!(
        state.entity("log-1"),
        Err(IntegrityError::StreamCorrupted { .. })
    ));
    assert!(state.next_sequence("a").is_err());
    assert_eq!(state.stream("b").unwrap().len(), 1);
    assert_eq!(state.corrupted_streams(), vec!["a"]);

    // Later events for the corrupted stream are refused outright
    assert!(matches!(
        state.apply(event("a", "log-4", 2, 4)),
        Err(IntegrityError::StreamCorrupted { .. })
    ));
}

#[test]
fn duplicate_sequence_is_a_gap() {
    let mut state = StoreState::new();
    state.apply(event("a", "log-1", 1, 1)).unwrap();
    assert!(matches!(
        state.apply(event("a", "log-2", 1, 2)),
        Err(IntegrityError::SequenceGap { expected: 2, found: 1, .. })
    ));
}

#[test]
fn position_must_advance() {
    let mut state = StoreState::new();
    state.apply(event("a", "log-1", 1, 5)).unwrap();
    assert!(matches!(
        state.apply(event("b", "log-2", 1, 5)),
        Err(IntegrityError::PositionRegression { position: 5, last: 5, .. })
    ));
}

#[test]
fn select_filters_in_store_order() {
    let mut state = StoreState::new();
    state.apply(event("a", "log-1", 1, 1)).unwrap();
    state.apply(event("b", "log-2", 1, 2)).unwrap();
    state.apply(event("a", "log-3", 2, 3)).unwrap();

    let all: Vec<u64> = state
        .select(&EventFilter::all())
        .unwrap()
        .iter()
        .map(|e| e.position)
        .collect();
    assert_eq!(all, vec![1, 2, 3]);

    let after: Vec<u64> = state
        .select(&EventFilter::all().after(1).aggregate_key("a"))
        .unwrap()
        .iter()
        .map(|e| e.position)
        .collect();
    assert_eq!(after, vec![3]);

    assert!(state
        .select(&EventFilter::all().kind("LogArchived"))
        .unwrap()
        .is_empty());
}

#[test]
fn select_skips_corrupted_streams() {
    let mut state = StoreState::new();
    state.apply(event("a", "log-1", 1, 1)).unwrap();
    state.apply(event("b", "log-2", 1, 2)).unwrap();
    let _ = state.apply(event("a", "log-3", 7, 3));

    let keys: Vec<String> = state
        .select(&EventFilter::all())
        .unwrap()
        .iter()
        .map(|e| e.aggregate_key.clone())
        .collect();
    assert_eq!(keys, vec!["b"]);
    assert!(state.select(&EventFilter::all().aggregate_key("a")).is_err());
}

#[test]
fn streams_are_restartable_snapshots() {
    let mut state = StoreState::new();
    state.apply(event("a", "log-1", 1, 1)).unwrap();
    let snapshot = state.stream("a").unwrap();
    state.apply(event("a", "log-2", 2, 2)).unwrap();

    let first: Vec<&str> = snapshot.iter().map(|e| e.id.as_str()).collect();
    let second: Vec<&str> = (&snapshot).into_iter().map(|e| e.id.as_str()).collect();
    assert_eq!(first, vec!["evt-1"]);
    assert_eq!(first, second);
}

#[test]
fn refused_positions_are_not_reused() {
    let mut state = StoreState::new();
    state.apply(event("a", "log-1", 1, 1)).unwrap();
    let _ = state.apply(event("a", "log-2", 5, 2));

    assert_eq!(state.len(), 1);
    assert_eq!(state.next_position(), 3);
}
