// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn created(log_id: &str, client_id: &str, message: &str) -> LogEvent {
    LogEvent::Created(LogCreated {
        log_id: log_id.to_string(),
        client_id: client_id.to_string(),
        level: LogLevel::Trace,
        message: message.to_string(),
    })
}

#[test]
fn pending_event_is_keyed_by_client_and_log() {
    let now = Utc::now();
    let pending = created("log-1", "client-a", "hello")
        .to_pending("evt-1", now)
        .unwrap();

    assert_eq!(pending.aggregate_key, "client-a");
    assert_eq!(pending.entity_id, "log-1");
    assert_eq!(pending.kind, LogEvent::LOG_CREATED);
    assert_eq!(pending.payload["message"], "hello");
    assert_eq!(pending.payload["level"], "Trace");
}

#[test]
fn into_event_keeps_identity_and_adds_ordering() {
    let pending = created("log-1", "client-a", "hello")
        .to_pending("evt-1", Utc::now())
        .unwrap();
    let event = pending.clone().into_event(3, 17);

    assert_eq!(event.id, pending.id);
    assert_eq!(event.sequence, 3);
    assert_eq!(event.position, 17);
    assert_eq!(LogEvent::decode(&event), Some(created("log-1", "client-a", "hello")));
}

#[test]
fn decode_ignores_unknown_kinds() {
    let mut event = created("log-1", "client-a", "hello")
        .to_pending("evt-1", Utc::now())
        .unwrap()
        .into_event(1, 1);
    event.kind = "LogArchived".to_string();

    assert_eq!(LogEvent::decode(&event), None);
}

#[test]
fn decode_tolerates_additional_payload_fields() {
    let mut event = created("log-1", "client-a", "hello")
        .to_pending("evt-1", Utc::now())
        .unwrap()
        .into_event(1, 1);
    event.payload["source"] = json!("mobile");

    assert_eq!(LogEvent::decode(&event), Some(created("log-1", "client-a", "hello")));
}

#[test]
fn decode_skips_malformed_payload() {
    let mut event = created("log-1", "client-a", "hello")
        .to_pending("evt-1", Utc::now())
        .unwrap()
        .into_event(1, 1);
    event.payload = json!({ "log_id": 42 });

    assert_eq!(LogEvent::decode(&event), None);
}

#[test]
fn event_serializes_as_flat_record() {
    let event = created("log-1", "client-a", "hello")
        .to_pending("evt-1", Utc::now())
        .unwrap()
        .into_event(1, 1);
    let value = serde_json::to_value(&event).unwrap();

    assert_eq!(value["aggregate_key"], "client-a");
    assert_eq!(value["kind"], "LogCreated");
    let back: Event = serde_json::from_value(value).unwrap();
    assert_eq!(back, event);
}
