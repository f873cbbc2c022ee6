// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime tests

use super::*;
use lb_core::{FakeClock, LogLevel, SequentialIdGen};

fn setup() -> Runtime {
    Runtime::start(
        Arc::new(EventStore::in_memory()),
        FakeClock::new(),
        SequentialIdGen::new("id"),
        RuntimeConfig::default(),
    )
    .unwrap()
}

struct Ping;

impl Command for Ping {
    const NAME: &'static str = "ping";
    type Response = ();
}

#[tokio::test]
async fn submitted_log_is_queryable_after_completion() {
    let runtime = setup();

    let accepted = runtime
        .submit_log(CreateLog::new("client-1", "Error", "boom"))
        .unwrap();
    let stored = accepted.completion.wait().await.unwrap();
    assert_eq!(stored[0].sequence, 1);

    let log = runtime.get_log(&accepted.log_id).unwrap().unwrap();
    assert_eq!(log.message, "boom");
    assert_eq!(log.level, LogLevel::Error);
    assert_eq!(log.client_id, "client-1");

    runtime.shutdown().await;
}

#[tokio::test]
async fn rejected_command_leaves_store_untouched() {
    let runtime = setup();
    runtime
        .submit_log(CreateLog::new("c", "Trace", "kept"))
        .unwrap();
    runtime.flush().await.unwrap();
    let before = runtime.store().event_count();

    let err = runtime
        .submit_log(CreateLog::new("c", "Shouting", ""))
        .unwrap_err();
    let DispatchError::Validation(errors) = err else {
        panic!("expected validation error, got {:?}", err);
    };
    let fields: Vec<&str> = errors.errors().iter().map(|e| e.field.as_str()).collect();
    assert_eq!(fields, vec!["level", "message"]);

    runtime.flush().await.unwrap();
    assert_eq!(runtime.store().event_count(), before);
    assert_eq!(runtime.store().stream_len("c"), 1);
    runtime.shutdown().await;
}

#[tokio::test]
async fn oversized_message_fails_the_limits_stage() {
    let runtime = setup();
    let err = runtime
        .submit_log(CreateLog::new(
            "c",
            "Trace",
            "x".repeat(crate::validation::MAX_MESSAGE_LEN + 1),
        ))
        .unwrap_err();
    assert!(matches!(err, DispatchError::Validation(_)));
    runtime.shutdown().await;
}

#[tokio::test]
async fn unregistered_command_has_no_handler() {
    let runtime = setup();
    assert!(matches!(
        runtime.dispatch(Ping),
        Err(DispatchError::NoHandler("ping"))
    ));
    runtime.shutdown().await;
}

#[tokio::test]
async fn list_and_activity_reflect_flushed_logs() {
    let runtime = setup();
    for message in ["a", "b", "c"] {
        runtime
            .submit_log(CreateLog::new("client-9", "Information", message))
            .unwrap();
    }
    runtime.flush().await.unwrap();

    let messages: Vec<String> = runtime
        .list_logs()
        .unwrap()
        .into_iter()
        .map(|s| s.message)
        .collect();
    assert_eq!(messages, vec!["a", "b", "c"]);

    let activity = runtime.client_activity("client-9").unwrap().unwrap();
    assert_eq!(activity.entries, 3);
    assert_eq!(activity.last_sequence, 3);
    runtime.shutdown().await;
}

#[tokio::test]
async fn shutdown_is_idempotent_and_closes_intake() {
    let runtime = setup();
    runtime
        .submit_log(CreateLog::new("c", "Trace", "m"))
        .unwrap();

    let stats = runtime.shutdown().await;
    assert_eq!(stats.events_appended, 1);
    assert_eq!(runtime.shutdown().await, stats);

    let err = runtime
        .submit_log(CreateLog::new("c", "Trace", "late"))
        .unwrap_err();
    assert!(matches!(err, DispatchError::Queue(QueueError::Closed)));
    assert_eq!(runtime.flush().await, Err(QueueError::Closed));
}
