// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Aggregates: state derived by folding events
//!
//! Nothing here is stored. An aggregate exists only as the fold of the
//! events recorded for its key, so the same events always produce the same
//! state.

use crate::command::LogLevel;
use crate::event::{Event, LogEvent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

/// Which store index an aggregate's key refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Key is an aggregate key (client id); events in sequence order
    Stream,
    /// Key is an entity id (log id); events in store order
    Entity,
}

/// A fold over events
///
/// `apply` must be total: events it does not understand leave the state
/// unchanged.
pub trait Aggregate: Clone + Send + Sync + 'static {
    const NAME: &'static str;
    const SCOPE: Scope;

    /// State before any event has been applied
    fn initial() -> Self;

    fn apply(self, event: &Event) -> Self;
}

/// Fold events into an aggregate
///
/// Returns `None` when there are no events: an aggregate with no history
/// does not exist.
pub fn replay<A, I>(events: I) -> Option<A>
where
    A: Aggregate,
    I: IntoIterator,
    I::Item: Borrow<Event>,
{
    let mut events = events.into_iter().peekable();
    events.peek()?;
    Some(events.fold(A::initial(), |state, event| state.apply(event.borrow())))
}

/// A single log record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    pub log_id: String,
    pub client_id: String,
    pub level: LogLevel,
    pub message: String,
    pub created_at: Option<DateTime<Utc>>,
    /// Sequence of the creating event within the client's stream
    pub sequence: u64,
}

impl Aggregate for Log {
    const NAME: &'static str = "log";
    const SCOPE: Scope = Scope::Entity;

    fn initial() -> Self {
        Self::default()
    }

    fn apply(self, event: &Event) -> Self {
        match LogEvent::decode(event) {
            Some(LogEvent::Created(created)) => Log {
                log_id: created.log_id,
                client_id: created.client_id,
                level: created.level,
                message: created.message,
                created_at: Some(event.timestamp),
                sequence: event.sequence,
            },
            None => self,
        }
    }
}

/// Listing row for a log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSummary {
    pub log_id: String,
    pub client_id: String,
    pub level: LogLevel,
    pub message: String,
}

impl From<&Log> for LogSummary {
    fn from(log: &Log) -> Self {
        Self {
            log_id: log.log_id.clone(),
            client_id: log.client_id.clone(),
            level: log.level,
            message: log.message.clone(),
        }
    }
}

/// Everything one client has logged, in stream order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientActivity {
    pub client_id: String,
    pub entries: u64,
    pub last_sequence: u64,
    pub last_seen: Option<DateTime<Utc>>,
    pub log_ids: Vec<String>,
}

impl Aggregate for ClientActivity {
    const NAME: &'static str = "client_activity";
    const SCOPE: Scope = Scope::Stream;

    fn initial() -> Self {
        Self::default()
    }

    fn apply(mut self, event: &Event) -> Self {
        if let Some(LogEvent::Created(created)) = LogEvent::decode(event) {
            self.client_id = created.client_id;
            self.entries += 1;
            self.log_ids.push(created.log_id);
        }
        // Ordering metadata advances for every event in the stream,
        // including kinds this version cannot read.
        self.last_sequence = event.sequence;
        self.last_seen = Some(event.timestamp);
        self
    }
}

#[cfg(test)]
#[path = "aggregate_tests.rs"]
mod tests;
