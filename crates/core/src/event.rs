// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events: the append-only facts the store keeps
//!
//! A handler builds a [`PendingEvent`]; the store turns it into an [`Event`]
//! by assigning the per-stream `sequence` and the store-wide `position`.
//! Payloads are JSON so that older binaries can read logs written by newer
//! ones: unknown kinds and unknown fields are skipped, never rejected.

use crate::command::LogLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An event that has been durably appended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Unique event id
    pub id: String,
    /// Stream the event belongs to (the client id)
    pub aggregate_key: String,
    /// Entity the event describes (the log id)
    pub entity_id: String,
    /// 1-based, contiguous within `aggregate_key`
    pub sequence: u64,
    /// Store-wide insertion counter, strictly increasing
    pub position: u64,
    pub timestamp: DateTime<Utc>,
    /// Type discriminator for `payload`
    pub kind: String,
    pub payload: serde_json::Value,
}

/// An event produced by a handler, waiting for the store to number it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEvent {
    pub id: String,
    pub aggregate_key: String,
    pub entity_id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: String,
    pub payload: serde_json::Value,
}

impl PendingEvent {
    /// Stamp the store-assigned ordering onto the event
    pub fn into_event(self, sequence: u64, position: u64) -> Event {
        Event {
            id: self.id,
            aggregate_key: self.aggregate_key,
            entity_id: self.entity_id,
            sequence,
            position,
            timestamp: self.timestamp,
            kind: self.kind,
            payload: self.payload,
        }
    }
}

/// Payload of a `LogCreated` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogCreated {
    pub log_id: String,
    pub client_id: String,
    pub level: LogLevel,
    pub message: String,
}

/// Typed view over the event kinds this crate understands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    Created(LogCreated),
}

impl LogEvent {
    pub const LOG_CREATED: &'static str = "LogCreated";

    pub fn kind(&self) -> &'static str {
        match self {
            LogEvent::Created(_) => Self::LOG_CREATED,
        }
    }

    /// Decode a stored event
    ///
    /// Returns `None` for kinds this version does not know, and for known
    /// kinds whose payload cannot be read.
    pub fn decode(event: &Event) -> Option<Self> {
        match event.kind.as_str() {
            Self::LOG_CREATED => match serde_json::from_value(event.payload.clone()) {
                Ok(created) => Some(LogEvent::Created(created)),
                Err(e) => {
                    tracing::warn!(
                        event_id = %event.id,
                        error = %e,
                        "skipping unreadable LogCreated payload"
                    );
                    None
                }
            },
            _ => None,
        }
    }

    /// Build the pending event for this payload
    pub fn to_pending(
        &self,
        event_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<PendingEvent, serde_json::Error> {
        let (aggregate_key, entity_id, payload) = match self {
            LogEvent::Created(created) => (
                created.client_id.clone(),
                created.log_id.clone(),
                serde_json::to_value(created)?,
            ),
        };
        Ok(PendingEvent {
            id: event_id.into(),
            aggregate_key,
            entity_id,
            timestamp,
            kind: self.kind().to_string(),
            payload,
        })
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
