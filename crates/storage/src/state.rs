// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized index over the event log
//!
//! Rebuilt from WAL replay on open and extended after every durable append.
//! Events are held once in store order; per-stream and per-entity indexes
//! point into that list.

use lb_core::Event;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// The log violates an ordering invariant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("sequence gap in stream {aggregate_key}: expected {expected}, found {found}")]
    SequenceGap {
        aggregate_key: String,
        expected: u64,
        found: u64,
    },
    #[error("position {position} does not follow {last} (stream {aggregate_key})")]
    PositionRegression {
        aggregate_key: String,
        position: u64,
        last: u64,
    },
    #[error("stream {aggregate_key} is corrupted: {cause}")]
    StreamCorrupted {
        aggregate_key: String,
        cause: Box<IntegrityError>,
    },
}

/// Selects events for [`StoreState::select`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub kind: Option<String>,
    pub aggregate_key: Option<String>,
    pub entity_id: Option<String>,
    /// Only events with a position strictly greater than this
    pub after_position: Option<u64>,
}

impl EventFilter {
    /// Every event in the store
    pub fn all() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn aggregate_key(mut self, key: impl Into<String>) -> Self {
        self.aggregate_key = Some(key.into());
        self
    }

    pub fn entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    pub fn after(mut self, position: u64) -> Self {
        self.after_position = Some(position);
        self
    }

    pub fn matches(&self, event: &Event) -> bool {
        self.kind.as_ref().map_or(true, |k| *k == event.kind)
            && self
                .aggregate_key
                .as_ref()
                .map_or(true, |k| *k == event.aggregate_key)
            && self
                .entity_id
                .as_ref()
                .map_or(true, |id| *id == event.entity_id)
            && self.after_position.map_or(true, |p| event.position > p)
    }
}

/// An immutable, ordered snapshot of events
///
/// Iterating does not touch the store, so a stream can be walked any number
/// of times and stays consistent with the moment it was loaded.
#[derive(Debug, Clone, Default)]
pub struct EventStream {
    events: Vec<Arc<Event>>,
}

impl EventStream {
    pub fn iter(&self) -> impl Iterator<Item = &Event> + '_ {
        self.events.iter().map(|e| e.as_ref())
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn first(&self) -> Option<&Event> {
        self.events.first().map(|e| e.as_ref())
    }

    pub fn last(&self) -> Option<&Event> {
        self.events.last().map(|e| e.as_ref())
    }
}

impl<'a> IntoIterator for &'a EventStream {
    type Item = &'a Event;
    type IntoIter = std::iter::Map<std::slice::Iter<'a, Arc<Event>>, fn(&Arc<Event>) -> &Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events
            .iter()
            .map(unwrap_arc as fn(&Arc<Event>) -> &Event)
    }
}

fn unwrap_arc(event: &Arc<Event>) -> &Event {
    event
}

/// Index of all appended events
#[derive(Debug, Default)]
pub struct StoreState {
    log: Vec<Arc<Event>>,
    streams: HashMap<String, Vec<usize>>,
    entities: HashMap<String, Vec<usize>>,
    corrupted: HashMap<String, IntegrityError>,
    /// Highest position seen, including refused events
    high_water: u64,
}

impl StoreState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence the next event of `aggregate_key` must carry
    pub fn next_sequence(&self, aggregate_key: &str) -> Result<u64, IntegrityError> {
        self.check_stream(aggregate_key)?;
        Ok(self.last_sequence(aggregate_key) + 1)
    }

    /// Position the next appended event must carry
    pub fn next_position(&self) -> u64 {
        self.last_position() + 1
    }

    /// Highest position seen so far
    ///
    /// Refused events still count, so positions are never reused after a
    /// stream has been marked corrupted.
    pub fn last_position(&self) -> u64 {
        self.high_water
    }

    pub fn last_sequence(&self, aggregate_key: &str) -> u64 {
        self.streams
            .get(aggregate_key)
            .and_then(|idx| idx.last())
            .map(|&i| self.log[i].sequence)
            .unwrap_or(0)
    }

    /// Add an event to the index
    ///
    /// A sequence gap or a position that does not advance marks the event's
    /// stream as corrupted; the event is not indexed and later events for
    /// that stream are refused.
    pub fn apply(&mut self, event: Event) -> Result<(), IntegrityError> {
        let key = event.aggregate_key.clone();
        let last = self.high_water;
        self.high_water = self.high_water.max(event.position);
        self.check_stream(&key)?;

        if event.position <= last {
            return Err(self.mark_corrupted(
                key.clone(),
                IntegrityError::PositionRegression {
                    aggregate_key: key,
                    position: event.position,
                    last,
                },
            ));
        }

        let expected = self.last_sequence(&key) + 1;
        if event.sequence != expected {
            return Err(self.mark_corrupted(
                key.clone(),
                IntegrityError::SequenceGap {
                    aggregate_key: key,
                    expected,
                    found: event.sequence,
                },
            ));
        }

        let index = self.log.len();
        self.entities
            .entry(event.entity_id.clone())
            .or_default()
            .push(index);
        self.streams.entry(key).or_default().push(index);
        self.log.push(Arc::new(event));
        Ok(())
    }

    /// Events of one stream in sequence order
    pub fn stream(&self, aggregate_key: &str) -> Result<EventStream, IntegrityError> {
        self.check_stream(aggregate_key)?;
        Ok(self.collect(self.streams.get(aggregate_key)))
    }

    /// Events describing one entity in store order
    pub fn entity(&self, entity_id: &str) -> Result<EventStream, IntegrityError> {
        let stream = self.collect(self.entities.get(entity_id));
        for event in stream.iter() {
            self.check_stream(&event.aggregate_key)?;
        }
        Ok(stream)
    }

    /// Events matching `filter` in store order
    ///
    /// Events of corrupted streams are left out; asking for a corrupted
    /// stream by key is an error.
    pub fn select(&self, filter: &EventFilter) -> Result<EventStream, IntegrityError> {
        if let Some(key) = &filter.aggregate_key {
            self.check_stream(key)?;
        }
        let events = self
            .log
            .iter()
            .filter(|e| filter.matches(e) && !self.corrupted.contains_key(&e.aggregate_key))
            .cloned()
            .collect();
        if !self.corrupted.is_empty() {
            tracing::warn!(
                streams = ?self.corrupted_streams(),
                "events of corrupted streams left out of bulk read"
            );
        }
        Ok(EventStream { events })
    }

    /// Total number of indexed events
    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    /// Keys of streams refused because of an integrity violation
    pub fn corrupted_streams(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.corrupted.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    fn check_stream(&self, aggregate_key: &str) -> Result<(), IntegrityError> {
        match self.corrupted.get(aggregate_key) {
            Some(cause) => Err(IntegrityError::StreamCorrupted {
                aggregate_key: aggregate_key.to_string(),
                cause: Box::new(cause.clone()),
            }),
            None => Ok(()),
        }
    }

    fn mark_corrupted(&mut self, key: String, error: IntegrityError) -> IntegrityError {
        tracing::error!(aggregate_key = %key, %error, "stream integrity violated");
        self.corrupted.insert(key, error.clone());
        error
    }

    fn collect(&self, indexes: Option<&Vec<usize>>) -> EventStream {
        let events = indexes
            .map(|idx| idx.iter().map(|&i| Arc::clone(&self.log[i])).collect())
            .unwrap_or_default();
        EventStream { events }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
