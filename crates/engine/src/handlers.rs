// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command handlers

use crate::error::DispatchError;
use crate::pipeline::{Command, Handler};
use crate::queue::{Completion, PersistenceQueue};
use crate::validation::ValidationErrors;
use lb_core::{Clock, CreateLog, IdGen, LogCreated, LogEvent, LogLevel};

impl Command for CreateLog {
    const NAME: &'static str = "create_log";
    type Response = LogAccepted;
}

/// Acknowledgment for an accepted `CreateLog`
///
/// Returned before the event is durable. Await `completion` when the
/// caller needs the log to be queryable.
#[derive(Debug)]
pub struct LogAccepted {
    pub log_id: String,
    pub completion: Completion,
}

/// Turns `CreateLog` into a `LogCreated` event and enqueues it
pub struct CreateLogHandler<C, I> {
    queue: PersistenceQueue,
    clock: C,
    ids: I,
}

impl<C: Clock, I: IdGen> CreateLogHandler<C, I> {
    pub fn new(queue: PersistenceQueue, clock: C, ids: I) -> Self {
        Self { queue, clock, ids }
    }
}

impl<C, I> Handler<CreateLog> for CreateLogHandler<C, I>
where
    C: Clock + 'static,
    I: IdGen + 'static,
{
    fn handle(&self, command: CreateLog) -> Result<LogAccepted, DispatchError> {
        let level: LogLevel = command.level.parse().map_err(|e| {
            let mut errors = ValidationErrors::new();
            errors.push("level", format!("{}", e));
            DispatchError::Validation(errors)
        })?;

        let log_id = self.ids.next();
        let event = LogEvent::Created(LogCreated {
            log_id: log_id.clone(),
            client_id: command.client_id,
            level,
            message: command.message,
        });
        let pending = event.to_pending(self.ids.next(), self.clock.now())?;
        let completion = self.queue.enqueue(vec![pending])?;

        tracing::debug!(%log_id, %level, "log accepted");
        Ok(LogAccepted { log_id, completion })
    }
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
