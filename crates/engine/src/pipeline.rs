// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command dispatch table
//!
//! Routes are keyed by the command's type. Each route holds the validation
//! stages for that command, in registration order, and at most one handler:
//!
//! ```text
//! dispatch(cmd) → stage 1 → stage 2 → … → handler → Response
//!                    ↘ first failure: DispatchError::Validation
//! ```

use crate::error::{DispatchError, RegistrationError};
use crate::validation::ValidationErrors;
use std::any::{Any, TypeId};
use std::collections::HashMap;

/// A request the dispatcher can route
pub trait Command: Send + 'static {
    /// Name used in logs and errors
    const NAME: &'static str;
    type Response: Send + 'static;
}

/// Executes one command type after validation has passed
pub trait Handler<C: Command>: Send + Sync + 'static {
    fn handle(&self, command: C) -> Result<C::Response, DispatchError>;
}

impl<C, F> Handler<C> for F
where
    C: Command,
    F: Fn(C) -> Result<C::Response, DispatchError> + Send + Sync + 'static,
{
    fn handle(&self, command: C) -> Result<C::Response, DispatchError> {
        self(command)
    }
}

type Stage<C> = Box<dyn Fn(&C) -> Result<(), ValidationErrors> + Send + Sync>;

struct Route<C: Command> {
    stages: Vec<Stage<C>>,
    handler: Option<Box<dyn Handler<C>>>,
}

impl<C: Command> Route<C> {
    fn new() -> Self {
        Self {
            stages: Vec::new(),
            handler: None,
        }
    }
}

/// Type-indexed table of validation stages and handlers
#[derive(Default)]
pub struct Dispatcher {
    routes: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for `C`
    pub fn register<C: Command>(
        &mut self,
        handler: impl Handler<C>,
    ) -> Result<(), RegistrationError> {
        let route = self.route_mut::<C>();
        if route.handler.is_some() {
            return Err(RegistrationError::DuplicateHandler(C::NAME));
        }
        route.handler = Some(Box::new(handler));
        Ok(())
    }

    /// Append a validation stage for `C`
    pub fn validate_with<C: Command>(
        &mut self,
        stage: impl Fn(&C) -> Result<(), ValidationErrors> + Send + Sync + 'static,
    ) {
        self.route_mut::<C>().stages.push(Box::new(stage));
    }

    /// Whether a handler exists for `C`
    pub fn handles<C: Command>(&self) -> bool {
        self.route::<C>().is_some_and(|r| r.handler.is_some())
    }

    /// Validate `command` and hand it to its handler
    ///
    /// Stops at the first stage that fails; the handler only runs when
    /// every stage passes.
    pub fn dispatch<C: Command>(&self, command: C) -> Result<C::Response, DispatchError> {
        let _span = tracing::debug_span!("dispatch", command = C::NAME).entered();

        let Some(route) = self.route::<C>() else {
            return Err(DispatchError::NoHandler(C::NAME));
        };
        let Some(handler) = route.handler.as_deref() else {
            return Err(DispatchError::NoHandler(C::NAME));
        };

        for stage in &route.stages {
            if let Err(errors) = stage(&command) {
                tracing::debug!(%errors, "command rejected");
                return Err(DispatchError::Validation(errors));
            }
        }

        handler.handle(command)
    }

    fn route<C: Command>(&self) -> Option<&Route<C>> {
        self.routes
            .get(&TypeId::of::<C>())
            .and_then(|r| r.downcast_ref::<Route<C>>())
    }

    fn route_mut<C: Command>(&mut self) -> &mut Route<C> {
        let slot = self
            .routes
            .entry(TypeId::of::<C>())
            .or_insert_with(|| Box::new(Route::<C>::new()) as Box<dyn Any + Send + Sync>);
        // Slots are keyed by TypeId::of::<C>()
        match slot.downcast_mut::<Route<C>>() {
            Some(route) => route,
            None => unreachable!("route slot holds a different command type"),
        }
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
