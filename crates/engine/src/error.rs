// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for command dispatch

use crate::queue::QueueError;
use crate::validation::ValidationErrors;
use thiserror::Error;

/// Why a command was not accepted
///
/// Every variant is reported synchronously, before anything is persisted.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error("no handler registered for command {0}")]
    NoHandler(&'static str),
    #[error("failed to encode event payload: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<ValidationErrors> for DispatchError {
    fn from(errors: ValidationErrors) -> Self {
        DispatchError::Validation(errors)
    }
}

/// Why a runtime could not be started
#[derive(Debug, Error)]
pub enum StartError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    #[error("failed to spawn persistence worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),
}

/// Errors building a dispatch table
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("a handler for command {0} is already registered")]
    DuplicateHandler(&'static str),
}
