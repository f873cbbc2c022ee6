// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Validation stages run before a command reaches its handler

use lb_core::{CreateLog, LogLevel};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest message accepted, in bytes
pub const MAX_MESSAGE_LEN: usize = 8192;

/// A problem with one field of a command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Field errors reported by one validation stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }

    /// `Ok` when nothing was pushed
    pub fn into_result(self) -> Result<(), Self> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
        }
        Ok(())
    }
}

/// Required fields are present and well-formed
///
/// Reports every bad field at once.
pub fn create_log_shape(command: &CreateLog) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if command.client_id.trim().is_empty() {
        errors.push("client_id", "must not be empty");
    }
    if command.level.parse::<LogLevel>().is_err() {
        let known: Vec<&str> = LogLevel::ALL.iter().map(LogLevel::as_str).collect();
        errors.push(
            "level",
            format!("unknown level '{}', expected one of {}", command.level, known.join(", ")),
        );
    }
    if command.message.is_empty() {
        errors.push("message", "must not be empty");
    }
    errors.into_result()
}

/// Sizes stay within what the store accepts
pub fn create_log_limits(command: &CreateLog) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if command.message.len() > MAX_MESSAGE_LEN {
        errors.push(
            "message",
            format!("must be at most {} bytes, got {}", MAX_MESSAGE_LEN, command.message.len()),
        );
    }
    errors.into_result()
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod tests;
