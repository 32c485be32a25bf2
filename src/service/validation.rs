//! Field-level validation.
//!
//! [`Validator`] collects every violation instead of stopping at the first,
//! so a caller sees all problems with a request at once.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One violated rule on one input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Wire name of the offending field.
    pub field: String,
    pub message: String,
}

impl FieldError {
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Non-empty list of field violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Validation failed")]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    #[must_use]
    pub const fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    /// Creates a validation error with a single field error.
    #[must_use]
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(vec![FieldError::new(field, message)])
    }
}

/// Accumulates field errors while a request is being checked.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the error of `result`, if any, against `field`.
    pub fn check<T, E: fmt::Display>(&mut self, field: &str, result: Result<T, E>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.errors.push(FieldError::new(field, error.to_string()));
                None
            }
        }
    }

    /// Like [`check`](Self::check) for a mandatory field: `None` is
    /// recorded as "`label` is required".
    pub fn require<T, U, E, F>(
        &mut self,
        field: &str,
        label: &str,
        value: Option<T>,
        parse: F,
    ) -> Option<U>
    where
        E: fmt::Display,
        F: FnOnce(T) -> Result<U, E>,
    {
        match value {
            Some(value) => self.check(field, parse(value)),
            None => {
                self.errors
                    .push(FieldError::new(field, format!("{label} is required")));
                None
            }
        }
    }

    /// Like [`check`](Self::check) for an optional field: `None` passes
    /// through untouched.
    pub fn optional<T, U, E, F>(&mut self, field: &str, value: Option<T>, parse: F) -> Option<U>
    where
        E: fmt::Display,
        F: FnOnce(T) -> Result<U, E>,
    {
        value.and_then(|value| self.check(field, parse(value)))
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns `Ok(())` when nothing was recorded.
    ///
    /// # Errors
    ///
    /// Returns every recorded violation, in the order they were found.
    pub fn finish(self) -> Result<(), ValidationError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(self.errors))
        }
    }

    /// Consumes the validator into its errors, whether or not any were
    /// recorded.
    #[must_use]
    pub fn into_error(self) -> ValidationError {
        ValidationError::new(self.errors)
    }
}
