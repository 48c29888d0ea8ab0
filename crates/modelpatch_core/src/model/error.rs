//! Validation error contracts for the model layer.
//!
//! # Responsibility
//! - Describe every failure produced while constructing or assigning models.
//! - Keep error locations stable so callers can map them back to input keys.
//!
//! # Invariants
//! - A `ValidationError` always carries at least one `ErrorDetail`.
//! - Locations are field names, never aliases.

use std::fmt::{Display, Formatter};
use thiserror::Error;

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Failure category for one validation detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Required field was not supplied and has no default.
    Missing,
    /// Value does not match the declared annotation.
    TypeMismatch,
    /// A field validator rejected the value.
    FieldValidator,
    /// A model validator rejected the combined field values.
    ModelValidator,
    /// Assignment targeted a field the model does not declare.
    UnknownField,
}

impl ErrorKind {
    /// Stable identifier used in log lines and rendered messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::TypeMismatch => "type_mismatch",
            Self::FieldValidator => "field_validator",
            Self::ModelValidator => "model_validator",
            Self::UnknownField => "unknown_field",
        }
    }
}

/// One failing location inside a validation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    /// Path from the validated model down to the failing value.
    /// Empty for model-level failures.
    pub loc: Vec<String>,
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorDetail {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            loc: Vec::new(),
            kind,
            message: message.into(),
        }
    }

    /// Error located at one field of the model being validated.
    pub fn at(field: &str, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::new(kind, message).prefixed(field)
    }

    /// Prepends one path segment, used when bubbling up from nested values.
    pub fn prefixed(mut self, segment: impl Into<String>) -> Self {
        self.loc.insert(0, segment.into());
        self
    }

    /// Dotted location, or `__root__` for model-level failures.
    pub fn location(&self) -> String {
        if self.loc.is_empty() {
            "__root__".to_string()
        } else {
            self.loc.join(".")
        }
    }
}

impl Display for ErrorDetail {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} [{}]",
            self.location(),
            self.message,
            self.kind.as_str()
        )
    }
}

/// Aggregated validation failure for one model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} validation error(s) for {model}: {}", .details.len(), render_details(.details))]
pub struct ValidationError {
    pub model: String,
    pub details: Vec<ErrorDetail>,
}

impl ValidationError {
    pub fn new(model: impl Into<String>, details: Vec<ErrorDetail>) -> Self {
        Self {
            model: model.into(),
            details,
        }
    }

    /// Shorthand for a failure with exactly one detail.
    pub fn single(model: impl Into<String>, detail: ErrorDetail) -> Self {
        Self::new(model, vec![detail])
    }

    /// Returns true when any detail matches `kind`.
    pub fn has_kind(&self, kind: ErrorKind) -> bool {
        self.details.iter().any(|detail| detail.kind == kind)
    }
}

fn render_details(details: &[ErrorDetail]) -> String {
    details
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
