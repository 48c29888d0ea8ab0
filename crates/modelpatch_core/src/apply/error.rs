//! Errors surfaced by partial-update entry points.

use crate::model::error::ValidationError;
use thiserror::Error;

pub type ApplyResult<T> = Result<T, ApplyError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    /// Validation failure from the model layer, passed through unchanged.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// `apply` was called on a model without the partial-update capability.
    #[error("model `{model}` does not support partial updates")]
    NotApplicable { model: String },
    /// Changes were neither a map nor a model instance.
    #[error("changes must be a map or a model instance, got {found}")]
    InvalidChanges { found: &'static str },
}

impl ApplyError {
    /// The wrapped validation error, if this is one.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}
