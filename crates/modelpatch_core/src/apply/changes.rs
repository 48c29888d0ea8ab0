//! Change-set inputs accepted by `ModelInstance::apply`.
//!
//! # Invariants
//! - A key absent from a change-set leaves the matching field untouched.
//! - A model instance contributes only its explicitly-set fields, never its
//!   defaults, and its nested models are passed as-is.

use crate::apply::error::ApplyError;
use crate::model::instance::ModelInstance;
use crate::model::introspect::ModelIntrospect;
use crate::model::value::{ModelRef, Value, ValueMap};

/// Sparse field updates keyed by field name or alias.
pub type ChangeSet = ValueMap;

/// Anything `apply` accepts as a source of changes.
#[derive(Debug, Clone)]
pub enum Changes {
    Set(ChangeSet),
    Model(ModelInstance),
}

impl Changes {
    /// Interprets a nested field value as changes, when it can be one.
    ///
    /// Only maps and model instances qualify; anything else is a full
    /// replacement value.
    pub fn from_value(value: &Value) -> Option<Changes> {
        match value {
            Value::Map(entries) => Some(Self::Set(entries.clone())),
            Value::Model(model) => Some(Self::Model(model.borrow().clone())),
            _ => None,
        }
    }

    /// Flattens into a change-set.
    pub fn into_change_set(self) -> ChangeSet {
        match self {
            Self::Set(entries) => entries,
            Self::Model(instance) => {
                let explicitly_set = instance.explicitly_set().clone();
                instance
                    .into_values()
                    .into_iter()
                    .filter(|(name, _)| explicitly_set.contains(name))
                    .collect()
            }
        }
    }
}

impl From<ChangeSet> for Changes {
    fn from(value: ChangeSet) -> Self {
        Self::Set(value)
    }
}

impl From<ModelInstance> for Changes {
    fn from(value: ModelInstance) -> Self {
        Self::Model(value)
    }
}

impl From<&ModelInstance> for Changes {
    fn from(value: &ModelInstance) -> Self {
        Self::Model(value.clone())
    }
}

impl From<&ModelRef> for Changes {
    fn from(value: &ModelRef) -> Self {
        Self::Model(value.borrow().clone())
    }
}

impl TryFrom<serde_json::Value> for Changes {
    type Error = ApplyError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match Value::from_json(value) {
            Value::Map(entries) => Ok(Self::Set(entries)),
            other => Err(ApplyError::InvalidChanges {
                found: other.type_name(),
            }),
        }
    }
}
