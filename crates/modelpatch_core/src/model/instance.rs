//! Live model instances and single-field assignment.
//!
//! # Responsibility
//! - Hold current field values and the set of explicitly supplied fields.
//! - Apply single-field writes through the class's memoized setter handler.
//!
//! # Invariants
//! - `values` always holds exactly one entry per declared field.
//! - A rejected validated assignment leaves the instance unchanged.

use crate::model::class::{ModelClass, SetterHandler};
use crate::model::error::{ErrorDetail, ErrorKind, ValidationError, ValidationResult};
use crate::model::value::{ModelRef, Value, ValueMap};
use indexmap::IndexSet;
use std::fmt::{Debug, Formatter};

/// One instance of a `ModelClass`.
///
/// `Clone` is shallow: nested models are shared with the clone.
#[derive(Clone)]
pub struct ModelInstance {
    class: ModelClass,
    values: ValueMap,
    fields_set: IndexSet<String>,
}

impl ModelInstance {
    pub(crate) fn from_parts(class: ModelClass, values: ValueMap, fields_set: IndexSet<String>) -> Self {
        Self {
            class,
            values,
            fields_set,
        }
    }

    pub fn class(&self) -> &ModelClass {
        &self.class
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Current values keyed by field name, in declaration order.
    pub fn values(&self) -> &ValueMap {
        &self.values
    }

    /// Names of fields supplied at construction or assigned since.
    pub fn fields_set(&self) -> &IndexSet<String> {
        &self.fields_set
    }

    pub fn into_values(self) -> ValueMap {
        self.values
    }

    /// Wraps the instance in a shared handle for use as a nested value.
    pub fn into_ref(self) -> ModelRef {
        ModelRef::new(self)
    }

    /// Assigns one field through the class's setter handler.
    ///
    /// With a `Validated` handler the value is type checked, passed through
    /// field validators, and model validators run against the would-be state;
    /// the instance only changes when all of them pass. With a `Raw` handler
    /// the value is stored as given.
    ///
    /// # Errors
    /// - `UnknownField` when the class does not declare `field`.
    /// - Any validation failure under a `Validated` handler.
    pub fn set_attr(&mut self, field: &str, value: impl Into<Value>) -> ValidationResult<()> {
        let Some(definition) = self.class.field(field) else {
            return Err(ValidationError::single(
                self.class.name(),
                ErrorDetail::at(
                    field,
                    ErrorKind::UnknownField,
                    format!("object has no field `{field}`"),
                ),
            ));
        };

        let value = value.into();
        match self.class.setter_handler(field) {
            SetterHandler::Raw => {
                self.values.insert(field.to_string(), value);
            }
            SetterHandler::Validated => {
                let checked = definition
                    .validate(value, false)
                    .map_err(|details| ValidationError::new(self.class.name(), details))?;
                let previous = self.values.insert(field.to_string(), checked);
                if let Err(err) = self.class.run_model_validators(&self.values) {
                    if let Some(previous) = previous {
                        self.values.insert(field.to_string(), previous);
                    }
                    return Err(err);
                }
            }
        }
        self.fields_set.insert(field.to_string());
        Ok(())
    }

    /// Copy that duplicates nested models instead of sharing them.
    pub(crate) fn deep_copy(&self) -> ModelInstance {
        Self {
            class: self.class.clone(),
            values: self
                .values
                .iter()
                .map(|(key, value)| (key.clone(), value.deep_copy()))
                .collect(),
            fields_set: self.fields_set.clone(),
        }
    }
}

impl PartialEq for ModelInstance {
    fn eq(&self, other: &Self) -> bool {
        self.class.ptr_eq(&other.class) && self.values == other.values
    }
}

impl Debug for ModelInstance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct(self.class.name());
        for (name, value) in &self.values {
            debug.field(name, value);
        }
        debug.finish()
    }
}
