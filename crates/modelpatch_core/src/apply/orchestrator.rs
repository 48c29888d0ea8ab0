//! Partial-update entry point for model instances.
//!
//! # Responsibility
//! - Resolve change-set keys against field names and aliases.
//! - Merge into nested partially-updatable models instead of replacing them.
//! - Hand the prepared batch to `AssignmentScope` and assign it.
//!
//! # Invariants
//! - Fields absent from the change-set are never written.
//! - Under validate-on-assignment, a nested model is copied before merging, so
//!   the previous nested instance is never mutated.
//! - A rejected batch leaves the top-level instance unchanged.

use crate::apply::changes::{ChangeSet, Changes};
use crate::apply::classify::is_partial_updatable;
use crate::apply::error::{ApplyError, ApplyResult};
use crate::apply::scope::AssignmentScope;
use crate::model::class::{ConfigKey, FieldDef};
use crate::model::instance::ModelInstance;
use crate::model::introspect::ModelIntrospect;
use crate::model::value::{ModelRef, Value};
use log::{debug, warn};

impl ModelInstance {
    /// Applies a sparse set of changes to this instance.
    ///
    /// `changes` may be a change-set keyed by field name or alias, or another
    /// model instance, in which case only its explicitly-set fields count.
    ///
    /// # Errors
    /// - `NotApplicable` when the class lacks the partial-update capability.
    /// - `Validation` when the final state is rejected; the instance is left
    ///   unchanged in that case.
    pub fn apply(&mut self, changes: impl Into<Changes>) -> ApplyResult<()> {
        if !self.class().has_partial_apply() {
            return Err(ApplyError::NotApplicable {
                model: self.class().name().to_string(),
            });
        }

        let changes = changes.into().into_change_set();
        let prepared = self.prepare_changes(&changes)?;

        let (scope, validated) = match AssignmentScope::enter(self, prepared) {
            Ok(entered) => entered,
            Err(err) => {
                warn!(
                    "event=model_apply module=apply status=error model={} errors={}",
                    self.class().name(),
                    err.details.len()
                );
                return Err(err.into());
            }
        };

        let assigned = validated.len();
        for (field, value) in validated {
            self.set_attr(&field, value)?;
        }
        drop(scope);

        debug!(
            "event=model_apply module=apply status=ok model={} supplied={} assigned={}",
            self.class().name(),
            changes.len(),
            assigned
        );
        Ok(())
    }

    /// Former name of `apply`.
    #[deprecated(since = "0.1.0", note = "use `ModelInstance::apply`")]
    pub fn patch(&mut self, changes: impl Into<Changes>) -> ApplyResult<()> {
        warn!(
            "event=deprecated_call module=apply status=ok entry=patch replacement=apply model={}",
            self.class().name()
        );
        self.apply(changes)
    }

    /// Resolves supplied values per declared field, merging nested models.
    fn prepare_changes(&self, changes: &ChangeSet) -> ApplyResult<ChangeSet> {
        let validate_assignment = self.config_flag(ConfigKey::ValidateAssignment);
        let mut prepared = ChangeSet::new();

        for field in self.declared_fields() {
            let supplied = changes
                .get(field.name())
                .or_else(|| field.alias_name().and_then(|alias| changes.get(alias)));
            let Some(supplied) = supplied else {
                continue;
            };

            let value = match self.merge_nested(field, supplied, validate_assignment)? {
                Some(merged) => merged,
                None => supplied.clone(),
            };
            prepared.insert(field.name().to_string(), value);
        }

        Ok(prepared)
    }

    /// Applies `supplied` onto the current nested model when the field allows
    /// it. Returns `None` when the value should replace the field wholesale.
    fn merge_nested(
        &self,
        field: &FieldDef,
        supplied: &Value,
        validate_assignment: bool,
    ) -> ApplyResult<Option<Value>> {
        if !is_partial_updatable(field.annotation()) {
            return Ok(None);
        }
        let Some(Value::Model(current)) = self.get(field.name()) else {
            return Ok(None);
        };
        if !current.borrow().class().has_partial_apply() {
            return Ok(None);
        }
        let Some(nested_changes) = Changes::from_value(supplied) else {
            return Ok(None);
        };

        let target = if validate_assignment {
            ModelRef::new(current.borrow().shallow_copy())
        } else {
            current.clone()
        };
        target.borrow_mut().apply(nested_changes)?;
        Ok(Some(Value::Model(target)))
    }
}

#[cfg(test)]
mod tests {
    use crate::apply::changes::Changes;
    use crate::apply::error::ApplyError;
    use crate::model::annotation::Annotation;
    use crate::model::class::{ConfigKey, FieldDef, ModelClass};
    use crate::model::value::Value;
    use serde_json::json;

    fn counter_class() -> ModelClass {
        ModelClass::builder("Counter")
            .extends(&ModelClass::partial_apply_base())
            .field(FieldDef::new("count", Annotation::Int))
            .field(FieldDef::optional("label", Annotation::Str))
            .build()
    }

    fn changes(value: serde_json::Value) -> Changes {
        Changes::try_from(value).expect("json object")
    }

    #[test]
    fn apply_requires_capability() {
        let plain = ModelClass::builder("Plain")
            .field(FieldDef::new("a", Annotation::Int))
            .build();
        let mut instance = plain.construct_json(json!({"a": 1})).expect("valid");

        let err = instance
            .apply(changes(json!({"a": 2})))
            .expect_err("plain models cannot be patched");
        assert_eq!(
            err,
            ApplyError::NotApplicable {
                model: "Plain".to_string()
            }
        );
        assert_eq!(instance.get("a"), Some(&Value::Int(1)));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let mut instance = counter_class()
            .construct_json(json!({"count": 1}))
            .expect("valid");
        instance
            .apply(changes(json!({"bogus": 1})))
            .expect("nothing to apply");
        assert_eq!(instance.get("count"), Some(&Value::Int(1)));
        assert_eq!(instance.values().len(), 2);
    }

    #[test]
    fn applied_fields_become_explicitly_set() {
        let mut instance = counter_class()
            .construct_json(json!({"count": 1}))
            .expect("valid");
        assert!(!instance.fields_set().contains("label"));

        instance
            .apply(changes(json!({"label": "x"})))
            .expect("valid");
        assert!(instance.fields_set().contains("label"));
    }

    #[test]
    #[allow(deprecated)]
    fn patch_forwards_to_apply() {
        let mut instance = counter_class()
            .construct_json(json!({"count": 1}))
            .expect("valid");
        instance
            .patch(changes(json!({"count": 5})))
            .expect("valid");
        assert_eq!(instance.get("count"), Some(&Value::Int(5)));
        assert!(!instance.class().config_flag(ConfigKey::ValidateAssignment));
    }
}
