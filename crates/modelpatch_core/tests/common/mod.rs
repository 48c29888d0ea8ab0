#![allow(dead_code)]

use modelpatch_core::{
    Annotation, ChangeSet, Changes, FieldDef, ModelClass, ModelInstance, ModelRef, Value,
};

/// Model classes shared by the apply integration tests.
///
/// Classes are built fresh per test: configuration and setter caches are
/// class-level state and must not leak between tests.
pub struct Models {
    /// Plain nested model without the partial-update capability.
    pub inner: ModelClass,
    /// Nested model with the partial-update capability.
    pub inner_with_apply: ModelClass,
    /// `a`/`b` aliased as `aliasA`/`aliasB`, plus both nested kinds.
    pub apply_model: ModelClass,
    /// `apply_model` with validate-on-assignment and an `a != b` validator.
    pub apply_model_with_validation: ModelClass,
    /// Sparse patch source with optional `a`/`b`.
    pub patch_model: ModelClass,
}

pub fn models() -> Models {
    let inner = ModelClass::builder("InnerModel")
        .field(FieldDef::optional("a", Annotation::Int))
        .field(FieldDef::optional("b", Annotation::Int))
        .build();
    let inner_with_apply = ModelClass::builder("InnerWithApplyModel")
        .extends(&ModelClass::partial_apply_base())
        .field(FieldDef::optional("a", Annotation::Int))
        .field(FieldDef::optional("b", Annotation::Int))
        .build();
    let apply_model = ModelClass::builder("ApplyModel")
        .extends(&ModelClass::partial_apply_base())
        .field(FieldDef::new("a", Annotation::Int).alias("aliasA"))
        .field(FieldDef::new("b", Annotation::Int).alias("aliasB"))
        .field(FieldDef::optional("inner", Annotation::model(&inner)))
        .field(FieldDef::optional(
            "inner_with_apply",
            Annotation::model(&inner_with_apply),
        ))
        .populate_by_name(true)
        .build();
    let apply_model_with_validation = ModelClass::builder("ApplyModelWithValidation")
        .extends(&apply_model)
        .model_validator(|values| {
            if values.get("a") == values.get("b") {
                Err("a and b must not be equal".to_string())
            } else {
                Ok(())
            }
        })
        .validate_assignment(true)
        .build();
    let patch_model = ModelClass::builder("PatchModel")
        .field(FieldDef::optional("a", Annotation::Int))
        .field(FieldDef::optional("b", Annotation::Int))
        .build();

    Models {
        inner,
        inner_with_apply,
        apply_model,
        apply_model_with_validation,
        patch_model,
    }
}

pub fn construct(class: &ModelClass, input: serde_json::Value) -> ModelInstance {
    class.construct_json(input).expect("fixture input must be valid")
}

pub fn changes(input: serde_json::Value) -> Changes {
    Changes::try_from(input).expect("changes must be a json object")
}

/// Change-set holding values that JSON cannot express, such as models.
pub fn change_set(pairs: Vec<(&str, Value)>) -> ChangeSet {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

pub fn int(instance: &ModelInstance, field: &str) -> Option<i64> {
    instance.get(field).and_then(Value::as_int)
}

pub fn nested(instance: &ModelInstance, field: &str) -> ModelRef {
    instance
        .get(field)
        .and_then(Value::as_model)
        .cloned()
        .expect("field must hold a nested model")
}
