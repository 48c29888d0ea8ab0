mod common;

use common::{changes, construct, int, models, nested};
use modelpatch_core::{
    Annotation, ConfigKey, ErrorKind, FieldDef, ModelClass, SetterHandler, Value,
};
use serde_json::json;
use std::panic::{catch_unwind, AssertUnwindSafe};

#[test]
fn validate_assignment_is_restored_after_success() {
    let models = models();
    let class = &models.apply_model_with_validation;
    let mut obj = construct(class, json!({"a": 1, "b": 2}));

    obj.apply(changes(json!({"a": 2, "b": 1}))).unwrap();
    assert!(class.config_flag(ConfigKey::ValidateAssignment));

    let err = obj.set_attr("a", 1).expect_err("a == b after restore");
    assert!(err.has_kind(ErrorKind::ModelValidator));
}

#[test]
fn validate_assignment_is_restored_after_failure() {
    let models = models();
    let class = &models.apply_model_with_validation;
    let mut obj = construct(class, json!({"a": 1, "b": 2}));

    obj.apply(changes(json!({"a": 3, "b": 3})))
        .expect_err("a == b must be rejected");
    assert!(class.config_flag(ConfigKey::ValidateAssignment));
}

#[test]
fn disabled_validate_assignment_stays_disabled() {
    let models = models();
    let class = &models.apply_model;
    let mut obj = construct(class, json!({"a": 1, "b": 2}));

    obj.apply(changes(json!({"a": 5}))).unwrap();
    assert!(!class.config_flag(ConfigKey::ValidateAssignment));
}

#[test]
fn stale_setter_cache_does_not_block_batch() {
    let models = models();
    let class = &models.apply_model_with_validation;
    let mut obj = construct(class, json!({"a": 1, "b": 2}));

    obj.set_attr("a", 3).expect("3 != 2");
    obj.set_attr("b", 4).expect("3 != 4");
    assert_eq!(class.cached_setter("a"), Some(SetterHandler::Validated));
    assert_eq!(class.cached_setter("b"), Some(SetterHandler::Validated));

    obj.apply(changes(json!({"a": 4, "b": 3}))).unwrap();
    assert_eq!(int(&obj, "a"), Some(4));
    assert_eq!(int(&obj, "b"), Some(3));

    assert_eq!(class.cached_setter("a"), Some(SetterHandler::Validated));
    assert_eq!(class.cached_setter("b"), Some(SetterHandler::Validated));
    assert_eq!(class.cached_setter("inner"), None);
}

#[test]
fn validated_values_are_what_gets_assigned() {
    let tagged = ModelClass::builder("Tagged")
        .extends(&ModelClass::partial_apply_base())
        .field(
            FieldDef::new("name", Annotation::Str).validator(|value| match value {
                Value::Str(text) => Ok(Value::Str(text.trim().to_lowercase())),
                other => Ok(other),
            }),
        )
        .field(FieldDef::new("weight", Annotation::Float))
        .validate_assignment(true)
        .build();
    let mut obj = construct(&tagged, json!({"name": "a", "weight": 1.5}));

    obj.apply(changes(json!({"name": "  Mixed Case ", "weight": 3})))
        .unwrap();
    assert_eq!(obj.get("name"), Some(&Value::from("mixed case")));
    assert_eq!(obj.get("weight"), Some(&Value::Float(3.0)));
}

#[test]
fn raw_values_are_assigned_without_validate_assignment() {
    let tagged = ModelClass::builder("Tagged")
        .extends(&ModelClass::partial_apply_base())
        .field(
            FieldDef::new("name", Annotation::Str).validator(|value| match value {
                Value::Str(text) => Ok(Value::Str(text.trim().to_string())),
                other => Ok(other),
            }),
        )
        .build();
    let mut obj = construct(&tagged, json!({"name": "a"}));

    obj.apply(changes(json!({"name": "  padded  "}))).unwrap();
    assert_eq!(obj.get("name"), Some(&Value::from("  padded  ")));
}

#[test]
fn panicking_validator_still_restores_class_state() {
    let fragile = ModelClass::builder("Fragile")
        .extends(&ModelClass::partial_apply_base())
        .field(FieldDef::new("n", Annotation::Int).validator(|value| {
            if value == Value::Int(13) {
                panic!("unlucky value");
            }
            Ok(value)
        }))
        .validate_assignment(true)
        .build();
    let mut obj = construct(&fragile, json!({"n": 1}));
    obj.set_attr("n", 2).expect("validated assignment");

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let _ = obj.apply(changes(json!({"n": 13})));
    }));
    assert!(outcome.is_err());

    assert!(fragile.config_flag(ConfigKey::ValidateAssignment));
    assert_eq!(fragile.cached_setter("n"), Some(SetterHandler::Validated));
    assert_eq!(int(&obj, "n"), Some(2));
}

#[test]
fn nested_validation_error_leaves_nested_model_unchanged() {
    let leaf = ModelClass::builder("Leaf")
        .extends(&ModelClass::partial_apply_base())
        .field(FieldDef::new("low", Annotation::Int))
        .field(FieldDef::new("high", Annotation::Int))
        .model_validator(|values| {
            let low = values.get("low").and_then(Value::as_int);
            let high = values.get("high").and_then(Value::as_int);
            match (low, high) {
                (Some(low), Some(high)) if low > high => Err("low must be <= high".to_string()),
                _ => Ok(()),
            }
        })
        .validate_assignment(true)
        .build();
    let root = ModelClass::builder("Root")
        .extends(&ModelClass::partial_apply_base())
        .field(FieldDef::new("leaf", Annotation::model(&leaf)))
        .build();
    let mut obj = construct(&root, json!({"leaf": {"low": 1, "high": 5}}));
    let leaf_before = nested(&obj, "leaf");

    let err = obj
        .apply(changes(json!({"leaf": {"low": 9}})))
        .expect_err("low > high");
    let validation = err.as_validation().expect("validation error");
    assert_eq!(validation.model, "Leaf");

    let leaf_after = nested(&obj, "leaf");
    assert!(leaf_before.ptr_eq(&leaf_after));
    assert_eq!(int(&leaf_after.borrow(), "low"), Some(1));
    assert!(leaf.config_flag(ConfigKey::ValidateAssignment));
}

#[test]
fn nested_class_state_is_restored_independently() {
    let models = models();
    let mut obj = construct(
        &models.apply_model_with_validation,
        json!({"a": 1, "b": 2, "inner_with_apply": {"a": 1}}),
    );
    models
        .inner_with_apply
        .set_config_flag(ConfigKey::ValidateAssignment, true);

    obj.apply(changes(json!({"a": 7, "inner_with_apply": {"b": 3}})))
        .unwrap();

    assert!(models
        .apply_model_with_validation
        .config_flag(ConfigKey::ValidateAssignment));
    assert!(models
        .inner_with_apply
        .config_flag(ConfigKey::ValidateAssignment));
    assert!(!models.apply_model.config_flag(ConfigKey::ValidateAssignment));
    assert_eq!(int(&nested(&obj, "inner_with_apply").borrow(), "b"), Some(3));
}

#[test]
fn nested_aliased_fields_survive_batch_validation() {
    let inner = ModelClass::builder("Inner")
        .field(FieldDef::new("x", Annotation::Int).alias("X"))
        .build();
    let outer = ModelClass::builder("Outer")
        .extends(&ModelClass::partial_apply_base())
        .field(FieldDef::new("n", Annotation::Int))
        .field(FieldDef::new("inner", Annotation::model(&inner)))
        .validate_assignment(true)
        .build();
    assert!(!inner.config_flag(ConfigKey::PopulateByName));
    let mut obj = construct(&outer, json!({"n": 1, "inner": {"X": 5}}));
    let inner_before = nested(&obj, "inner");

    obj.apply(changes(json!({"n": 2})))
        .expect("unrelated nested alias must not block the batch");
    assert_eq!(int(&obj, "n"), Some(2));
    let inner_after = nested(&obj, "inner");
    assert!(inner_before.ptr_eq(&inner_after));
    assert_eq!(int(&inner_after.borrow(), "x"), Some(5));
}
