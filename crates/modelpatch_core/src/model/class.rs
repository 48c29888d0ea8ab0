//! Model class declarations: fields, validators, config and setter cache.
//!
//! # Responsibility
//! - Declare the fields a model accepts and how they are validated.
//! - Hold class-level configuration shared by every instance of the class.
//! - Memoize per-field assignment handlers.
//!
//! # Invariants
//! - Field order is declaration order, inherited fields first.
//! - A derived class inherits fields, validators, config defaults and the
//!   partial-update capability of its base.
//! - Configuration and the setter cache are class-level state; changing them
//!   affects every instance of the class.

use crate::model::annotation::Annotation;
use crate::model::error::{ErrorDetail, ErrorKind, ValidationError, ValidationResult};
use crate::model::instance::ModelInstance;
use crate::model::value::{Value, ValueMap};
use indexmap::IndexSet;
use log::debug;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// Field validator: receives the type-checked value and returns the value to
/// store, or a rejection message.
pub type FieldValidatorFn = Rc<dyn Fn(Value) -> Result<Value, String>>;

/// Model validator: receives all validated field values keyed by field name.
///
/// Validators must be pure: construction of throwaway instances relies on it.
pub type ModelValidatorFn = Rc<dyn Fn(&ValueMap) -> Result<(), String>>;

/// Memoized per-field assignment behavior.
pub type SetterCache = HashMap<String, SetterHandler>;

/// How `ModelInstance::set_attr` treats one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetterHandler {
    /// Type check, field validators and model validators run on assignment.
    Validated,
    /// Value is stored as given.
    Raw,
}

/// Named configuration flags readable and writable at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    ValidateAssignment,
    PopulateByName,
}

impl ConfigKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ValidateAssignment => "validate_assignment",
            Self::PopulateByName => "populate_by_name",
        }
    }
}

/// Per-class configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Re-run validation on every single field assignment.
    pub validate_assignment: bool,
    /// Accept field names in input even when the field declares an alias.
    pub populate_by_name: bool,
}

/// Declaration of one model field.
#[derive(Clone)]
pub struct FieldDef {
    name: String,
    alias: Option<String>,
    annotation: Annotation,
    default: Option<Value>,
    validators: Vec<FieldValidatorFn>,
}

impl FieldDef {
    /// Required field without alias.
    pub fn new(name: impl Into<String>, annotation: Annotation) -> Self {
        Self {
            name: name.into(),
            alias: None,
            annotation,
            default: None,
            validators: Vec::new(),
        }
    }

    /// `Optional[annotation]` field defaulting to null.
    pub fn optional(name: impl Into<String>, annotation: Annotation) -> Self {
        Self::new(name, Annotation::optional(annotation)).default(Value::Null)
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Adds a validator run after the type check, in registration order.
    pub fn validator(mut self, validator: impl Fn(Value) -> Result<Value, String> + 'static) -> Self {
        self.validators.push(Rc::new(validator));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alias_name(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn annotation(&self) -> &Annotation {
        &self.annotation
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }

    /// Finds this field's input value.
    ///
    /// The alias is the external name; the field name is accepted when the
    /// field has no alias or `by_name` is set.
    pub(crate) fn lookup<'a>(&self, input: &'a ValueMap, by_name: bool) -> Option<&'a Value> {
        match &self.alias {
            Some(alias) => input
                .get(alias)
                .or_else(|| by_name.then(|| input.get(&self.name)).flatten()),
            None => input.get(&self.name),
        }
    }

    /// Type check followed by field validators. Locations include the field.
    ///
    /// `by_name` makes nested models built from maps look fields up by name.
    pub(crate) fn validate(&self, value: Value, by_name: bool) -> Result<Value, Vec<ErrorDetail>> {
        let mut value = self
            .annotation
            .check(value, by_name)
            .map_err(|details| self.locate(details))?;
        for validator in &self.validators {
            value = validator(value).map_err(|message| {
                vec![ErrorDetail::at(&self.name, ErrorKind::FieldValidator, message)]
            })?;
        }
        Ok(value)
    }

    fn locate(&self, details: Vec<ErrorDetail>) -> Vec<ErrorDetail> {
        details
            .into_iter()
            .map(|detail| detail.prefixed(self.name.clone()))
            .collect()
    }
}

impl Debug for FieldDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("alias", &self.alias)
            .field("annotation", &self.annotation)
            .field("default", &self.default)
            .field("validators", &self.validators.len())
            .finish()
    }
}

struct ClassInner {
    name: String,
    base: Option<ModelClass>,
    fields: Vec<FieldDef>,
    validators: Vec<ModelValidatorFn>,
    partial_apply: bool,
    validate_assignment: Cell<bool>,
    populate_by_name: Cell<bool>,
    setter_cache: RefCell<SetterCache>,
}

/// Shared handle to a declared model class.
///
/// Cloning the handle never copies the class: all clones see the same
/// configuration and setter cache.
#[derive(Clone)]
pub struct ModelClass(Rc<ClassInner>);

thread_local! {
    static PARTIAL_APPLY_BASE: ModelClass = ModelClass::builder("PartialApplyModel")
        .partial_apply()
        .build();
}

impl ModelClass {
    pub fn builder(name: impl Into<String>) -> ModelClassBuilder {
        ModelClassBuilder::new(name)
    }

    /// Field-less base class carrying the partial-update capability marker.
    ///
    /// Classes built with `extends(&ModelClass::partial_apply_base())` gain
    /// `ModelInstance::apply`.
    pub fn partial_apply_base() -> ModelClass {
        PARTIAL_APPLY_BASE.with(Clone::clone)
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn base(&self) -> Option<&ModelClass> {
        self.0.base.as_ref()
    }

    /// All fields in declaration order, inherited fields first.
    pub fn fields(&self) -> &[FieldDef] {
        &self.0.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.0.fields.iter().find(|field| field.name == name)
    }

    /// True when this class or any ancestor carries the capability marker.
    pub fn has_partial_apply(&self) -> bool {
        self.0.partial_apply || self.base().is_some_and(ModelClass::has_partial_apply)
    }

    /// True when `self` is `other` or derives from it.
    pub fn is_subclass_of(&self, other: &ModelClass) -> bool {
        self.ptr_eq(other) || self.base().is_some_and(|base| base.is_subclass_of(other))
    }

    pub fn ptr_eq(&self, other: &ModelClass) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> ModelConfig {
        ModelConfig {
            validate_assignment: self.0.validate_assignment.get(),
            populate_by_name: self.0.populate_by_name.get(),
        }
    }

    pub fn config_flag(&self, key: ConfigKey) -> bool {
        match key {
            ConfigKey::ValidateAssignment => self.0.validate_assignment.get(),
            ConfigKey::PopulateByName => self.0.populate_by_name.get(),
        }
    }

    /// Changes one flag for every instance of the class.
    ///
    /// Does not touch the setter cache: handlers memoized under the old value
    /// stay in effect until the cache is cleared.
    pub fn set_config_flag(&self, key: ConfigKey, value: bool) {
        match key {
            ConfigKey::ValidateAssignment => self.0.validate_assignment.set(value),
            ConfigKey::PopulateByName => self.0.populate_by_name.set(value),
        }
    }

    /// Memoized handler for `field`, if one was resolved already.
    pub fn cached_setter(&self, field: &str) -> Option<SetterHandler> {
        self.0.setter_cache.borrow().get(field).copied()
    }

    /// Resolves and memoizes the assignment handler for `field`.
    pub(crate) fn setter_handler(&self, field: &str) -> SetterHandler {
        if let Some(handler) = self.cached_setter(field) {
            return handler;
        }
        let handler = if self.0.validate_assignment.get() {
            SetterHandler::Validated
        } else {
            SetterHandler::Raw
        };
        self.0
            .setter_cache
            .borrow_mut()
            .insert(field.to_string(), handler);
        handler
    }

    /// Empties the setter cache and returns its previous content.
    pub(crate) fn take_setter_cache(&self) -> SetterCache {
        self.0.setter_cache.take()
    }

    /// Replaces the setter cache wholesale.
    pub(crate) fn restore_setter_cache(&self, cache: SetterCache) {
        self.0.setter_cache.replace(cache);
    }

    /// Builds a fully validated instance from `input`.
    ///
    /// Keys are matched against aliases, and against field names when the
    /// class has `populate_by_name` set. Unknown keys are ignored.
    pub fn construct(&self, input: &ValueMap) -> ValidationResult<ModelInstance> {
        self.construct_with(input, false)
    }

    /// Builds an instance from a JSON object.
    pub fn construct_json(&self, input: serde_json::Value) -> ValidationResult<ModelInstance> {
        match Value::from_json(input) {
            Value::Map(entries) => self.construct(&entries),
            other => Err(ValidationError::single(
                self.name(),
                ErrorDetail::new(
                    ErrorKind::TypeMismatch,
                    format!("expected map, got {}", other.type_name()),
                ),
            )),
        }
    }

    /// Construction from a dump, where keys are always field names, at every
    /// nesting level.
    pub(crate) fn construct_by_name(&self, input: &ValueMap) -> ValidationResult<ModelInstance> {
        self.construct_with(input, true)
    }

    fn construct_with(&self, input: &ValueMap, from_dump: bool) -> ValidationResult<ModelInstance> {
        let by_name = from_dump || self.0.populate_by_name.get();
        let mut values = ValueMap::with_capacity(self.0.fields.len());
        let mut fields_set = IndexSet::new();
        let mut details = Vec::new();

        for field in &self.0.fields {
            match field.lookup(input, by_name) {
                Some(raw) => {
                    fields_set.insert(field.name.clone());
                    match field.validate(raw.clone(), from_dump) {
                        Ok(value) => {
                            values.insert(field.name.clone(), value);
                        }
                        Err(errors) => details.extend(errors),
                    }
                }
                None => match &field.default {
                    Some(default) => {
                        values.insert(field.name.clone(), default.deep_copy());
                    }
                    None => details.push(ErrorDetail::at(
                        &field.name,
                        ErrorKind::Missing,
                        "field required",
                    )),
                },
            }
        }

        if !details.is_empty() {
            debug!(
                "event=model_construct module=model status=error model={} errors={}",
                self.name(),
                details.len()
            );
            return Err(ValidationError::new(self.name(), details));
        }

        self.run_model_validators(&values)?;
        Ok(ModelInstance::from_parts(self.clone(), values, fields_set))
    }

    /// Runs model validators in declaration order, stopping at the first
    /// rejection.
    pub(crate) fn run_model_validators(&self, values: &ValueMap) -> ValidationResult<()> {
        for validator in &self.0.validators {
            validator(values).map_err(|message| {
                ValidationError::single(
                    self.name(),
                    ErrorDetail::new(ErrorKind::ModelValidator, message),
                )
            })?;
        }
        Ok(())
    }
}

impl Debug for ModelClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelClass")
            .field("name", &self.0.name)
            .field("base", &self.base().map(ModelClass::name))
            .field("fields", &self.0.fields)
            .field("partial_apply", &self.has_partial_apply())
            .field("config", &self.config())
            .finish()
    }
}

/// Fluent declaration of a `ModelClass`.
///
/// Call `extends` before config setters: it resets config to the base's.
pub struct ModelClassBuilder {
    name: String,
    base: Option<ModelClass>,
    fields: Vec<FieldDef>,
    validators: Vec<ModelValidatorFn>,
    partial_apply: bool,
    config: ModelConfig,
}

impl ModelClassBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: None,
            fields: Vec::new(),
            validators: Vec::new(),
            partial_apply: false,
            config: ModelConfig::default(),
        }
    }

    pub fn extends(mut self, base: &ModelClass) -> Self {
        self.config = base.config();
        self.base = Some(base.clone());
        self
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn model_validator(
        mut self,
        validator: impl Fn(&ValueMap) -> Result<(), String> + 'static,
    ) -> Self {
        self.validators.push(Rc::new(validator));
        self
    }

    /// Attaches the partial-update capability marker.
    pub fn partial_apply(mut self) -> Self {
        self.partial_apply = true;
        self
    }

    pub fn config(mut self, config: ModelConfig) -> Self {
        self.config = config;
        self
    }

    pub fn validate_assignment(mut self, enabled: bool) -> Self {
        self.config.validate_assignment = enabled;
        self
    }

    pub fn populate_by_name(mut self, enabled: bool) -> Self {
        self.config.populate_by_name = enabled;
        self
    }

    pub fn build(self) -> ModelClass {
        let mut fields = self
            .base
            .as_ref()
            .map(|base| base.fields().to_vec())
            .unwrap_or_default();
        for field in self.fields {
            match fields.iter().position(|existing| existing.name == field.name) {
                Some(index) => fields[index] = field,
                None => fields.push(field),
            }
        }

        let mut validators = self
            .base
            .as_ref()
            .map(|base| base.0.validators.clone())
            .unwrap_or_default();
        validators.extend(self.validators);

        ModelClass(Rc::new(ClassInner {
            name: self.name,
            base: self.base,
            fields,
            validators,
            partial_apply: self.partial_apply,
            validate_assignment: Cell::new(self.config.validate_assignment),
            populate_by_name: Cell::new(self.config.populate_by_name),
            setter_cache: RefCell::new(SetterCache::new()),
        }))
    }
}
