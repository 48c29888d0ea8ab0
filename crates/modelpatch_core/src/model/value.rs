//! Dynamic field values held by model instances.
//!
//! # Responsibility
//! - Represent every value a model field can hold, including nested models.
//! - Convert to and from `serde_json::Value` for JSON interop.
//!
//! # Invariants
//! - `Value::Model` shares its instance: cloning the value never copies the
//!   nested model, so identity is observable through `ModelRef::ptr_eq`.
//! - `Value::Map` keeps insertion order.

use crate::model::instance::ModelInstance;
use crate::model::introspect::ModelIntrospect;
use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::cell::{Ref, RefCell, RefMut};
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// Ordered string-keyed map of values. Also the shape of a change-set.
pub type ValueMap = IndexMap<String, Value>;

/// Value stored in one model field.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(ValueMap),
    Model(ModelRef),
}

impl Value {
    /// Short type name used in validation messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Model(_) => "model",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Self::Map(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_model(&self) -> Option<&ModelRef> {
        match self {
            Self::Model(value) => Some(value),
            _ => None,
        }
    }

    /// Converts nested models into plain maps, recursively.
    pub fn to_plain(&self) -> Value {
        match self {
            Self::Model(model) => Self::Map(model.borrow().dump()),
            Self::List(items) => Self::List(items.iter().map(Value::to_plain).collect()),
            Self::Map(entries) => Self::Map(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_plain()))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Clone that also duplicates every nested model instance.
    ///
    /// Used for field defaults so instances never share a default model.
    pub fn deep_copy(&self) -> Value {
        match self {
            Self::Model(model) => Self::Model(ModelRef::new(model.borrow().deep_copy())),
            Self::List(items) => Self::List(items.iter().map(Value::deep_copy).collect()),
            Self::Map(entries) => Self::Map(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.deep_copy()))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Builds a value from JSON. Integers that fit `i64` stay integers.
    pub fn from_json(value: serde_json::Value) -> Value {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(flag) => Self::Bool(flag),
            serde_json::Value::Number(number) => match number.as_i64() {
                Some(int) => Self::Int(int),
                None => number.as_f64().map_or(Self::Null, Self::Float),
            },
            serde_json::Value::String(text) => Self::Str(text),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(entries) => Self::Map(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Value::from_json(value)))
                    .collect(),
            ),
        }
    }

    /// Renders the value as JSON. Non-finite floats become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(flag) => serde_json::Value::Bool(*flag),
            Self::Int(int) => serde_json::Value::from(*int),
            Self::Float(float) => serde_json::Number::from_f64(*float)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::Str(text) => serde_json::Value::String(text.clone()),
            Self::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Self::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
            Self::Model(model) => Self::Map(model.borrow().dump()).to_json(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(left), Self::Bool(right)) => left == right,
            (Self::Int(left), Self::Int(right)) => left == right,
            (Self::Float(left), Self::Float(right)) => left == right,
            (Self::Str(left), Self::Str(right)) => left == right,
            (Self::List(left), Self::List(right)) => left == right,
            (Self::Map(left), Self::Map(right)) => left == right,
            (Self::Model(left), Self::Model(right)) => {
                left.ptr_eq(right) || *left.borrow() == *right.borrow()
            }
            _ => false,
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "None"),
            Self::Bool(flag) => write!(f, "{flag}"),
            Self::Int(int) => write!(f, "{int}"),
            Self::Float(float) => write!(f, "{float:?}"),
            Self::Str(text) => write!(f, "{text:?}"),
            Self::List(items) => f.debug_list().entries(items).finish(),
            Self::Map(entries) => f.debug_map().entries(entries).finish(),
            Self::Model(model) => model.fmt(f),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Bool(flag) => serializer.serialize_bool(*flag),
            Self::Int(int) => serializer.serialize_i64(*int),
            Self::Float(float) => serializer.serialize_f64(*float),
            Self::Str(text) => serializer.serialize_str(text),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(entries) => serialize_entries(entries, serializer),
            Self::Model(model) => serialize_entries(&model.borrow().dump(), serializer),
        }
    }
}

fn serialize_entries<S: Serializer>(entries: &ValueMap, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(entries.len()))?;
    for (key, value) in entries {
        map.serialize_entry(key, value)?;
    }
    map.end()
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::List(value)
    }
}

impl From<ValueMap> for Value {
    fn from(value: ValueMap) -> Self {
        Self::Map(value)
    }
}

impl From<ModelRef> for Value {
    fn from(value: ModelRef) -> Self {
        Self::Model(value)
    }
}

impl From<ModelInstance> for Value {
    fn from(value: ModelInstance) -> Self {
        Self::Model(ModelRef::new(value))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Self::from_json(value)
    }
}

/// Shared handle to a model instance nested inside another model.
///
/// Single-threaded by construction: the handle is neither `Send` nor `Sync`.
#[derive(Clone)]
pub struct ModelRef(Rc<RefCell<ModelInstance>>);

impl ModelRef {
    pub fn new(instance: ModelInstance) -> Self {
        Self(Rc::new(RefCell::new(instance)))
    }

    /// Immutable access. Panics if the instance is mutably borrowed.
    pub fn borrow(&self) -> Ref<'_, ModelInstance> {
        self.0.borrow()
    }

    /// Mutable access. Panics if the instance is already borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, ModelInstance> {
        self.0.borrow_mut()
    }

    /// True when both handles point at the same instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Debug for ModelRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.0.try_borrow() {
            Ok(instance) => instance.fmt(f),
            Err(_) => write!(f, "<model in use>"),
        }
    }
}
