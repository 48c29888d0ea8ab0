//! Declared field types and their type-check/coercion rules.
//!
//! # Responsibility
//! - Describe the type a field accepts, including unions and nested models.
//! - Check and coerce candidate values during construction and assignment.
//!
//! # Invariants
//! - Union members are tried left to right; the first match wins.
//! - Model instances are accepted as-is (no copy) when their class is the
//!   annotated class or derives from it.

use crate::model::class::ModelClass;
use crate::model::error::{ErrorDetail, ErrorKind};
use crate::model::value::{ModelRef, Value};
use std::fmt::{Debug, Formatter};

/// Type annotation of one model field.
#[derive(Clone)]
pub enum Annotation {
    Any,
    None,
    Bool,
    Int,
    Float,
    Str,
    List(Box<Annotation>),
    Map,
    Model(ModelClass),
    Union(Vec<Annotation>),
}

impl Annotation {
    /// `Union[inner, None]`.
    pub fn optional(inner: Annotation) -> Self {
        Self::Union(vec![inner, Self::None])
    }

    pub fn model(class: &ModelClass) -> Self {
        Self::Model(class.clone())
    }

    pub fn list(item: Annotation) -> Self {
        Self::List(Box::new(item))
    }

    pub fn union(members: impl IntoIterator<Item = Annotation>) -> Self {
        Self::Union(members.into_iter().collect())
    }

    /// Human-readable form used in validation messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Any => "any".to_string(),
            Self::None => "None".to_string(),
            Self::Bool => "bool".to_string(),
            Self::Int => "int".to_string(),
            Self::Float => "float".to_string(),
            Self::Str => "str".to_string(),
            Self::List(item) => format!("list[{}]", item.describe()),
            Self::Map => "map".to_string(),
            Self::Model(class) => class.name().to_string(),
            Self::Union(members) => match members.as_slice() {
                [inner, Self::None] => format!("Optional[{}]", inner.describe()),
                _ => format!(
                    "Union[{}]",
                    members
                        .iter()
                        .map(Annotation::describe)
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            },
        }
    }

    /// Checks `value` against the annotation and returns the coerced value.
    ///
    /// Error locations are relative to the checked value. With `by_name`,
    /// nested models built from maps accept field names as keys, as when
    /// reconstructing from a dump.
    pub(crate) fn check(&self, value: Value, by_name: bool) -> Result<Value, Vec<ErrorDetail>> {
        match (self, value) {
            (Self::Any, value) => Ok(value),
            (Self::None, Value::Null) => Ok(Value::Null),
            (Self::Bool, Value::Bool(flag)) => Ok(Value::Bool(flag)),
            (Self::Int, Value::Int(int)) => Ok(Value::Int(int)),
            (Self::Int, Value::Float(float)) if is_integral(float) => Ok(Value::Int(float as i64)),
            (Self::Float, Value::Float(float)) => Ok(Value::Float(float)),
            (Self::Float, Value::Int(int)) => Ok(Value::Float(int as f64)),
            (Self::Str, Value::Str(text)) => Ok(Value::Str(text)),
            (Self::Map, Value::Map(entries)) => Ok(Value::Map(entries)),
            (Self::List(item), Value::List(items)) => check_items(item, items, by_name),
            (Self::Model(class), Value::Model(model)) => {
                if model.borrow().class().is_subclass_of(class) {
                    Ok(Value::Model(model))
                } else {
                    let found = model.borrow().class().name().to_string();
                    Err(vec![mismatch(self, &found)])
                }
            }
            (Self::Model(class), Value::Map(entries)) => {
                let constructed = if by_name {
                    class.construct_by_name(&entries)
                } else {
                    class.construct(&entries)
                };
                constructed
                    .map(|instance| Value::Model(ModelRef::new(instance)))
                    .map_err(|err| err.details)
            }
            (Self::Union(members), value) => {
                for member in members {
                    if let Ok(checked) = member.check(value.clone(), by_name) {
                        return Ok(checked);
                    }
                }
                Err(vec![mismatch(self, value.type_name())])
            }
            (_, value) => Err(vec![mismatch(self, value.type_name())]),
        }
    }
}

impl Debug for Annotation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

fn check_items(
    item: &Annotation,
    items: Vec<Value>,
    by_name: bool,
) -> Result<Value, Vec<ErrorDetail>> {
    let mut checked = Vec::with_capacity(items.len());
    let mut details = Vec::new();
    for (index, value) in items.into_iter().enumerate() {
        match item.check(value, by_name) {
            Ok(value) => checked.push(value),
            Err(errors) => details.extend(
                errors
                    .into_iter()
                    .map(|detail| detail.prefixed(index.to_string())),
            ),
        }
    }
    if details.is_empty() {
        Ok(Value::List(checked))
    } else {
        Err(details)
    }
}

fn is_integral(float: f64) -> bool {
    float.is_finite() && float.fract() == 0.0 && float.abs() < i64::MAX as f64
}

fn mismatch(expected: &Annotation, found: &str) -> ErrorDetail {
    ErrorDetail::new(
        ErrorKind::TypeMismatch,
        format!("expected {}, got {found}", expected.describe()),
    )
}
