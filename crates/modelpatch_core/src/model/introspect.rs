//! Uniform introspection accessor over model instances.
//!
//! The apply machinery reads and writes models only through this trait:
//! declared fields, explicitly-set tracking, config flags, shallow copy and
//! dump.

use crate::model::class::{ConfigKey, FieldDef};
use crate::model::instance::ModelInstance;
use crate::model::value::ValueMap;
use indexmap::IndexSet;

/// Accessor contract used by partial-update orchestration.
pub trait ModelIntrospect {
    /// Declared fields in declaration order, inherited fields first.
    fn declared_fields(&self) -> &[FieldDef];

    /// Field names the caller supplied explicitly, as opposed to defaults.
    fn explicitly_set(&self) -> &IndexSet<String>;

    fn config_flag(&self, key: ConfigKey) -> bool;

    /// Writes a class-level flag; affects every instance of the class.
    fn set_config_flag(&self, key: ConfigKey, value: bool);

    /// New instance with the same values; nested models keep identity.
    fn shallow_copy(&self) -> ModelInstance;

    /// Field values keyed by field name, nested models as plain maps.
    fn dump(&self) -> ValueMap;
}

impl ModelIntrospect for ModelInstance {
    fn declared_fields(&self) -> &[FieldDef] {
        self.class().fields()
    }

    fn explicitly_set(&self) -> &IndexSet<String> {
        self.fields_set()
    }

    fn config_flag(&self, key: ConfigKey) -> bool {
        self.class().config_flag(key)
    }

    fn set_config_flag(&self, key: ConfigKey, value: bool) {
        self.class().set_config_flag(key, value);
    }

    fn shallow_copy(&self) -> ModelInstance {
        self.clone()
    }

    fn dump(&self) -> ValueMap {
        self.values()
            .iter()
            .map(|(name, value)| (name.clone(), value.to_plain()))
            .collect()
    }
}
