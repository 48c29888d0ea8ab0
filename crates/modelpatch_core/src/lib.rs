//! Partial updates for declaratively validated models.
//!
//! Models are declared as `ModelClass`es with typed, aliased, validated
//! fields. Classes carrying the partial-update capability gain
//! `ModelInstance::apply`, which merges a sparse change-set into a live
//! instance while keeping multi-field validators, validate-on-assignment and
//! nested partially-updatable models consistent.

pub mod apply;
pub mod logging;
pub mod model;

pub use apply::changes::{ChangeSet, Changes};
pub use apply::classify::is_partial_updatable;
pub use apply::error::{ApplyError, ApplyResult};
pub use apply::scope::AssignmentScope;
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::annotation::Annotation;
pub use model::class::{
    ConfigKey, FieldDef, ModelClass, ModelClassBuilder, ModelConfig, SetterHandler,
};
pub use model::error::{ErrorDetail, ErrorKind, ValidationError, ValidationResult};
pub use model::instance::ModelInstance;
pub use model::introspect::ModelIntrospect;
pub use model::value::{ModelRef, Value, ValueMap};

/// Returns the crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
