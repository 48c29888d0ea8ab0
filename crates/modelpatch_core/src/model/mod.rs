//! Declarative model layer hosting the partial-update capability.
//!
//! # Responsibility
//! - Declare model classes with typed, aliased, validated fields.
//! - Construct fully validated instances and assign single fields.
//! - Expose the introspection accessor used by `crate::apply`.
//!
//! # Invariants
//! - Construction runs type checks, field validators and model validators,
//!   and has no side effects beyond building the instance.
//! - Models are single-threaded (`Rc`-based) and never cross threads.

pub mod annotation;
pub mod class;
pub mod error;
pub mod instance;
pub mod introspect;
pub mod value;
