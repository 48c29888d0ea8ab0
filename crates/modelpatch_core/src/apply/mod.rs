//! Partial updates for models carrying the partial-update capability.
//!
//! # Responsibility
//! - Classify annotations that allow recursive partial updates.
//! - Turn caller input into change-sets and orchestrate `ModelInstance::apply`.
//! - Scope assign-time validation so multi-field validators see the final
//!   state only.
//!
//! # Invariants
//! - Validation errors from the model layer reach the caller unchanged.
//! - Class-level validation state is restored on every exit path.

pub mod changes;
pub mod classify;
pub mod error;
mod orchestrator;
pub mod scope;
