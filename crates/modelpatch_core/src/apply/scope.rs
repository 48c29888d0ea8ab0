//! Scoped suspension of assign-time validation for batch assignment.
//!
//! # Responsibility
//! - Validate a batch of proposed changes once, against the final state.
//! - Keep per-field validation and memoized setters out of the batch.
//!
//! # Invariants
//! - The class's `validate_assignment` flag and setter cache are restored
//!   when the scope is dropped, on success, error and unwind alike.
//! - A rejected batch never touches the live instance.
//! - Validated values replace proposed ones only for proposed keys.

use crate::apply::changes::ChangeSet;
use crate::model::class::{ConfigKey, ModelClass, SetterCache};
use crate::model::error::ValidationResult;
use crate::model::instance::ModelInstance;
use crate::model::introspect::ModelIntrospect;
use log::{debug, trace};

/// Guard holding the validation state captured before a batch assignment.
///
/// Assign the validated changes while the guard is alive; dropping it puts
/// the class back the way it was.
#[must_use = "validation state is restored as soon as the scope is dropped"]
pub struct AssignmentScope {
    class: ModelClass,
    had_validate_assignment: bool,
    saved_setters: Option<SetterCache>,
}

impl AssignmentScope {
    /// Suspends assign-time validation for `target`'s class and returns the
    /// changes to assign.
    ///
    /// When the class validates on assignment, a throwaway instance is built
    /// from `target`'s dump overridden by `proposed`, running the complete
    /// validation pipeline once; the returned changes are the validated values
    /// for the proposed keys. Otherwise `proposed` is returned as given.
    ///
    /// # Errors
    /// Returns the throwaway construction's validation error unchanged. The
    /// class state is already restored when the error reaches the caller.
    pub fn enter(
        target: &ModelInstance,
        proposed: ChangeSet,
    ) -> ValidationResult<(AssignmentScope, ChangeSet)> {
        let class = target.class().clone();
        let had_validate_assignment = class.config_flag(ConfigKey::ValidateAssignment);
        let mut scope = AssignmentScope {
            class,
            had_validate_assignment,
            saved_setters: None,
        };

        let changes = if had_validate_assignment {
            scope
                .class
                .set_config_flag(ConfigKey::ValidateAssignment, false);
            trace!(
                "event=assignment_scope module=apply status=ok model={} flag={} state=suspended",
                scope.class.name(),
                ConfigKey::ValidateAssignment.as_str()
            );

            let mut input = target.dump();
            for (name, value) in &proposed {
                input.insert(name.clone(), value.clone());
            }
            let mut validated = scope.class.construct_by_name(&input)?.into_values();
            proposed
                .keys()
                .filter_map(|name| {
                    validated
                        .swap_remove(name)
                        .map(|value| (name.clone(), value))
                })
                .collect()
        } else {
            proposed
        };

        scope.saved_setters = Some(scope.class.take_setter_cache());
        Ok((scope, changes))
    }

    /// The `validate_assignment` value that will be restored.
    pub fn had_validate_assignment(&self) -> bool {
        self.had_validate_assignment
    }
}

impl Drop for AssignmentScope {
    fn drop(&mut self) {
        self.class.set_config_flag(
            ConfigKey::ValidateAssignment,
            self.had_validate_assignment,
        );
        if let Some(setters) = self.saved_setters.take() {
            self.class.restore_setter_cache(setters);
        }
        debug!(
            "event=assignment_scope module=apply status=ok model={} flag={} restored={}",
            self.class.name(),
            ConfigKey::ValidateAssignment.as_str(),
            self.had_validate_assignment
        );
    }
}
