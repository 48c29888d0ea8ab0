//! Decides whether a field annotation denotes a partially-updatable model.

use crate::model::annotation::Annotation;

/// True for model classes carrying the partial-update capability (directly
/// or through a base class), and for unions with at least one such member.
pub fn is_partial_updatable(annotation: &Annotation) -> bool {
    match annotation {
        Annotation::Model(class) => class.has_partial_apply(),
        // Optional[T] is Union[T, None].
        Annotation::Union(members) => members.iter().any(is_partial_updatable),
        _ => false,
    }
}
