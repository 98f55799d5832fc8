//! Well-known feature names and their typing rules.

use crate::base::TensorType;
use crate::syntax::Reference;

pub const ATTRIBUTE: &str = "attribute";
pub const QUERY: &str = "query";
pub const CONSTANT: &str = "constant";

/// The namespaces of simple features.
pub const SIMPLE_FEATURE_NAMESPACES: [&str; 3] = [ATTRIBUTE, QUERY, CONSTANT];

pub const TENSOR_FROM_LABELS: &str = "tensorFromLabels";
pub const TENSOR_FROM_WEIGHTED_SET: &str = "tensorFromWeightedSet";

/// Whether this is a reference into the attribute, query or constant
/// namespace with at most one argument and no output.
pub fn is_simple_feature(reference: &Reference) -> bool {
    SIMPLE_FEATURE_NAMESPACES.contains(&reference.name())
        && reference.arguments().len() <= 1
        && reference.output().is_none()
}

/// Whether `name` is one of the built-in tensor-constructing features.
pub fn is_tensor_constructor(name: &str) -> bool {
    name == TENSOR_FROM_LABELS || name == TENSOR_FROM_WEIGHTED_SET
}

/// The type a simple feature has when none is declared.
///
/// Query features default to the scalar type, since only non-scalar query
/// features must be declared. Every other namespace has no default, and
/// `None` is also returned for references that are not simple features.
/// Callers decide whether absence is an error.
pub fn default_type_of(reference: &Reference) -> Option<TensorType> {
    if !is_simple_feature(reference) {
        return None;
    }
    (reference.name() == QUERY).then(TensorType::empty)
}
