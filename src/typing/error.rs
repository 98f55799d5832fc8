//! Error types for type resolution.

use thiserror::Error;

use crate::base::{Name, TensorType, TensorTypeError};
use crate::parser::ParseError;
use crate::syntax::Reference;

/// Errors that can occur while resolving the type of a reference or
/// expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TypeError {
    /// A reference depends on itself through function invocation or
    /// bound-identifier substitution.
    #[error("Invocation loop: {}", join_chain(.chain))]
    Cycle { chain: Vec<Reference> },

    /// The text bound to an identifier is not a valid expression.
    #[error("could not parse '{text}', bound to '{identifier}'")]
    UnresolvedParse {
        identifier: Name,
        text: String,
        #[source]
        source: ParseError,
    },

    /// A non-query simple feature has no declared type.
    #[error("no type is declared for {reference}, and it has no default type")]
    MissingDeclaredType { reference: Reference },

    /// A built-in feature received the wrong number of arguments.
    #[error("{feature} must have {expected} arguments, got {found}")]
    InvalidArgumentCount {
        feature: Name,
        expected: &'static str,
        found: usize,
    },

    /// A built-in feature received an argument of the wrong kind.
    #[error("the {position} argument of {feature} must be {expected}, not {found}")]
    InvalidArgumentKind {
        feature: Name,
        position: &'static str,
        expected: &'static str,
        found: String,
    },

    /// The two alternatives of an if expression have incompatible types.
    #[error("an if expression must produce compatible types in both alternatives, but got {if_true} and {if_false}")]
    IncompatibleBranches {
        if_true: TensorType,
        if_false: TensorType,
    },

    /// Tensor type algebra failed for an expression.
    #[error("invalid type in '{expression}': {source}")]
    Tensor {
        expression: String,
        #[source]
        source: TensorTypeError,
    },
}

fn join_chain(chain: &[Reference]) -> String {
    chain
        .iter()
        .map(Reference::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}
