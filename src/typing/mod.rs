//! Typing: static tensor type resolution for ranking expressions.
//!
//! - [`TypeResolutionContext`] - resolves references (features, function
//!   invocations, bound identifiers) to [`TensorType`](crate::base::TensorType)s
//! - [`BindingScope`] - formal parameter bindings of one function invocation
//! - [`features`] - simple feature namespaces and default types
//! - `ExpressionNode::type_of` - type inference over expression trees

mod bindings;
mod context;
mod error;
pub mod features;
mod infer;

pub use bindings::BindingScope;
pub use context::{FeatureTypes, Functions, TypeContext, TypeResolutionContext};
pub use error::TypeError;

#[cfg(test)]
mod tests;
