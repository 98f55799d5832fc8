//! Syntax: expression trees, references and function definitions.
//!
//! The parser in [`crate::parser`] produces these types; everything above
//! this layer works on them.

mod expression;
mod function;
mod reference;

pub use expression::{
    Aggregator, ArithmeticOperator, ComparisonOperator, ExpressionNode, Function, TensorFunction,
    Value,
};
pub use function::ExpressionFunction;
pub use reference::Reference;
