//! Expression type inference.

use super::context::TypeContext;
use super::error::TypeError;
use crate::base::{TensorType, TensorTypeError};
use crate::syntax::{ExpressionNode, TensorFunction};

impl ExpressionNode {
    /// The type this expression produces, given the types of the features
    /// it references.
    pub fn type_of<C: TypeContext + ?Sized>(&self, context: &C) -> Result<TensorType, TypeError> {
        let algebra = |result: Result<TensorType, TensorTypeError>| {
            result.map_err(|source| TypeError::Tensor {
                expression: self.to_string(),
                source,
            })
        };

        match self {
            ExpressionNode::Constant(_) | ExpressionNode::Name(_) => Ok(TensorType::empty()),
            ExpressionNode::Reference(reference) => context.resolve(reference),
            ExpressionNode::Arithmetic { left, right, .. }
            | ExpressionNode::Comparison { left, right, .. } => {
                let left = left.type_of(context)?;
                let right = right.type_of(context)?;
                algebra(left.join(&right))
            }
            ExpressionNode::Not(child) | ExpressionNode::Negative(child) => child.type_of(context),
            ExpressionNode::If {
                condition,
                if_true,
                if_false,
            } => {
                condition.type_of(context)?;
                let if_true = if_true.type_of(context)?;
                let if_false = if_false.type_of(context)?;
                if_true
                    .generalize(&if_false)
                    .ok_or(TypeError::IncompatibleBranches { if_true, if_false })
            }
            ExpressionNode::Function { arguments, .. } => {
                let mut types = arguments.iter().map(|a| a.type_of(context));
                let mut result = types.next().transpose()?.unwrap_or_default();
                for argument in types {
                    result = algebra(result.join(&argument?))?;
                }
                Ok(result)
            }
            ExpressionNode::TensorFunction {
                function,
                arguments,
            } => {
                let types = arguments
                    .iter()
                    .map(|a| a.type_of(context))
                    .collect::<Result<Vec<_>, _>>()?;
                let (first, second) = match types.as_slice() {
                    [first] => (first, None),
                    [first, second] => (first, Some(second)),
                    _ => {
                        return Err(TypeError::InvalidArgumentCount {
                            feature: function.name().into(),
                            expected: "one or two tensor",
                            found: types.len(),
                        });
                    }
                };
                let second = || second.cloned().unwrap_or_default();
                algebra(match function {
                    TensorFunction::Reduce { dimensions, .. } => first.reduce(dimensions),
                    TensorFunction::Rename { from, to } => first.rename(from, to),
                    TensorFunction::Concat { dimension } => first.concat(&second(), dimension),
                    TensorFunction::Matmul { dimension } => first
                        .join(&second())
                        .and_then(|joined| joined.reduce(std::slice::from_ref(dimension))),
                    TensorFunction::Softmax { dimension }
                    | TensorFunction::L2Normalize { dimension } => first
                        .reduce(std::slice::from_ref(dimension))
                        .map(|_| first.clone()),
                })
            }
        }
    }
}
