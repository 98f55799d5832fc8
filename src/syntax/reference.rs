//! Feature and function references.

use std::fmt;
use std::str::FromStr;

use super::{ExpressionNode, Value};
use crate::base::Name;
use crate::parser::{ParseError, parse_expression};

/// A reference to a feature or function: `name(arguments).output`.
///
/// References are immutable values with structural equality and hashing, so
/// they can key lookup tables. Two references are equal iff their names,
/// arguments and outputs are equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Reference {
    name: Name,
    arguments: Vec<ExpressionNode>,
    output: Option<Name>,
}

impl Reference {
    pub fn new(name: impl Into<Name>, arguments: Vec<ExpressionNode>, output: Option<Name>) -> Self {
        Self {
            name: name.into(),
            arguments,
            output,
        }
    }

    /// A reference with no arguments and no output: a bare identifier.
    pub fn identifier(name: impl Into<Name>) -> Self {
        Self::new(name, Vec::new(), None)
    }

    /// A single-argument reference such as `attribute(title)`.
    ///
    /// The argument is stored as an identifier holding the given text.
    pub fn simple(name: impl Into<Name>, argument: impl Into<Name>) -> Self {
        Self::new(
            name,
            vec![ExpressionNode::Reference(Reference::identifier(argument))],
            None,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arguments(&self) -> &[ExpressionNode] {
        &self.arguments
    }

    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    /// Whether this is a bare identifier (no arguments, no output).
    pub fn is_identifier(&self) -> bool {
        self.arguments.is_empty() && self.output.is_none()
    }

    /// The text of the single argument of this reference, unquoted if it is
    /// a string literal. `None` unless there is exactly one argument.
    pub fn simple_argument(&self) -> Option<String> {
        match self.arguments.as_slice() {
            [ExpressionNode::Constant(Value::String(text))] => Some(text.to_string()),
            [argument] => Some(argument.to_string()),
            _ => None,
        }
    }

    pub fn with_arguments(&self, arguments: Vec<ExpressionNode>) -> Self {
        Self {
            name: self.name.clone(),
            arguments,
            output: self.output.clone(),
        }
    }

    pub fn with_output(&self, output: Option<Name>) -> Self {
        Self {
            name: self.name.clone(),
            arguments: self.arguments.clone(),
            output,
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.arguments.is_empty() {
            f.write_str("(")?;
            for (i, argument) in self.arguments.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{}", argument)?;
            }
            f.write_str(")")?;
        }
        if let Some(output) = &self.output {
            write!(f, ".{}", output)?;
        }
        Ok(())
    }
}

impl FromStr for Reference {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parse_expression(s)? {
            ExpressionNode::Reference(reference) => Ok(reference),
            other => Err(ParseError::at_start(format!(
                "expected a feature reference, got '{}'",
                other
            ))),
        }
    }
}
