use std::fmt;

use super::ExpressionNode;
use crate::base::Name;
use crate::parser::{ParseError, parse_expression};

/// A user-defined function: a name, formal parameters and a body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpressionFunction {
    name: Name,
    arguments: Vec<Name>,
    body: ExpressionNode,
}

impl ExpressionFunction {
    pub fn new(name: impl Into<Name>, arguments: Vec<Name>, body: ExpressionNode) -> Self {
        Self {
            name: name.into(),
            arguments,
            body,
        }
    }

    /// Create a function whose body is given as expression text.
    pub fn parse<A: Into<Name>>(
        name: impl Into<Name>,
        arguments: impl IntoIterator<Item = A>,
        body: &str,
    ) -> Result<Self, ParseError> {
        Ok(Self::new(
            name,
            arguments.into_iter().map(Into::into).collect(),
            parse_expression(body)?,
        ))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arguments(&self) -> &[Name] {
        &self.arguments
    }

    pub fn body(&self) -> &ExpressionNode {
        &self.body
    }

    pub fn with_body(&self, body: ExpressionNode) -> Self {
        Self {
            name: self.name.clone(),
            arguments: self.arguments.clone(),
            body,
        }
    }
}

impl fmt::Display for ExpressionFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}): {}", self.name, self.arguments.join(","), self.body)
    }
}
