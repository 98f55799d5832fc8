//! Recursive descent parser for ranking expressions
//!
//! Builds an [`ExpressionNode`] tree directly from tokens. Parsing stops at
//! the first error; expressions are small and authored one at a time, so
//! there is no recovery.

use text_size::{TextRange, TextSize};
use thiserror::Error;

use super::lexer::{Lexer, Token, TokenKind};
use crate::base::Name;
use crate::syntax::{
    Aggregator, ArithmeticOperator, ComparisonOperator, ExpressionNode, Function, Reference,
    TensorFunction, Value,
};

/// A syntax error with location and message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at {range:?}")]
pub struct ParseError {
    pub message: String,
    pub range: TextRange,
}

impl ParseError {
    pub fn new(message: impl Into<String>, range: TextRange) -> Self {
        Self {
            message: message.into(),
            range,
        }
    }

    /// An error not tied to a particular token.
    pub fn at_start(message: impl Into<String>) -> Self {
        Self::new(message, TextRange::empty(TextSize::new(0)))
    }
}

/// Parse ranking expression text into a tree. The whole input must be
/// consumed.
pub fn parse_expression(input: &str) -> Result<ExpressionNode, ParseError> {
    let tokens: Vec<_> = Lexer::new(input).collect();
    let mut parser = Parser::new(&tokens, input.len());
    let expression = parser.parse_expression()?;
    if let Some(token) = parser.current() {
        return Err(ParseError::new(
            format!("unexpected {} '{}' after expression", token.kind.describe(), token.text),
            token.range,
        ));
    }
    Ok(expression)
}

/// The parser state
struct Parser<'a> {
    tokens: &'a [Token<'a>],
    pos: usize,
    input_len: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token<'a>], input_len: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            input_len,
        }
    }

    // =========================================================================
    // Token inspection
    // =========================================================================

    fn current(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn current_kind(&self) -> Option<TokenKind> {
        self.current().map(|t| t.kind)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current_kind() == Some(kind)
    }

    fn nth(&self, n: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + n).map(|t| t.kind)
    }

    fn bump(&mut self) -> Option<&'a Token<'a>> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&'a Token<'a>, ParseError> {
        if self.at(kind) {
            let token = &self.tokens[self.pos];
            self.pos += 1;
            Ok(token)
        } else {
            Err(self.unexpected(kind.describe()))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.current() {
            Some(token) => ParseError::new(
                format!("expected {}, found '{}'", expected, token.text),
                token.range,
            ),
            None => ParseError::new(
                format!("expected {}, found end of input", expected),
                TextRange::empty(TextSize::new(self.input_len as u32)),
            ),
        }
    }

    // =========================================================================
    // Binary operators (lowest to highest precedence)
    // =========================================================================

    fn parse_expression(&mut self) -> Result<ExpressionNode, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<ExpressionNode, ParseError> {
        let mut left = self.parse_and()?;
        while self.eat(TokenKind::PipePipe) {
            let right = self.parse_and()?;
            left = ExpressionNode::arithmetic(ArithmeticOperator::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<ExpressionNode, ParseError> {
        let mut left = self.parse_comparison()?;
        while self.eat(TokenKind::AmpAmp) {
            let right = self.parse_comparison()?;
            left = ExpressionNode::arithmetic(ArithmeticOperator::And, left, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<ExpressionNode, ParseError> {
        let left = self.parse_additive()?;
        let operator = match self.current_kind() {
            Some(TokenKind::EqEq) => ComparisonOperator::Equal,
            Some(TokenKind::BangEq) => ComparisonOperator::NotEqual,
            Some(TokenKind::TildeEq) => ComparisonOperator::ApproxEqual,
            Some(TokenKind::Lt) => ComparisonOperator::Less,
            Some(TokenKind::LtEq) => ComparisonOperator::LessOrEqual,
            Some(TokenKind::Gt) => ComparisonOperator::Greater,
            Some(TokenKind::GtEq) => ComparisonOperator::GreaterOrEqual,
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.parse_additive()?;
        Ok(ExpressionNode::Comparison {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_additive(&mut self) -> Result<ExpressionNode, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let operator = match self.current_kind() {
                Some(TokenKind::Plus) => ArithmeticOperator::Plus,
                Some(TokenKind::Minus) => ArithmeticOperator::Minus,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_multiplicative()?;
            left = ExpressionNode::arithmetic(operator, left, right);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<ExpressionNode, ParseError> {
        let mut left = self.parse_power()?;
        loop {
            let operator = match self.current_kind() {
                Some(TokenKind::Star) => ArithmeticOperator::Multiply,
                Some(TokenKind::Slash) => ArithmeticOperator::Divide,
                Some(TokenKind::Percent) => ArithmeticOperator::Modulo,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_power()?;
            left = ExpressionNode::arithmetic(operator, left, right);
        }
    }

    /// Power is right-associative: `a ^ b ^ c` is `a ^ (b ^ c)`.
    fn parse_power(&mut self) -> Result<ExpressionNode, ParseError> {
        let base = self.parse_unary()?;
        if self.eat(TokenKind::Caret) {
            let exponent = self.parse_power()?;
            return Ok(ExpressionNode::arithmetic(ArithmeticOperator::Power, base, exponent));
        }
        Ok(base)
    }

    fn parse_unary(&mut self) -> Result<ExpressionNode, ParseError> {
        if self.eat(TokenKind::Bang) {
            return Ok(ExpressionNode::Not(Box::new(self.parse_unary()?)));
        }
        if self.eat(TokenKind::Minus) {
            return Ok(match self.parse_unary()? {
                ExpressionNode::Constant(Value::Double(v)) => ExpressionNode::number(-v),
                operand => ExpressionNode::Negative(Box::new(operand)),
            });
        }
        self.parse_primary()
    }

    // =========================================================================
    // Primary expressions
    // =========================================================================

    fn parse_primary(&mut self) -> Result<ExpressionNode, ParseError> {
        match self.current_kind() {
            Some(TokenKind::Number) => {
                let token = self.bump().ok_or_else(|| self.unexpected("number"))?;
                let (text, range) = (token.text, token.range);
                text.parse::<f64>()
                    .map(ExpressionNode::number)
                    .map_err(|_| ParseError::new(format!("invalid number '{}'", text), range))
            }
            Some(TokenKind::String) => {
                let token = self.bump().ok_or_else(|| self.unexpected("string"))?;
                Ok(ExpressionNode::string(unescape(token.text)))
            }
            Some(TokenKind::LParen) => {
                self.pos += 1;
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            Some(TokenKind::Ident) => self.parse_identifier_expression(),
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn parse_identifier_expression(&mut self) -> Result<ExpressionNode, ParseError> {
        let token = self.expect(TokenKind::Ident)?;
        let (name, range) = (token.text, token.range);
        let called = self.at(TokenKind::LParen);

        match name {
            "true" if !called => return Ok(ExpressionNode::number(1.0)),
            "false" if !called => return Ok(ExpressionNode::number(0.0)),
            "if" if called => return self.parse_if(),
            _ => {}
        }
        if called {
            if let Some(function) = Function::from_name(name) {
                let arguments = self.parse_arguments()?;
                if arguments.len() != function.arity() {
                    return Err(ParseError::new(
                        format!(
                            "{} takes {} argument(s), got {}",
                            function.name(),
                            function.arity(),
                            arguments.len()
                        ),
                        range,
                    ));
                }
                return Ok(ExpressionNode::Function {
                    function,
                    arguments,
                });
            }
            if TensorFunction::is_tensor_function(name) {
                return self.parse_tensor_function(name, range);
            }
        }
        self.parse_reference_tail(name).map(ExpressionNode::Reference)
    }

    /// `name` has been consumed; parse optional arguments and output.
    fn parse_reference_tail(&mut self, name: &str) -> Result<Reference, ParseError> {
        let arguments = if self.at(TokenKind::LParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        let mut output: Option<String> = None;
        while self.at(TokenKind::Dot) && self.nth(1) == Some(TokenKind::Ident) {
            self.pos += 1;
            let part = self.expect(TokenKind::Ident)?.text;
            match output.as_mut() {
                Some(output) => {
                    output.push('.');
                    output.push_str(part);
                }
                None => output = Some(part.to_string()),
            }
        }
        Ok(Reference::new(name, arguments, output.map(Name::from)))
    }

    fn parse_arguments(&mut self) -> Result<Vec<ExpressionNode>, ParseError> {
        self.expect(TokenKind::LParen)?;
        let mut arguments = Vec::new();
        if self.eat(TokenKind::RParen) {
            return Ok(arguments);
        }
        loop {
            arguments.push(self.parse_expression()?);
            if self.eat(TokenKind::Comma) {
                continue;
            }
            self.expect(TokenKind::RParen)?;
            return Ok(arguments);
        }
    }

    fn parse_if(&mut self) -> Result<ExpressionNode, ParseError> {
        let open = self.current().map(|t| t.range);
        let mut arguments = self.parse_arguments()?;
        if arguments.len() != 3 {
            return Err(ParseError::new(
                format!("if takes 3 arguments, got {}", arguments.len()),
                open.unwrap_or_default(),
            ));
        }
        let if_false = arguments.pop().map(Box::new);
        let if_true = arguments.pop().map(Box::new);
        let condition = arguments.pop().map(Box::new);
        match (condition, if_true, if_false) {
            (Some(condition), Some(if_true), Some(if_false)) => Ok(ExpressionNode::If {
                condition,
                if_true,
                if_false,
            }),
            _ => Err(ParseError::new("malformed if", open.unwrap_or_default())),
        }
    }

    /// Tensor functions take tensor arguments followed by names
    /// (aggregators and dimensions), which are not expressions.
    fn parse_tensor_function(&mut self, name: &str, range: TextRange) -> Result<ExpressionNode, ParseError> {
        self.expect(TokenKind::LParen)?;
        let mut arguments = Vec::new();
        for i in 0..TensorFunction::tensor_arity(name) {
            if i > 0 {
                self.expect(TokenKind::Comma)?;
            }
            arguments.push(self.parse_expression()?);
        }
        let mut names = Vec::new();
        while self.eat(TokenKind::Comma) {
            names.push(Name::from(self.expect(TokenKind::Ident)?.text));
        }
        self.expect(TokenKind::RParen)?;

        let wrong_arity = |expected: &str| {
            ParseError::new(format!("{} expects {}", name, expected), range)
        };
        let function = match (name, names.as_slice()) {
            ("reduce", [aggregator, dimensions @ ..]) => TensorFunction::Reduce {
                aggregator: Aggregator::from_name(aggregator).ok_or_else(|| {
                    ParseError::new(format!("unknown aggregator '{}'", aggregator), range)
                })?,
                dimensions: dimensions.to_vec(),
            },
            ("reduce", _) => return Err(wrong_arity("an aggregator")),
            ("rename", [from, to]) => TensorFunction::Rename {
                from: from.clone(),
                to: to.clone(),
            },
            ("rename", _) => return Err(wrong_arity("a from and a to dimension")),
            (_, [dimension]) => match name {
                "concat" => TensorFunction::Concat {
                    dimension: dimension.clone(),
                },
                "matmul" => TensorFunction::Matmul {
                    dimension: dimension.clone(),
                },
                "softmax" => TensorFunction::Softmax {
                    dimension: dimension.clone(),
                },
                _ => TensorFunction::L2Normalize {
                    dimension: dimension.clone(),
                },
            },
            _ => return Err(wrong_arity("exactly one dimension")),
        };
        Ok(ExpressionNode::TensorFunction {
            function,
            arguments,
        })
    }
}

/// Strip the quotes of a string token and resolve backslash escapes.
fn unescape(text: &str) -> String {
    let inner = &text[1..text.len().saturating_sub(1).max(1)];
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some(other) => result.push(other),
                None => {}
            }
        } else {
            result.push(c);
        }
    }
    result
}
