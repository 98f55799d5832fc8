//! Parser: Logos lexer and recursive-descent expression parser.
//!
//! Converts ranking expression text into [`ExpressionNode`](crate::syntax::ExpressionNode)
//! trees. Type resolution uses it to expand bound identifiers, and model
//! stores use it to load stored expressions.

pub mod lexer;
mod parser;

pub use lexer::{Lexer, Token, TokenKind, tokenize};
pub use parser::{ParseError, parse_expression};
