//! # rankexpr
//!
//! Static tensor type resolution for ranking expressions, and the rewrite
//! that replaces external model features with native expressions.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! profile   → RankProfile compilation, FeatureDeclarations, compile_all
//!   ↓
//! transform → ExpressionTransformer, ModelFeatureConverter, model importers
//!   ↓
//! typing    → TypeResolutionContext, BindingScope, type inference
//!   ↓
//! syntax    → Reference, ExpressionNode, ExpressionFunction
//!   ↓
//! parser    → Logos lexer, recursive-descent expression parser
//!   ↓
//! base      → TensorType, Dimension, CellType, Name
//! ```

// ============================================================================
// MODULES (dependency order: base → parser → syntax → typing → transform → profile)
// ============================================================================

/// Foundation types: tensor types and names
pub mod base;

/// Parser: Logos lexer and recursive-descent expression parser
pub mod parser;

/// Syntax: expression trees, references, functions
pub mod syntax;

/// Typing: resolution context and expression type inference
pub mod typing;

/// Transforms: model feature conversion and model importers
pub mod transform;

/// Rank profiles: declarations and compilation
pub mod profile;

// Re-export commonly needed items
pub use base::{CellType, Dimension, Name, TensorType};
pub use parser::{ParseError, parse_expression};
pub use profile::{CompileError, CompiledProfile, FeatureDeclarations, RankProfile, compile_all};
pub use syntax::{ExpressionFunction, ExpressionNode, Reference};
pub use transform::{ModelFeatureConverter, ModelImporter, TransformContext, TransformError};
pub use typing::{TypeError, TypeResolutionContext};
