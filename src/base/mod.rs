//! Foundation types for ranking expression typing.
//!
//! This module provides the value types everything else is built on:
//! - [`TensorType`], [`Dimension`], [`CellType`] - Tensor shapes
//! - [`Name`] - Cheap-to-clone identifier strings
//! - Identifier and quoting helpers
//!
//! This module has NO dependencies on other crate modules.

mod tensor_type;
pub mod text_utils;

pub use tensor_type::{
    CellType, Dimension, DimensionKind, TensorType, TensorTypeBuilder, TensorTypeError,
};

/// An identifier: feature names, function names, dimension names.
pub type Name = smol_str::SmolStr;
