//! Error types for expression transforms and model imports.

use std::path::PathBuf;

use thiserror::Error;

use super::model::ModelPath;
use crate::base::{Name, TensorType, TensorTypeError};
use crate::parser::ParseError;
use crate::syntax::Reference;
use crate::typing::TypeError;

/// Errors raised by a model importer or by an imported model.
#[derive(Debug, Error)]
pub enum ModelImportError {
    /// No model exists at the path.
    #[error("no model found at '{0}'")]
    NotFound(ModelPath),

    /// IO error while reading a stored model.
    #[error("could not read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stored model is malformed.
    #[error("invalid model at '{path}': {message}")]
    Format { path: ModelPath, message: String },

    /// A stored expression does not parse.
    #[error("invalid expression in model '{path}': {source}")]
    Expression {
        path: ModelPath,
        #[source]
        source: ParseError,
    },

    /// A stored type does not parse.
    #[error("invalid type in model '{path}': {source}")]
    Type {
        path: ModelPath,
        #[source]
        source: TensorTypeError,
    },

    /// The model has no signatures to select from.
    #[error("model '{model}' has no signatures")]
    NoSignatures { model: Name },

    /// A signature was requested which the model does not have.
    #[error("model '{model}' does not have a signature '{signature}', available signatures: {available}")]
    UnknownSignature {
        model: Name,
        signature: Name,
        available: String,
    },

    /// No signature was requested and the model has several.
    #[error("model '{model}' has multiple signatures ({available}), one must be specified as a second argument")]
    AmbiguousSignature { model: Name, available: String },

    /// An output was requested which the signature does not have.
    #[error("signature '{signature}' of model '{model}' does not have an output '{output}', available outputs: {available}")]
    UnknownOutput {
        model: Name,
        signature: Name,
        output: Name,
        available: String,
    },

    /// No output was requested and the signature has several (or none).
    #[error("signature '{signature}' of model '{model}' has outputs ({available}), one must be specified as a third argument")]
    AmbiguousOutput {
        model: Name,
        signature: Name,
        available: String,
    },
}

/// Errors that can occur while transforming an expression tree.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The model feature has the wrong number of arguments.
    #[error("a {feature} feature must have between 1 and 3 arguments (model path, signature, output), got {found}")]
    InvalidArgumentCount { feature: Name, found: usize },

    /// Importing the model failed.
    #[error(transparent)]
    Import(#[from] ModelImportError),

    /// A model input is declared with a type the model does not accept.
    #[error("{input} is declared as {declared}, but the model expects {expected}")]
    InputType {
        input: Reference,
        declared: TensorType,
        expected: TensorType,
    },

    /// A model input could not be typed.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// Context wrapper naming the feature being converted.
    #[error("Could not use model from {feature}")]
    Feature {
        feature: String,
        #[source]
        source: Box<TransformError>,
    },
}

impl TransformError {
    /// The innermost error, skipping feature context wrappers.
    pub fn root_cause(&self) -> &TransformError {
        match self {
            TransformError::Feature { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
