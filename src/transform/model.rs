//! Imported models and the importer contract.
//!
//! An importer turns a model path into an [`ImportedModel`]: the compiled
//! representation of an external model, able to produce the native
//! expression for a (signature, output) selection. Importing is expensive,
//! so the converter imports each distinct [`ModelPath`] once per pass.

use std::fmt;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use super::error::ModelImportError;
use crate::base::text_utils::strip_quotes;
use crate::base::{Name, TensorType};
use crate::syntax::{ExpressionFunction, ExpressionNode, Reference, Value};

// ============================================================================
// MODEL PATH
// ============================================================================

/// A normalized, slash-separated model path relative to the models
/// directory.
///
/// Quotes are stripped, empty and `.` segments dropped, and `..` removes
/// the preceding segment, so equivalent spellings share one cache entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelPath(Name);

impl ModelPath {
    pub fn new(path: &str) -> Self {
        let mut segments: Vec<&str> = Vec::new();
        for segment in strip_quotes(path).split('/') {
            match segment.trim() {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                segment => segments.push(segment),
            }
        }
        ModelPath(Name::from(segments.join("/")))
    }

    /// The path named by a model feature argument.
    pub fn from_argument(argument: &ExpressionNode) -> Self {
        Self::new(&argument_text(argument))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The path segments, in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// The last segment, used as the model name.
    pub fn last(&self) -> &str {
        self.segments().last().unwrap_or("")
    }
}

impl fmt::Display for ModelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The text of a feature argument, unquoted if it is a string literal.
pub(crate) fn argument_text(argument: &ExpressionNode) -> String {
    match argument {
        ExpressionNode::Constant(Value::String(text)) => text.to_string(),
        other => strip_quotes(&other.to_string()).to_string(),
    }
}

// ============================================================================
// CONTRACTS
// ============================================================================

/// Imports models by path.
pub trait ModelImporter {
    fn import(&self, path: &ModelPath) -> Result<Box<dyn ImportedModel>, ModelImportError>;
}

/// The compiled representation of an imported model.
pub trait ImportedModel: fmt::Debug {
    /// The native expression computing `output` of `signature`.
    ///
    /// Either selector may be omitted when the choice is unambiguous.
    fn expression_for(
        &self,
        signature: Option<&str>,
        output: Option<&str>,
    ) -> Result<ExpressionNode, ModelImportError>;

    /// Functions the emitted expressions call, to be added to the profile.
    fn functions(&self) -> Vec<ExpressionFunction> {
        Vec::new()
    }

    /// Types of the constants the emitted expressions reference, keyed by
    /// constant name.
    fn constants(&self) -> Vec<(Name, TensorType)> {
        Vec::new()
    }

    /// Features the model reads, with the type it expects each to have.
    fn inputs(&self) -> Vec<(Reference, TensorType)> {
        Vec::new()
    }
}

// ============================================================================
// CONVERTED MODEL
// ============================================================================

/// The outputs of one model signature.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Signature {
    outputs: IndexMap<Name, ExpressionNode>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, name: impl Into<Name>, expression: ExpressionNode) -> Self {
        self.outputs.insert(name.into(), expression);
        self
    }

    pub fn outputs(&self) -> &IndexMap<Name, ExpressionNode> {
        &self.outputs
    }
}

/// A model converted to native expressions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConvertedModel {
    name: Name,
    signatures: IndexMap<Name, Signature>,
    functions: Vec<ExpressionFunction>,
    constants: FxHashMap<Name, TensorType>,
    inputs: IndexMap<Reference, TensorType>,
}

impl ConvertedModel {
    pub fn new(name: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_signature(mut self, name: impl Into<Name>, signature: Signature) -> Self {
        self.signatures.insert(name.into(), signature);
        self
    }

    pub fn with_function(mut self, function: ExpressionFunction) -> Self {
        self.functions.push(function);
        self
    }

    pub fn with_constant(mut self, name: impl Into<Name>, tensor_type: TensorType) -> Self {
        self.constants.insert(name.into(), tensor_type);
        self
    }

    pub fn with_input(mut self, input: Reference, tensor_type: TensorType) -> Self {
        self.inputs.insert(input, tensor_type);
        self
    }

    pub fn signatures(&self) -> &IndexMap<Name, Signature> {
        &self.signatures
    }

    fn signature(&self, requested: Option<&str>) -> Result<(&Name, &Signature), ModelImportError> {
        match requested {
            Some(name) => self.signatures.get_key_value(name).ok_or_else(|| {
                ModelImportError::UnknownSignature {
                    model: self.name.clone(),
                    signature: name.into(),
                    available: list(self.signatures.keys()),
                }
            }),
            None => match self.signatures.len() {
                0 => Err(ModelImportError::NoSignatures {
                    model: self.name.clone(),
                }),
                1 => self.signatures.get_index(0).ok_or(ModelImportError::NoSignatures {
                    model: self.name.clone(),
                }),
                _ => Err(ModelImportError::AmbiguousSignature {
                    model: self.name.clone(),
                    available: list(self.signatures.keys()),
                }),
            },
        }
    }
}

impl ImportedModel for ConvertedModel {
    fn expression_for(
        &self,
        signature: Option<&str>,
        output: Option<&str>,
    ) -> Result<ExpressionNode, ModelImportError> {
        let (signature_name, signature) = self.signature(signature)?;
        let outputs = signature.outputs();
        let expression = match output {
            Some(output) => outputs.get(output).ok_or_else(|| ModelImportError::UnknownOutput {
                model: self.name.clone(),
                signature: signature_name.clone(),
                output: output.into(),
                available: list(outputs.keys()),
            })?,
            None if outputs.len() == 1 => &outputs[0],
            None => {
                return Err(ModelImportError::AmbiguousOutput {
                    model: self.name.clone(),
                    signature: signature_name.clone(),
                    available: list(outputs.keys()),
                });
            }
        };
        Ok(expression.clone())
    }

    fn functions(&self) -> Vec<ExpressionFunction> {
        self.functions.clone()
    }

    fn constants(&self) -> Vec<(Name, TensorType)> {
        self.constants
            .iter()
            .map(|(name, t)| (name.clone(), t.clone()))
            .collect()
    }

    fn inputs(&self) -> Vec<(Reference, TensorType)> {
        self.inputs
            .iter()
            .map(|(input, t)| (input.clone(), t.clone()))
            .collect()
    }
}

fn list<'a>(names: impl Iterator<Item = &'a Name>) -> String {
    names.map(Name::as_str).collect::<Vec<_>>().join(", ")
}
