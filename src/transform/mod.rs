//! Expression tree rewrites.
//!
//! The one rewrite this crate performs is replacing external model
//! pseudo-features (`tensorflow(path, signature, output)`) with the native
//! expression the imported model compiles to:
//!
//! ```text
//! ModelFeatureConverter ──import (once per path)──▶ ModelImporter
//!         │                                              │
//!         │◀─────────── Rc<dyn ImportedModel> ───────────┘
//!         │
//!         └─ expression_for(signature, output) replaces the node
//! ```
//!
//! Functions and constant types the imported models contribute are
//! collected in the [`TransformContext`] so the caller can make them
//! visible to type resolution afterwards.

mod converter;
mod error;
mod model;
#[cfg(feature = "model-store")]
mod store;

pub use converter::{MODEL_FEATURE, ModelFeatureConverter};
pub use error::{ModelImportError, TransformError};
pub use model::{ConvertedModel, ImportedModel, ModelImporter, ModelPath, Signature};
#[cfg(feature = "model-store")]
pub use store::{CONVERTED_MODEL_FILE, StoreModelImporter};

use crate::base::{Name, TensorType};
use crate::syntax::{ExpressionFunction, ExpressionNode, Reference};
use crate::typing::{FeatureTypes, Functions, TypeResolutionContext, features};

/// A rewrite of expression trees, threading a context of type `C`.
pub trait ExpressionTransformer<C> {
    /// Transform one node, returning its replacement.
    fn transform(&mut self, node: &ExpressionNode, context: &mut C) -> Result<ExpressionNode, TransformError>;

    /// Rebuild a node with each of its children transformed.
    fn transform_children(
        &mut self,
        node: &ExpressionNode,
        context: &mut C,
    ) -> Result<ExpressionNode, TransformError> {
        node.map_children(|child| self.transform(child, context))
    }
}

/// State shared by the transforms of one rank profile.
pub struct TransformContext<'a> {
    importer: &'a dyn ModelImporter,
    types: Option<&'a TypeResolutionContext>,
    functions: Functions,
    constants: FeatureTypes,
}

impl<'a> TransformContext<'a> {
    pub fn new(importer: &'a dyn ModelImporter) -> Self {
        Self {
            importer,
            types: None,
            functions: Functions::default(),
            constants: FeatureTypes::default(),
        }
    }

    /// Verify model inputs against the types known to `types`.
    pub fn with_types(mut self, types: &'a TypeResolutionContext) -> Self {
        self.types = Some(types);
        self
    }

    pub fn importer(&self) -> &'a dyn ModelImporter {
        self.importer
    }

    pub fn types(&self) -> Option<&'a TypeResolutionContext> {
        self.types
    }

    /// Functions contributed by imported models.
    pub fn functions(&self) -> &Functions {
        &self.functions
    }

    /// Constant feature types contributed by imported models, keyed by
    /// `constant(name)` references.
    pub fn constants(&self) -> &FeatureTypes {
        &self.constants
    }

    pub(crate) fn add_function(&mut self, function: ExpressionFunction) {
        self.functions.insert(Name::from(function.name()), function);
    }

    pub(crate) fn add_constant(&mut self, name: &str, tensor_type: TensorType) {
        self.constants
            .insert(Reference::simple(features::CONSTANT, name), tensor_type);
    }

    /// Consume the context, returning the collected functions and constants.
    pub fn into_parts(self) -> (Functions, FeatureTypes) {
        (self.functions, self.constants)
    }
}

impl std::fmt::Debug for TransformContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformContext")
            .field("verifies_inputs", &self.types.is_some())
            .field("functions", &self.functions.len())
            .field("constants", &self.constants.len())
            .finish()
    }
}
