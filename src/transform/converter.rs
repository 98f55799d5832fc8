//! Replaces external model pseudo-features with native expressions.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use super::error::TransformError;
use super::model::{ImportedModel, ModelPath, argument_text};
use super::{ExpressionTransformer, TransformContext};
use crate::base::Name;
use crate::syntax::{ExpressionNode, Reference};

/// The name of the external model pseudo-feature.
///
/// Kept as `tensorflow` whatever the importing backend is.
pub const MODEL_FEATURE: &str = "tensorflow";

/// Rewrites `tensorflow(path[, signature[, output]])` features into the
/// expression computing the selected model output.
///
/// Each distinct model path is imported once per converter. A converter is
/// meant to serve one conversion pass; create a new one per rank profile.
#[derive(Debug, Default)]
pub struct ModelFeatureConverter {
    models: FxHashMap<ModelPath, Rc<dyn ImportedModel>>,
}

/// The arguments of a model feature: `(path, signature, output)`.
struct FeatureArguments {
    path: ModelPath,
    signature: Option<String>,
    output: Option<String>,
}

impl FeatureArguments {
    fn new(feature: &Reference) -> Result<Self, TransformError> {
        match feature.arguments() {
            [path, rest @ ..] if rest.len() <= 2 => Ok(Self {
                path: ModelPath::from_argument(path),
                signature: rest.first().map(argument_text),
                output: rest.get(1).map(argument_text),
            }),
            arguments => Err(TransformError::InvalidArgumentCount {
                feature: Name::from(feature.name()),
                found: arguments.len(),
            }),
        }
    }
}

impl ModelFeatureConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of distinct models imported so far.
    pub fn imported_models(&self) -> usize {
        self.models.len()
    }

    fn transform_feature(
        &mut self,
        feature: &Reference,
        context: &mut TransformContext<'_>,
    ) -> Result<ExpressionNode, TransformError> {
        let arguments = FeatureArguments::new(feature)?;
        let model = self.model(&arguments.path, context)?;
        Ok(model.expression_for(arguments.signature.as_deref(), arguments.output.as_deref())?)
    }

    /// The model at `path`, importing it on first use.
    fn model(
        &mut self,
        path: &ModelPath,
        context: &mut TransformContext<'_>,
    ) -> Result<Rc<dyn ImportedModel>, TransformError> {
        if let Some(model) = self.models.get(path) {
            debug!("[MODEL] cache hit for '{}'", path);
            return Ok(Rc::clone(model));
        }

        debug!("[MODEL] importing '{}'", path);
        let model: Rc<dyn ImportedModel> = Rc::from(context.importer().import(path)?);
        verify_inputs(model.as_ref(), context)?;
        for function in model.functions() {
            context.add_function(function);
        }
        for (name, tensor_type) in model.constants() {
            context.add_constant(&name, tensor_type);
        }
        self.models.insert(path.clone(), Rc::clone(&model));
        Ok(model)
    }
}

/// Check that every input the model reads has a type the model accepts.
fn verify_inputs(model: &dyn ImportedModel, context: &TransformContext<'_>) -> Result<(), TransformError> {
    let Some(types) = context.types() else {
        return Ok(());
    };
    for (input, expected) in model.inputs() {
        let declared = types.resolve(&input)?;
        trace!("[MODEL] input '{}' declared {} expected {}", input, declared, expected);
        if !declared.is_assignable_to(&expected) {
            return Err(TransformError::InputType {
                input,
                declared,
                expected,
            });
        }
    }
    Ok(())
}

impl<'a> ExpressionTransformer<TransformContext<'a>> for ModelFeatureConverter {
    fn transform(
        &mut self,
        node: &ExpressionNode,
        context: &mut TransformContext<'a>,
    ) -> Result<ExpressionNode, TransformError> {
        match node {
            ExpressionNode::Reference(feature) if feature.name() == MODEL_FEATURE => {
                trace!("[MODEL] converting '{}'", feature);
                self.transform_feature(feature, context)
                    .map_err(|source| TransformError::Feature {
                        feature: feature.to_string(),
                        source: Box::new(source),
                    })
            }
            node if node.is_composite() => self.transform_children(node, context),
            node => Ok(node.clone()),
        }
    }
}
