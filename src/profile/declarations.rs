//! Statically known feature types of a rank profile.

use indexmap::IndexMap;

use crate::base::{Name, TensorType};
use crate::syntax::Reference;
use crate::typing::{TypeResolutionContext, features};

/// Declared types of attribute, query and constant features, by name.
///
/// With the `model-store` feature this (de)serializes as
/// `{ "attributes": { "a": "tensor(x{})" }, "query": {..}, "constants": {..} }`.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "model-store", derive(serde::Serialize, serde::Deserialize))]
pub struct FeatureDeclarations {
    #[cfg_attr(feature = "model-store", serde(default, skip_serializing_if = "IndexMap::is_empty"))]
    attributes: IndexMap<Name, TensorType>,

    #[cfg_attr(feature = "model-store", serde(default, skip_serializing_if = "IndexMap::is_empty"))]
    query: IndexMap<Name, TensorType>,

    #[cfg_attr(feature = "model-store", serde(default, skip_serializing_if = "IndexMap::is_empty"))]
    constants: IndexMap<Name, TensorType>,
}

impl FeatureDeclarations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, name: impl Into<Name>, tensor_type: TensorType) -> Self {
        self.attributes.insert(name.into(), tensor_type);
        self
    }

    pub fn with_query(mut self, name: impl Into<Name>, tensor_type: TensorType) -> Self {
        self.query.insert(name.into(), tensor_type);
        self
    }

    pub fn with_constant(mut self, name: impl Into<Name>, tensor_type: TensorType) -> Self {
        self.constants.insert(name.into(), tensor_type);
        self
    }

    pub fn len(&self) -> usize {
        self.attributes.len() + self.query.len() + self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every declaration as a `namespace(name)` reference and its type.
    pub fn iter(&self) -> impl Iterator<Item = (Reference, &TensorType)> + '_ {
        [
            (features::ATTRIBUTE, &self.attributes),
            (features::QUERY, &self.query),
            (features::CONSTANT, &self.constants),
        ]
        .into_iter()
        .flat_map(|(namespace, table)| {
            table
                .iter()
                .map(move |(name, t)| (Reference::simple(namespace, name.clone()), t))
        })
    }

    /// Declare every feature type in `context`.
    pub fn declare_into(&self, context: &mut TypeResolutionContext) {
        for (reference, tensor_type) in self.iter() {
            context.declare(reference, tensor_type.clone());
        }
    }

    #[cfg(feature = "model-store")]
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    #[cfg(feature = "model-store")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
