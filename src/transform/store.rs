//! Models stored as converted JSON under a models directory.
//!
//! ```text
//! <root>/<model path>/converted.json
//! {
//!   "signatures": { "serving_default": { "y": "reduce(...)" } },
//!   "functions":  { "layer": { "arguments": ["x"], "body": "relu(x)" } },
//!   "constants":  { "weights": "tensor(d0[3],d1[2])" },
//!   "inputs":     { "query(input)": "tensor(d0[1],d1[3])" }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::error::ModelImportError;
use super::model::{ConvertedModel, ImportedModel, ModelImporter, ModelPath, Signature};
use crate::base::{Name, TensorType};
use crate::parser::parse_expression;
use crate::syntax::{ExpressionFunction, Reference};

/// The file holding a converted model, inside the model's directory.
pub const CONVERTED_MODEL_FILE: &str = "converted.json";

/// The JSON layout of a stored model. Expressions and types are text.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct StoredModel {
    #[serde(default)]
    signatures: IndexMap<String, IndexMap<String, String>>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    functions: IndexMap<String, StoredFunction>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    constants: IndexMap<String, String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    inputs: IndexMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct StoredFunction {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    arguments: Vec<String>,
    body: String,
}

/// Imports models from `<root>/<model path>/converted.json`.
#[derive(Clone, Debug)]
pub struct StoreModelImporter {
    root: PathBuf,
}

impl StoreModelImporter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The file a model at `path` is read from.
    pub fn model_file(&self, path: &ModelPath) -> PathBuf {
        let mut file = self.root.clone();
        file.extend(path.segments());
        file.push(CONVERTED_MODEL_FILE);
        file
    }

    /// Write `model` where [`import`](ModelImporter::import) will find it.
    pub fn store(&self, path: &ModelPath, model: &ConvertedModel) -> Result<PathBuf, ModelImportError> {
        let file = self.model_file(path);
        let io = |source: std::io::Error| ModelImportError::Io {
            path: file.clone(),
            source,
        };
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent).map_err(io)?;
        }
        let json = serde_json::to_string_pretty(&StoredModel::from(model)).map_err(|e| {
            ModelImportError::Format {
                path: path.clone(),
                message: e.to_string(),
            }
        })?;
        std::fs::write(&file, json).map_err(io)?;
        Ok(file)
    }
}

impl ModelImporter for StoreModelImporter {
    fn import(&self, path: &ModelPath) -> Result<Box<dyn ImportedModel>, ModelImportError> {
        let file = self.model_file(path);
        if !file.is_file() {
            return Err(ModelImportError::NotFound(path.clone()));
        }
        tracing::debug!("Reading converted model from {}", file.display());
        let content = std::fs::read_to_string(&file).map_err(|source| ModelImportError::Io {
            path: file.clone(),
            source,
        })?;
        let stored: StoredModel =
            serde_json::from_str(&content).map_err(|e| ModelImportError::Format {
                path: path.clone(),
                message: e.to_string(),
            })?;
        Ok(Box::new(stored.into_model(path)?))
    }
}

impl StoredModel {
    fn into_model(self, path: &ModelPath) -> Result<ConvertedModel, ModelImportError> {
        let expression = |text: &str| {
            parse_expression(text).map_err(|source| ModelImportError::Expression {
                path: path.clone(),
                source,
            })
        };
        let tensor_type = |text: &str| {
            TensorType::from_str(text).map_err(|source| ModelImportError::Type {
                path: path.clone(),
                source,
            })
        };

        let mut model = ConvertedModel::new(path.last());
        for (name, outputs) in &self.signatures {
            let mut signature = Signature::new();
            for (output, text) in outputs {
                signature = signature.with_output(output.as_str(), expression(text)?);
            }
            model = model.with_signature(name.as_str(), signature);
        }
        for (name, function) in &self.functions {
            model = model.with_function(ExpressionFunction::new(
                name.as_str(),
                function.arguments.iter().map(|a| Name::from(a.as_str())).collect(),
                expression(&function.body)?,
            ));
        }
        for (name, text) in &self.constants {
            model = model.with_constant(name.as_str(), tensor_type(text)?);
        }
        for (input, text) in &self.inputs {
            let reference = Reference::from_str(input).map_err(|source| ModelImportError::Expression {
                path: path.clone(),
                source,
            })?;
            model = model.with_input(reference, tensor_type(text)?);
        }
        Ok(model)
    }
}

impl From<&ConvertedModel> for StoredModel {
    fn from(model: &ConvertedModel) -> Self {
        StoredModel {
            signatures: model
                .signatures()
                .iter()
                .map(|(name, signature)| {
                    let outputs = signature
                        .outputs()
                        .iter()
                        .map(|(output, e)| (output.to_string(), e.to_string()))
                        .collect();
                    (name.to_string(), outputs)
                })
                .collect(),
            functions: model
                .functions()
                .into_iter()
                .map(|f| {
                    let stored = StoredFunction {
                        arguments: f.arguments().iter().map(Name::to_string).collect(),
                        body: f.body().to_string(),
                    };
                    (f.name().to_string(), stored)
                })
                .collect(),
            constants: model
                .constants()
                .into_iter()
                .map(|(name, t)| (name.to_string(), t.to_string()))
                .collect(),
            inputs: model
                .inputs()
                .into_iter()
                .map(|(input, t)| (input.to_string(), t.to_string()))
                .collect(),
        }
    }
}
