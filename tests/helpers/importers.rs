//! Instrumented model importers.

use std::sync::atomic::{AtomicUsize, Ordering};

use rankexpr::transform::{ConvertedModel, ImportedModel, ModelImportError, ModelImporter, ModelPath};
use rustc_hash::FxHashMap;

use super::fixtures::{CONSTANT_MODEL, DENSE_MODEL};

/// Serves in-memory models and counts import calls.
#[derive(Default)]
pub struct CountingImporter {
    models: FxHashMap<ModelPath, ConvertedModel>,
    imports: AtomicUsize,
}

impl CountingImporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// An importer serving `models/dense` and `models/constant`.
    pub fn standard() -> Self {
        Self::new()
            .with("models/dense", DENSE_MODEL.clone())
            .with("models/constant", CONSTANT_MODEL.clone())
    }

    pub fn with(mut self, path: &str, model: ConvertedModel) -> Self {
        self.models.insert(ModelPath::new(path), model);
        self
    }

    /// The number of import calls so far, failed ones included.
    pub fn imports(&self) -> usize {
        self.imports.load(Ordering::SeqCst)
    }
}

impl ModelImporter for CountingImporter {
    fn import(&self, path: &ModelPath) -> Result<Box<dyn ImportedModel>, ModelImportError> {
        self.imports.fetch_add(1, Ordering::SeqCst);
        match self.models.get(path) {
            Some(model) => Ok(Box::new(model.clone())),
            None => Err(ModelImportError::NotFound(path.clone())),
        }
    }
}
