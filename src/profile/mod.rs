//! Rank profile compilation.
//!
//! A [`RankProfile`] holds user functions, ranking phases and the declared
//! types of the features they read. Compiling it:
//!
//! 1. seeds a [`TypeResolutionContext`] with the declarations;
//! 2. converts model features in every function body and phase, importing
//!    each model once and verifying its inputs against the seed context;
//! 3. builds the final context from the converted functions, the functions
//!    and constants contributed by imported models, and the declarations;
//! 4. resolves the type of every argument-free function and of each phase.
//!
//! Profiles are independent, so [`compile_all`] compiles them in parallel.
//! Each compilation owns its contexts and its converter.

mod declarations;
mod error;

pub use declarations::FeatureDeclarations;
pub use error::CompileError;

use std::time::Instant;

use indexmap::IndexMap;
use rayon::prelude::*;

use crate::base::{Name, TensorType};
use crate::parser::{ParseError, parse_expression};
use crate::syntax::{ExpressionFunction, ExpressionNode, Reference};
use crate::transform::{ExpressionTransformer, ModelFeatureConverter, ModelImporter, TransformContext};
use crate::typing::{FeatureTypes, Functions, TypeError, TypeResolutionContext};

pub const FIRST_PHASE: &str = "first-phase";
pub const SECOND_PHASE: &str = "second-phase";

/// A named set of ranking expressions and the functions they call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RankProfile {
    name: Name,
    functions: Functions,
    first_phase: Option<ExpressionNode>,
    second_phase: Option<ExpressionNode>,
    declarations: FeatureDeclarations,
}

impl RankProfile {
    pub fn new(name: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a function, replacing any earlier function with the same name.
    pub fn with_function(mut self, function: ExpressionFunction) -> Self {
        self.functions.insert(Name::from(function.name()), function);
        self
    }

    /// Add a function whose body is given as text.
    pub fn parse_function(self, name: &str, arguments: &[&str], body: &str) -> Result<Self, ParseError> {
        let function = ExpressionFunction::parse(name, arguments.iter().copied(), body)?;
        Ok(self.with_function(function))
    }

    pub fn with_first_phase(mut self, expression: ExpressionNode) -> Self {
        self.first_phase = Some(expression);
        self
    }

    pub fn parse_first_phase(self, text: &str) -> Result<Self, ParseError> {
        Ok(self.with_first_phase(parse_expression(text)?))
    }

    pub fn with_second_phase(mut self, expression: ExpressionNode) -> Self {
        self.second_phase = Some(expression);
        self
    }

    pub fn parse_second_phase(self, text: &str) -> Result<Self, ParseError> {
        Ok(self.with_second_phase(parse_expression(text)?))
    }

    pub fn with_declarations(mut self, declarations: FeatureDeclarations) -> Self {
        self.declarations = declarations;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn functions(&self) -> &Functions {
        &self.functions
    }

    pub fn first_phase(&self) -> Option<&ExpressionNode> {
        self.first_phase.as_ref()
    }

    pub fn second_phase(&self) -> Option<&ExpressionNode> {
        self.second_phase.as_ref()
    }

    pub fn declarations(&self) -> &FeatureDeclarations {
        &self.declarations
    }

    /// Convert model features and type every expression of this profile.
    pub fn compile(&self, importer: &dyn ModelImporter) -> Result<CompiledProfile, CompileError> {
        let started = Instant::now();
        tracing::debug!("compile_profile: '{}' ({} functions)", self.name, self.functions.len());

        let mut seed = TypeResolutionContext::new(self.functions.values().cloned());
        self.declarations.declare_into(&mut seed);

        let mut converter = ModelFeatureConverter::new();
        let mut context = TransformContext::new(importer).with_types(&seed);
        let mut convert = |node: &ExpressionNode| {
            converter
                .transform(node, &mut context)
                .map_err(|source| CompileError::Transform {
                    profile: self.name.clone(),
                    source,
                })
        };

        let mut functions = Functions::default();
        for (name, function) in &self.functions {
            functions.insert(name.clone(), function.with_body(convert(function.body())?));
        }
        let first_phase = self.first_phase.as_ref().map(&mut convert).transpose()?;
        let second_phase = self.second_phase.as_ref().map(&mut convert).transpose()?;

        let imported_models = converter.imported_models();
        let (imported_functions, constants) = context.into_parts();
        for (name, function) in imported_functions {
            functions.entry(name).or_insert(function);
        }

        let mut types = TypeResolutionContext::new(functions.values().cloned());
        for (reference, tensor_type) in &constants {
            types.declare(reference.clone(), tensor_type.clone());
        }
        self.declarations.declare_into(&mut types);

        let mut function_types = IndexMap::new();
        for function in functions.values().filter(|f| f.arguments().is_empty()) {
            let reference = Reference::identifier(function.name());
            let tensor_type = types
                .resolve(&reference)
                .map_err(|source| self.type_error(&reference, source))?;
            function_types.insert(Name::from(function.name()), tensor_type);
        }

        for (phase, expression) in [(FIRST_PHASE, &first_phase), (SECOND_PHASE, &second_phase)] {
            let Some(expression) = expression else {
                continue;
            };
            let tensor_type = expression
                .type_of(&types)
                .map_err(|source| self.type_error(expression, source))?;
            if !tensor_type.is_scalar() {
                return Err(CompileError::NonScalarPhase {
                    profile: self.name.clone(),
                    phase,
                    tensor_type,
                });
            }
        }

        tracing::info!(
            "compile_profile: '{}' {} functions, {} models imported, took {:?}",
            self.name,
            functions.len(),
            imported_models,
            started.elapsed()
        );

        Ok(CompiledProfile {
            name: self.name.clone(),
            functions,
            first_phase,
            second_phase,
            constants,
            function_types,
            imported_models,
        })
    }

    fn type_error(&self, expression: &impl std::fmt::Display, source: TypeError) -> CompileError {
        CompileError::Type {
            profile: self.name.clone(),
            expression: expression.to_string(),
            source,
        }
    }
}

/// A rank profile with model features converted and every expression typed.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledProfile {
    name: Name,
    functions: Functions,
    first_phase: Option<ExpressionNode>,
    second_phase: Option<ExpressionNode>,
    constants: FeatureTypes,
    function_types: IndexMap<Name, TensorType>,
    imported_models: usize,
}

impl CompiledProfile {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The profile's functions after conversion, followed by the functions
    /// imported models contributed.
    pub fn functions(&self) -> &Functions {
        &self.functions
    }

    pub fn first_phase(&self) -> Option<&ExpressionNode> {
        self.first_phase.as_ref()
    }

    pub fn second_phase(&self) -> Option<&ExpressionNode> {
        self.second_phase.as_ref()
    }

    /// Types of the constants imported models contributed.
    pub fn constants(&self) -> &FeatureTypes {
        &self.constants
    }

    /// The resolved type of an argument-free function.
    pub fn function_type(&self, name: &str) -> Option<&TensorType> {
        self.function_types.get(name)
    }

    pub fn function_types(&self) -> &IndexMap<Name, TensorType> {
        &self.function_types
    }

    /// The number of distinct models imported while compiling.
    pub fn imported_models(&self) -> usize {
        self.imported_models
    }
}

/// Compile independent rank profiles in parallel, sharing one importer.
///
/// Results are in the order of `profiles`.
pub fn compile_all<I>(profiles: &[RankProfile], importer: &I) -> Vec<Result<CompiledProfile, CompileError>>
where
    I: ModelImporter + Sync,
{
    profiles
        .par_iter()
        .map(|profile| profile.compile(importer))
        .collect()
}
