//! Type resolution context: resolving feature references to tensor types.
//!
//! # Architecture
//!
//! A [`TypeResolutionContext`] is created once per rank profile compilation,
//! seeded with declared feature types, and then answers `resolve` calls.
//! Resolving a function invocation derives a new context for the function
//! body which differs only in its [`BindingScope`]:
//!
//! - the feature type table and the function table are shared (`Rc`)
//!   between the root context and every derived context;
//! - the call stack is shared by identity across one resolution tree and is
//!   used to detect invocation loops that span derived contexts.
//!
//! Resolution is single-threaded; contexts are neither `Send` nor `Sync`.

use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use tracing::trace;

use super::bindings::BindingScope;
use super::error::TypeError;
use super::features;
use crate::base::text_utils::strip_quotes;
use crate::base::{Name, TensorType};
use crate::parser::parse_expression;
use crate::syntax::{ExpressionFunction, ExpressionNode, Reference};

/// Declared feature types, keyed by reference.
pub type FeatureTypes = FxHashMap<Reference, TensorType>;

/// Functions by name, in declaration order.
pub type Functions = IndexMap<Name, ExpressionFunction>;

/// Something which can tell the type of a feature reference.
///
/// Expression type inference ([`ExpressionNode::type_of`]) is written
/// against this trait.
pub trait TypeContext {
    fn resolve(&self, reference: &Reference) -> Result<TensorType, TypeError>;
}

// ============================================================================
// CALL STACK
// ============================================================================

/// A reference pushed on the shared call stack, popped again on drop so
/// that every exit path (including errors) unwinds the stack.
struct CallFrame<'a> {
    stack: &'a RefCell<Vec<Reference>>,
}

impl<'a> CallFrame<'a> {
    fn enter(stack: &'a RefCell<Vec<Reference>>, reference: &Reference) -> Result<Self, TypeError> {
        let mut frames = stack.borrow_mut();
        if let Some(first) = frames.iter().position(|r| r == reference) {
            let mut chain = frames[first..].to_vec();
            chain.push(reference.clone());
            return Err(TypeError::Cycle { chain });
        }
        frames.push(reference.clone());
        Ok(Self { stack })
    }
}

impl Drop for CallFrame<'_> {
    fn drop(&mut self) {
        self.stack.borrow_mut().pop();
    }
}

// ============================================================================
// RESOLUTION CONTEXT
// ============================================================================

/// A context which only contains type information.
///
/// Unknown references which are not query, attribute or constant features
/// resolve to the scalar type: the set of match features is not known
/// statically, but those that exist are all scalars.
#[derive(Clone, Debug)]
pub struct TypeResolutionContext {
    feature_types: Rc<FeatureTypes>,
    functions: Rc<Functions>,
    bindings: BindingScope,
    call_stack: Rc<RefCell<Vec<Reference>>>,
}

impl TypeResolutionContext {
    /// Create a root context with the given functions and no declarations.
    ///
    /// A later function with the same name as an earlier one replaces it.
    pub fn new(functions: impl IntoIterator<Item = ExpressionFunction>) -> Self {
        let functions = functions
            .into_iter()
            .map(|f| (Name::from(f.name()), f))
            .collect();
        Self {
            feature_types: Rc::new(FeatureTypes::default()),
            functions: Rc::new(functions),
            bindings: BindingScope::new(),
            call_stack: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Register the type of a feature. Re-declaring overwrites.
    ///
    /// Simple feature keys are normalized the way resolution looks them up,
    /// so `attribute("a")` and `attribute(a)` declare the same feature.
    pub fn declare(&mut self, reference: Reference, tensor_type: TensorType) {
        let key = match reference.simple_argument() {
            Some(argument) if features::is_simple_feature(&reference) => {
                Reference::simple(reference.name(), argument)
            }
            _ => reference,
        };
        Rc::make_mut(&mut self.feature_types).insert(key, tensor_type);
    }

    /// All explicitly declared feature types.
    pub fn feature_types(&self) -> &FeatureTypes {
        &self.feature_types
    }

    pub fn functions(&self) -> &Functions {
        &self.functions
    }

    pub fn bindings(&self) -> &BindingScope {
        &self.bindings
    }

    /// The references currently being resolved, outermost first.
    pub fn call_stack(&self) -> Vec<Reference> {
        self.call_stack.borrow().clone()
    }

    /// A context identical to this one except for its bindings.
    ///
    /// Returns this very context (borrowed) when both the current and the
    /// new bindings are empty.
    pub fn with_bindings(&self, bindings: BindingScope) -> Cow<'_, Self> {
        if bindings.is_empty() && self.bindings.is_empty() {
            return Cow::Borrowed(self);
        }
        Cow::Owned(Self {
            feature_types: Rc::clone(&self.feature_types),
            functions: Rc::clone(&self.functions),
            bindings,
            call_stack: Rc::clone(&self.call_stack),
        })
    }

    /// Resolve the type of a reference.
    ///
    /// In priority order, a reference is: a bound identifier, a simple
    /// feature, a function invocation, a tensor-constructing feature, or
    /// otherwise assumed to be a scalar match feature.
    pub fn resolve(&self, reference: &Reference) -> Result<TensorType, TypeError> {
        let _frame = CallFrame::enter(&self.call_stack, reference)?;
        trace!(
            "[TYPE_RESOLVE] reference='{}' depth={}",
            reference,
            self.call_stack.borrow().len()
        );

        if let Some(binding) = self.bound_identifier(reference) {
            trace!("[TYPE_RESOLVE] -> bound to '{}'", binding);
            let expression =
                parse_expression(binding).map_err(|source| TypeError::UnresolvedParse {
                    identifier: reference.name().into(),
                    text: binding.to_string(),
                    source,
                })?;
            return expression.type_of(self);
        }

        if features::is_simple_feature(reference) {
            let key = self.simple_feature_key(reference);
            if let Some(declared) = self.feature_types.get(&key) {
                return Ok(declared.clone());
            }
            trace!("[TYPE_RESOLVE] -> '{}' not declared, using default", key);
            return features::default_type_of(&key)
                .ok_or(TypeError::MissingDeclaredType { reference: key });
        }

        if let Some(function) = self.function_invocation(reference) {
            trace!("[TYPE_RESOLVE] -> invocation of function '{}'", function.name());
            let scope = BindingScope::bind(function.arguments(), reference.arguments(), &self.bindings);
            return function.body().type_of(self.with_bindings(scope).as_ref());
        }

        if let Some(tensor_type) = self.tensor_feature_type(reference)? {
            return Ok(tensor_type);
        }

        Ok(TensorType::empty())
    }

    /// The binding of this reference, if it is an identifier bound in this
    /// context.
    fn bound_identifier(&self, reference: &Reference) -> Option<&str> {
        if !reference.is_identifier() {
            return None;
        }
        self.bindings.get(reference.name())
    }

    /// The declaration key of a simple feature, with its argument translated
    /// through the current bindings.
    ///
    /// Bindings hold the text of string arguments with their quotes, so the
    /// translated argument is unquoted again.
    fn simple_feature_key(&self, reference: &Reference) -> Reference {
        match reference.simple_argument() {
            Some(argument) => {
                let translated = strip_quotes(self.bindings.translate(&argument));
                Reference::simple(reference.name(), translated)
            }
            None => reference.clone(),
        }
    }

    fn function_invocation(&self, reference: &Reference) -> Option<&ExpressionFunction> {
        if reference.output().is_some() {
            return None;
        }
        self.functions
            .get(reference.name())
            .filter(|f| f.arguments().len() == reference.arguments().len())
    }

    /// The type of `tensorFromLabels` and `tensorFromWeightedSet`: a single
    /// mapped dimension named by the second argument, or by the argument of
    /// the label source when there is no second argument.
    fn tensor_feature_type(&self, reference: &Reference) -> Result<Option<TensorType>, TypeError> {
        if !features::is_tensor_constructor(reference.name()) {
            return Ok(None);
        }
        let feature = Name::from(reference.name());
        let arguments = reference.arguments();
        if arguments.is_empty() || arguments.len() > 2 {
            return Err(TypeError::InvalidArgumentCount {
                feature,
                expected: "one or two",
                found: arguments.len(),
            });
        }

        let label_source = match &arguments[0] {
            ExpressionNode::Reference(source) if features::is_simple_feature(source) => source,
            other => {
                return Err(TypeError::InvalidArgumentKind {
                    feature,
                    position: "first",
                    expected: "a simple feature",
                    found: other.to_string(),
                });
            }
        };

        let dimension = match arguments.get(1) {
            Some(ExpressionNode::Reference(name)) if name.is_identifier() => Name::from(name.name()),
            Some(ExpressionNode::Name(name)) => name.clone(),
            Some(other) => {
                return Err(TypeError::InvalidArgumentKind {
                    feature,
                    position: "second",
                    expected: "a dimension name",
                    found: other.to_string(),
                });
            }
            None => match label_source.simple_argument() {
                Some(argument) => Name::from(argument),
                None => {
                    return Err(TypeError::InvalidArgumentKind {
                        feature,
                        position: "first",
                        expected: "a simple feature with an argument",
                        found: label_source.to_string(),
                    });
                }
            },
        };

        TensorType::builder()
            .mapped(dimension)
            .build()
            .map(Some)
            .map_err(|source| TypeError::Tensor {
                expression: reference.to_string(),
                source,
            })
    }
}

impl TypeContext for TypeResolutionContext {
    fn resolve(&self, reference: &Reference) -> Result<TensorType, TypeError> {
        TypeResolutionContext::resolve(self, reference)
    }
}

impl TypeContext for FeatureTypes {
    /// Plain lookup; undeclared references are scalars.
    fn resolve(&self, reference: &Reference) -> Result<TensorType, TypeError> {
        Ok(self.get(reference).cloned().unwrap_or_default())
    }
}
