//! Binding scopes: formal parameter name → actual argument text.

use rustc_hash::FxHashMap;

use crate::base::Name;
use crate::syntax::ExpressionNode;

/// The argument bindings of one function invocation.
///
/// Values are the textual form of the actual arguments. A scope is
/// computed fresh for each invocation and never inherits the caller's
/// bindings; callers translate actual arguments through their own scope
/// before binding (see [`BindingScope::bind`]).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BindingScope {
    bindings: FxHashMap<Name, Name>,
}

impl BindingScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind each formal parameter to the text of the corresponding actual
    /// argument, translated through `caller` first.
    ///
    /// Formals without a matching actual are left unbound.
    pub fn bind(formals: &[Name], actuals: &[ExpressionNode], caller: &BindingScope) -> Self {
        let bindings = formals
            .iter()
            .zip(actuals)
            .map(|(formal, actual)| {
                let text = actual.to_string();
                (formal.clone(), Name::from(caller.translate(&text)))
            })
            .collect();
        Self { bindings }
    }

    pub fn get(&self, identifier: &str) -> Option<&str> {
        self.bindings.get(identifier).map(Name::as_str)
    }

    /// The bound value of `identifier`, or `identifier` itself if unbound.
    pub fn translate<'a>(&'a self, identifier: &'a str) -> &'a str {
        self.get(identifier).unwrap_or(identifier)
    }

    pub fn insert(&mut self, formal: impl Into<Name>, actual: impl Into<Name>) {
        self.bindings.insert(formal.into(), actual.into());
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<Name>, V: Into<Name>> FromIterator<(K, V)> for BindingScope {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            bindings: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
