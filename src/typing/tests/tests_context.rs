#![allow(clippy::unwrap_used)]

use std::borrow::Cow;

use crate::base::TensorType;
use crate::parser::parse_expression;
use crate::syntax::{ExpressionFunction, Reference};
use crate::typing::{BindingScope, TypeError, TypeResolutionContext, features};
use rstest::rstest;

fn reference(text: &str) -> Reference {
    text.parse().unwrap()
}

fn ty(text: &str) -> TensorType {
    text.parse().unwrap()
}

fn function(name: &str, arguments: &[&str], body: &str) -> ExpressionFunction {
    ExpressionFunction::parse(name, arguments.iter().copied(), body).unwrap()
}

fn context_with(functions: Vec<ExpressionFunction>) -> TypeResolutionContext {
    let mut context = TypeResolutionContext::new(functions);
    context.declare(reference("attribute(tags)"), ty("tensor(tag{})"));
    context.declare(reference("query(embedding)"), ty("tensor(x[4])"));
    context.declare(reference("constant(weights)"), ty("tensor(x[4],y[2])"));
    context
}

// ============================================================================
// Declarations and defaults
// ============================================================================

#[rstest]
#[case("attribute(a)", "tensor(x{})")]
#[case("constant(c)", "tensor<float>(d0[3],d1[2])")]
#[case("attribute(s)", "tensor()")]
fn test_declaration_round_trip(#[case] feature: &str, #[case] declared: &str) {
    let mut context = TypeResolutionContext::new(Vec::new());
    context.declare(reference(feature), ty(declared));
    assert_eq!(context.resolve(&reference(feature)).unwrap(), ty(declared));
}

#[test]
fn test_redeclaring_overwrites() {
    let mut context = TypeResolutionContext::new(Vec::new());
    context.declare(reference("attribute(a)"), ty("tensor(x{})"));
    context.declare(reference("attribute(a)"), ty("tensor(y[2])"));
    assert_eq!(context.resolve(&reference("attribute(a)")).unwrap(), ty("tensor(y[2])"));
    assert_eq!(context.feature_types().len(), 1);
}

#[test]
fn test_quoted_and_bare_arguments_are_one_key() {
    let mut context = TypeResolutionContext::new(Vec::new());
    context.declare(reference("constant(\"w\")"), ty("tensor(x[2])"));
    assert_eq!(context.resolve(&reference("constant(w)")).unwrap(), ty("tensor(x[2])"));
}

#[test]
fn test_undeclared_query_feature_is_scalar() {
    let context = TypeResolutionContext::new(Vec::new());
    assert_eq!(context.resolve(&reference("query(q)")).unwrap(), TensorType::empty());
}

#[rstest]
#[case("attribute(missing)")]
#[case("constant(missing)")]
fn test_undeclared_non_query_feature_is_error(#[case] feature: &str) {
    let context = TypeResolutionContext::new(Vec::new());
    assert!(matches!(
        context.resolve(&reference(feature)),
        Err(TypeError::MissingDeclaredType { reference: r }) if r == reference(feature)
    ));
}

#[test]
fn test_default_type_of() {
    assert_eq!(features::default_type_of(&reference("query(q)")), Some(TensorType::empty()));
    assert_eq!(features::default_type_of(&reference("attribute(a)")), None);
    assert_eq!(features::default_type_of(&reference("constant(c)")), None);
    assert_eq!(features::default_type_of(&reference("foo(q)")), None);
}

// ============================================================================
// Fallback
// ============================================================================

#[rstest]
#[case("fieldMatch(title)")]
#[case("bm25(body)")]
#[case("nativeRank")]
#[case("fieldMatch(title).completeness")]
fn test_unknown_reference_is_scalar(#[case] feature: &str) {
    let context = context_with(Vec::new());
    assert_eq!(context.resolve(&reference(feature)).unwrap(), TensorType::empty());
}

// ============================================================================
// Functions and bindings
// ============================================================================

#[test]
fn test_function_invocation_binds_arguments() {
    let context = context_with(vec![function("scaled", &["t"], "t * 2")]);
    assert_eq!(
        context.resolve(&reference("scaled(constant(weights))")).unwrap(),
        ty("tensor(x[4],y[2])")
    );
}

#[test]
fn test_nested_invocation_translates_through_caller_scope() {
    let context = context_with(vec![
        function("inner", &["a"], "a"),
        function("outer", &["b"], "inner(b) + query(embedding)"),
    ]);
    assert_eq!(
        context.resolve(&reference("outer(constant(weights))")).unwrap(),
        ty("tensor(x[4],y[2])")
    );
}

#[test]
fn test_simple_feature_argument_is_translated() {
    let context = context_with(vec![function("lookup", &["name"], "attribute(name)")]);
    assert_eq!(context.resolve(&reference("lookup(tags)")).unwrap(), ty("tensor(tag{})"));
}

#[rstest]
#[case("lookup(\"tags\")")]
#[case("lookup('tags')")]
#[case("forward(\"tags\")")]
fn test_quoted_argument_is_unquoted_through_bindings(#[case] call: &str) {
    let context = context_with(vec![
        function("lookup", &["name"], "attribute(name)"),
        function("forward", &["n"], "lookup(n)"),
    ]);
    assert_eq!(context.resolve(&reference("attribute(\"tags\")")).unwrap(), ty("tensor(tag{})"));
    assert_eq!(context.resolve(&reference(call)).unwrap(), ty("tensor(tag{})"));
}

#[test]
fn test_bound_identifier_equivalence() {
    let context = context_with(Vec::new());
    let text = "reduce(constant(weights), sum, y) * query(embedding)";
    let scope: BindingScope = [("bound", text)].into_iter().collect();
    let scoped = context.with_bindings(scope);

    let via_binding = scoped.resolve(&Reference::identifier("bound")).unwrap();
    let direct = parse_expression(text).unwrap().type_of(&context).unwrap();
    assert_eq!(via_binding, direct);
    assert_eq!(via_binding, ty("tensor(x[4])"));
}

#[test]
fn test_bound_identifier_parse_failure_is_surfaced() {
    let context = context_with(Vec::new());
    let scoped = context.with_bindings([("x", "a +")].into_iter().collect());
    assert!(matches!(
        scoped.resolve(&Reference::identifier("x")),
        Err(TypeError::UnresolvedParse { ref identifier, .. }) if identifier == "x"
    ));
}

#[test]
fn test_arity_mismatch_is_not_an_invocation() {
    let context = context_with(vec![function("f", &["a", "b"], "constant(weights)")]);
    assert_eq!(
        context.resolve(&reference("f(query(embedding),2)")).unwrap(),
        ty("tensor(x[4],y[2])")
    );
    // One argument: not the function, falls through to the scalar default.
    assert_eq!(context.resolve(&reference("f(1)")).unwrap(), TensorType::empty());
}

#[test]
fn test_output_selector_is_not_an_invocation() {
    let context = context_with(vec![function("f", &[], "constant(weights)")]);
    assert_eq!(context.resolve(&reference("f")).unwrap(), ty("tensor(x[4],y[2])"));
    assert_eq!(context.resolve(&reference("f.out")).unwrap(), TensorType::empty());
}

// ============================================================================
// Cycles
// ============================================================================

#[test]
fn test_mutual_recursion_is_a_cycle() {
    let context = context_with(vec![
        function("f", &["x"], "g(x)"),
        function("g", &["x"], "f(x)"),
    ]);
    match context.resolve(&reference("f(x)")) {
        Err(TypeError::Cycle { chain }) => {
            let names: Vec<String> = chain.iter().map(Reference::to_string).collect();
            assert_eq!(names, vec!["f(x)", "g(x)", "f(x)"]);
        }
        other => panic!("expected a cycle, got {:?}", other),
    }
}

#[test]
fn test_cycle_chain_through_actual_argument() {
    let context = context_with(vec![
        function("f", &["x"], "g(x)"),
        function("g", &["x"], "f(x)"),
    ]);
    // Frames are pushed as written: the outer call, then the bodies.
    match context.resolve(&reference("f(attribute(tags))")) {
        Err(TypeError::Cycle { chain }) => {
            let names: Vec<String> = chain.iter().map(Reference::to_string).collect();
            assert_eq!(names, vec!["g(x)", "f(x)", "g(x)"]);
        }
        other => panic!("expected a cycle, got {:?}", other),
    }
    assert!(context.call_stack().is_empty());
}

#[test]
fn test_cycle_message() {
    let context = context_with(vec![function("f", &[], "f + 1")]);
    let error = context.resolve(&reference("f")).unwrap_err();
    assert_eq!(error.to_string(), "Invocation loop: f -> f");
}

#[test]
fn test_call_stack_is_unwound_after_errors() {
    let context = context_with(vec![
        function("f", &["x"], "g(x)"),
        function("g", &["x"], "f(x) + attribute(missing)"),
        function("h", &[], "attribute(missing)"),
    ]);
    assert!(context.resolve(&reference("f(x)")).is_err());
    assert!(context.call_stack().is_empty());
    assert!(context.resolve(&reference("h")).is_err());
    assert!(context.call_stack().is_empty());
    // Still usable afterwards.
    assert_eq!(context.resolve(&reference("query(embedding)")).unwrap(), ty("tensor(x[4])"));
}

#[test]
fn test_repeated_non_recursive_use_is_not_a_cycle() {
    let context = context_with(vec![
        function("g", &[], "constant(weights)"),
        function("f", &[], "g + g"),
    ]);
    assert_eq!(context.resolve(&reference("f")).unwrap(), ty("tensor(x[4],y[2])"));
}

// ============================================================================
// Tensor constructors
// ============================================================================

#[rstest]
#[case("tensorFromLabels(attribute(tags))")]
#[case("tensorFromLabels(attribute(tags), tags)")]
#[case("tensorFromWeightedSet(attribute(tags))")]
fn test_tensor_constructor_dimension(#[case] feature: &str) {
    let context = context_with(Vec::new());
    assert_eq!(context.resolve(&reference(feature)).unwrap(), ty("tensor(tags{})"));
}

#[test]
fn test_tensor_constructor_explicit_dimension() {
    let context = context_with(Vec::new());
    assert_eq!(
        context.resolve(&reference("tensorFromWeightedSet(query(tokens), token)")).unwrap(),
        ty("tensor(token{})")
    );
}

#[rstest]
#[case("tensorFromLabels")]
#[case("tensorFromLabels(attribute(a), b, c)")]
fn test_tensor_constructor_argument_count(#[case] feature: &str) {
    let context = context_with(Vec::new());
    assert!(matches!(
        context.resolve(&reference(feature)),
        Err(TypeError::InvalidArgumentCount { .. })
    ));
}

#[rstest]
#[case("tensorFromLabels(foo(a))")]
#[case("tensorFromLabels(attribute(a), 3)")]
#[case("tensorFromLabels(attribute(a), dim(x))")]
fn test_tensor_constructor_argument_kind(#[case] feature: &str) {
    let context = context_with(Vec::new());
    assert!(matches!(
        context.resolve(&reference(feature)),
        Err(TypeError::InvalidArgumentKind { .. })
    ));
}

// ============================================================================
// Scopes
// ============================================================================

#[test]
fn test_empty_bindings_share_the_context() {
    let context = context_with(Vec::new());
    match context.with_bindings(BindingScope::new()) {
        Cow::Borrowed(same) => assert!(std::ptr::eq(same, &context)),
        Cow::Owned(_) => panic!("expected the same context"),
    }
}

#[test]
fn test_non_empty_bindings_derive_a_context_sharing_tables() {
    let context = context_with(Vec::new());
    let derived = context.with_bindings([("a", "b")].into_iter().collect());
    assert!(matches!(derived, Cow::Owned(_)));
    assert_eq!(derived.bindings().get("a"), Some("b"));
    assert!(std::ptr::eq(derived.feature_types(), context.feature_types()));
    assert!(std::ptr::eq(derived.functions(), context.functions()));
    // A derived context with bindings does not collapse back on empty bindings.
    assert!(matches!(derived.with_bindings(BindingScope::new()), Cow::Owned(_)));
}
