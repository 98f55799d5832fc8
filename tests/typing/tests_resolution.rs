use rankexpr::base::TensorType;
use rankexpr::typing::{BindingScope, TypeError, TypeResolutionContext};
use rstest::rstest;

use crate::helpers::fixtures::{context_with, expression, function, reference, ty};

#[rstest]
#[case("attribute(popularity)", "tensor()")]
#[case("attribute(tags)", "tensor(tag{})")]
#[case("attribute(\"embedding\")", "tensor<float>(x[4])")]
#[case("query(user_embedding)", "tensor<float>(x[4])")]
#[case("query(undeclared)", "tensor()")]
#[case("constant(projection)", "tensor(x[4],y[2])")]
#[case("tensorFromLabels(attribute(tags))", "tensor(tags{})")]
#[case("tensorFromWeightedSet(attribute(tags), label)", "tensor(label{})")]
#[case("nativeRank", "tensor()")]
#[case("fieldMatch(title).proximity", "tensor()")]
fn test_feature_types(#[case] feature: &str, #[case] expected: &str) {
    let context = context_with(Vec::new());
    assert_eq!(context.resolve(&reference(feature)).unwrap(), ty(expected));
}

#[rstest]
#[case("attribute(embedding) * query(user_embedding)", "tensor<float>(x[4])")]
#[case("reduce(attribute(embedding) * query(user_embedding), sum, x)", "tensor<float>()")]
#[case("matmul(attribute(embedding), constant(projection), x)", "tensor(y[2])")]
#[case("attribute(popularity) + 1", "tensor()")]
#[case("if(attribute(popularity) > 0.5, attribute(tags), attribute(tags) * 2)", "tensor(tag{})")]
fn test_expression_types(#[case] text: &str, #[case] expected: &str) {
    let context = context_with(Vec::new());
    assert_eq!(expression(text).type_of(&context).unwrap(), ty(expected));
}

#[test]
fn test_function_arguments_are_bound_through_callers() {
    let context = context_with(vec![
        function("similarity", &["a", "b"], "reduce(a * b, sum, x)"),
        function("user_similarity", &["doc"], "similarity(doc, query(user_embedding))"),
        function("project", &["t"], "matmul(t, constant(projection), x)"),
    ]);

    assert_eq!(
        context.resolve(&reference("user_similarity(attribute(embedding))")).unwrap(),
        ty("tensor<float>()")
    );
    assert_eq!(
        context.resolve(&reference("project(attribute(embedding))")).unwrap(),
        ty("tensor(y[2])")
    );
}

#[test]
fn test_bound_identifier_equals_its_parsed_text() {
    let context = context_with(Vec::new());
    let bound = context.with_bindings(
        [("doc", "attribute(embedding) * 2")].into_iter().collect::<BindingScope>(),
    );
    assert_eq!(
        bound.resolve(&reference("doc")).unwrap(),
        context.resolve(&reference("attribute(embedding)")).unwrap()
    );
}

#[test]
fn test_simple_feature_arguments_translate_through_bindings() {
    let context = context_with(vec![function("field", &["name"], "attribute(name)")]);
    assert_eq!(
        context.resolve(&reference("field(tags)")).unwrap(),
        ty("tensor(tag{})")
    );
}

#[test]
fn test_mutual_recursion_is_a_cycle() {
    let context = context_with(vec![
        function("f", &["x"], "g(x)"),
        function("g", &["x"], "f(x)"),
    ]);

    // The loop closes on the references as written in the function bodies.
    let err = context.resolve(&reference("f(attribute(popularity))")).unwrap_err();
    assert_eq!(err.to_string(), "Invocation loop: g(x) -> f(x) -> g(x)");
    assert!(context.call_stack().is_empty());

    // The context stays usable after the failure.
    assert_eq!(
        context.resolve(&reference("attribute(tags)")).unwrap(),
        ty("tensor(tag{})")
    );
}

#[test]
fn test_missing_attribute_declaration_is_an_error() {
    let context = TypeResolutionContext::new(Vec::new());
    match context.resolve(&reference("attribute(unknown)")) {
        Err(TypeError::MissingDeclaredType { reference: missing }) => {
            assert_eq!(missing, reference("attribute(unknown)"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_arity_mismatch_is_not_an_invocation() {
    let context = context_with(vec![function("score", &["a", "b"], "attribute(tags)")]);
    assert_eq!(
        context.resolve(&reference("score(1)")).unwrap(),
        TensorType::empty()
    );
    assert_eq!(
        context.resolve(&reference("score(1, 2)")).unwrap(),
        ty("tensor(tag{})")
    );
}
