//! Common declarations, functions and models for tests.

use once_cell::sync::Lazy;
use rankexpr::base::TensorType;
use rankexpr::parser::parse_expression;
use rankexpr::profile::FeatureDeclarations;
use rankexpr::syntax::{ExpressionFunction, ExpressionNode, Reference};
use rankexpr::transform::{ConvertedModel, Signature};
use rankexpr::typing::TypeResolutionContext;

pub fn ty(text: &str) -> TensorType {
    text.parse()
        .unwrap_or_else(|e| panic!("bad tensor type '{}': {}", text, e))
}

pub fn reference(text: &str) -> Reference {
    text.parse()
        .unwrap_or_else(|e| panic!("bad reference '{}': {}", text, e))
}

pub fn expression(text: &str) -> ExpressionNode {
    parse_expression(text).unwrap_or_else(|e| panic!("bad expression '{}': {}", text, e))
}

pub fn function(name: &str, arguments: &[&str], body: &str) -> ExpressionFunction {
    ExpressionFunction::parse(name, arguments.iter().copied(), body)
        .unwrap_or_else(|e| panic!("bad body of '{}': {}", name, e))
}

/// Feature types of a small document schema and query profile.
pub static DECLARATIONS: Lazy<FeatureDeclarations> = Lazy::new(|| {
    FeatureDeclarations::new()
        .with_attribute("popularity", ty("tensor()"))
        .with_attribute("tags", ty("tensor(tag{})"))
        .with_attribute("embedding", ty("tensor<float>(x[4])"))
        .with_query("user_embedding", ty("tensor<float>(x[4])"))
        .with_query("input", ty("tensor(d0[1],d1[3])"))
        .with_constant("projection", ty("tensor(x[4],y[2])"))
});

/// A context declaring [`DECLARATIONS`] with the given functions.
pub fn context_with(functions: Vec<ExpressionFunction>) -> TypeResolutionContext {
    let mut context = TypeResolutionContext::new(functions);
    DECLARATIONS.declare_into(&mut context);
    context
}

/// A one-layer network reading `query(input)`.
pub static DENSE_MODEL: Lazy<ConvertedModel> = Lazy::new(|| {
    ConvertedModel::new("dense")
        .with_signature(
            "serving_default",
            Signature::new()
                .with_output("logits", expression("dense_layer(query(input))"))
                .with_output("score", expression("reduce(dense_layer(query(input)), sum)")),
        )
        .with_function(function(
            "dense_layer",
            &["x"],
            "reduce(x * constant(dense_weights), sum, d1) + constant(dense_bias)",
        ))
        .with_constant("dense_weights", ty("tensor(d1[3],d2[2])"))
        .with_constant("dense_bias", ty("tensor(d2[2])"))
        .with_input(reference("query(input)"), ty("tensor(d0[1],d1[3])"))
});

/// A model with a single scalar output and no inputs.
pub static CONSTANT_MODEL: Lazy<ConvertedModel> = Lazy::new(|| {
    ConvertedModel::new("constant")
        .with_signature("s", Signature::new().with_output("o", expression("attribute(popularity) * 0.5")))
});
