use rankexpr::transform::{
    ExpressionTransformer, ModelFeatureConverter, ModelImportError, TransformContext, TransformError,
};
use rankexpr::typing::TypeResolutionContext;

use crate::helpers::fixtures::{context_with, expression, ty, DECLARATIONS};
use crate::helpers::importers::CountingImporter;

#[test]
fn test_same_model_is_imported_once_and_both_uses_type() {
    let importer = CountingImporter::standard();
    let seed = context_with(Vec::new());
    let mut context = TransformContext::new(&importer).with_types(&seed);
    let mut converter = ModelFeatureConverter::new();

    let converted = converter
        .transform(
            &expression(
                "reduce(tensorflow(\"models/dense\", serving_default, logits), max) \
                 + tensorflow('models/./dense', serving_default, score)",
            ),
            &mut context,
        )
        .unwrap();

    assert_eq!(importer.imports(), 1);
    assert_eq!(
        converted,
        expression(
            "reduce(dense_layer(query(input)), max) + reduce(dense_layer(query(input)), sum)"
        )
    );

    // The rewritten tree types once the model's functions and constants
    // are visible.
    let (functions, constants) = context.into_parts();
    let mut types = TypeResolutionContext::new(functions.into_values());
    for (reference, tensor_type) in constants {
        types.declare(reference, tensor_type);
    }
    DECLARATIONS.declare_into(&mut types);

    assert_eq!(
        expression("dense_layer(query(input))").type_of(&types).unwrap(),
        ty("tensor(d0[1],d2[2])")
    );
    assert_eq!(converted.type_of(&types).unwrap(), ty("tensor()"));
}

#[test]
fn test_features_inside_function_arguments_are_converted() {
    let importer = CountingImporter::standard();
    let mut context = TransformContext::new(&importer);
    let converted = ModelFeatureConverter::new()
        .transform(
            &expression("my_function(tensorflow(\"models/constant\"), attribute(popularity))"),
            &mut context,
        )
        .unwrap();
    assert_eq!(
        converted,
        expression("my_function(attribute(popularity) * 0.5, attribute(popularity))")
    );
}

#[test]
fn test_failures_name_the_feature_and_keep_the_cause() {
    let importer = CountingImporter::standard();
    let mut context = TransformContext::new(&importer);
    let mut converter = ModelFeatureConverter::new();

    let err = converter
        .transform(&expression("1 + tensorflow(\"models/dense\", other)"), &mut context)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Could not use model from tensorflow(\"models/dense\",other)"
    );
    assert!(matches!(
        err.root_cause(),
        TransformError::Import(ModelImportError::UnknownSignature { .. })
    ));

    let source = std::error::Error::source(&err).map(ToString::to_string);
    assert_eq!(
        source.as_deref(),
        Some("model 'dense' does not have a signature 'other', available signatures: serving_default")
    );
}

#[test]
fn test_missing_model_is_imported_again_after_failure() {
    let importer = CountingImporter::standard();
    let mut context = TransformContext::new(&importer);
    let mut converter = ModelFeatureConverter::new();
    for _ in 0..2 {
        let err = converter
            .transform(&expression("tensorflow(\"models/missing\")"), &mut context)
            .unwrap_err();
        assert!(matches!(
            err.root_cause(),
            TransformError::Import(ModelImportError::NotFound(_))
        ));
    }
    assert_eq!(importer.imports(), 2);
    assert_eq!(converter.imported_models(), 0);
}
