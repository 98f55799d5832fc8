use rankexpr::profile::{CompileError, RankProfile, SECOND_PHASE, compile_all};
use rankexpr::typing::TypeError;

use crate::helpers::fixtures::{ty, DECLARATIONS};
use crate::helpers::importers::CountingImporter;

fn profile(name: &str) -> RankProfile {
    RankProfile::new(name).with_declarations(DECLARATIONS.clone())
}

#[test]
fn test_profile_with_models_and_functions() {
    let importer = CountingImporter::standard();
    let compiled = profile("hybrid")
        .parse_function("logits", &[], "tensorflow(\"models/dense\", serving_default, logits)")
        .unwrap()
        .parse_function("similarity", &["d"], "reduce(d * query(user_embedding), sum, x)")
        .unwrap()
        .parse_first_phase("similarity(attribute(embedding)) + attribute(popularity)")
        .unwrap()
        .parse_second_phase("reduce(logits, max) + tensorflow(\"models/dense\", serving_default, score)")
        .unwrap()
        .compile(&importer)
        .unwrap();

    assert_eq!(importer.imports(), 1);
    assert_eq!(compiled.function_type("logits"), Some(&ty("tensor(d0[1],d2[2])")));
    let names: Vec<&str> = compiled.functions().keys().map(|n| n.as_str()).collect();
    assert_eq!(names, vec!["logits", "similarity", "dense_layer"]);
}

#[test]
fn test_second_phase_must_be_scalar() {
    let err = profile("p")
        .parse_second_phase("tensorflow(\"models/dense\", serving_default, logits)")
        .unwrap()
        .compile(&CountingImporter::standard())
        .unwrap_err();
    match err {
        CompileError::NonScalarPhase { phase, tensor_type, .. } => {
            assert_eq!(phase, SECOND_PHASE);
            assert_eq!(tensor_type, ty("tensor(d0[1],d2[2])"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_incompatible_tensors_are_type_errors() {
    let err = profile("p")
        .parse_first_phase("reduce(attribute(tags) * attribute(embedding), sum, nope)")
        .unwrap()
        .compile(&CountingImporter::standard())
        .unwrap_err();
    assert!(matches!(
        err,
        CompileError::Type {
            source: TypeError::Tensor { .. },
            ..
        }
    ));
}

#[test]
fn test_compile_all_uses_one_cache_per_profile() {
    let importer = CountingImporter::standard();
    let profiles: Vec<RankProfile> = ["a", "b", "c"]
        .into_iter()
        .map(|name| {
            profile(name)
                .parse_first_phase(
                    "tensorflow(\"models/constant\") + tensorflow(\"models/dense\", serving_default, score)",
                )
                .unwrap()
        })
        .collect();

    let results = compile_all(&profiles, &importer);

    let names: Vec<&str> = results.iter().map(|r| r.as_ref().unwrap().name()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert_eq!(importer.imports(), 6);
}
