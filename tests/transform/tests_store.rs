use rankexpr::profile::RankProfile;
use rankexpr::transform::{ModelImporter, ModelPath, StoreModelImporter};

use crate::helpers::fixtures::{expression, DECLARATIONS, DENSE_MODEL};

#[test]
fn test_stored_model_compiles_into_profile() {
    let dir = tempfile::tempdir().unwrap();
    let importer = StoreModelImporter::new(dir.path());
    importer
        .store(&ModelPath::new("models/dense"), &DENSE_MODEL)
        .unwrap();

    let imported = importer.import(&ModelPath::new("\"models/dense\"")).unwrap();
    assert_eq!(
        imported.expression_for(Some("serving_default"), Some("logits")).unwrap(),
        expression("dense_layer(query(input))")
    );

    let compiled = RankProfile::new("stored")
        .with_declarations(DECLARATIONS.clone())
        .parse_first_phase("tensorflow(\"models/dense\", serving_default, score)")
        .unwrap()
        .compile(&importer)
        .unwrap();
    assert_eq!(compiled.imported_models(), 1);
    assert!(compiled.functions().contains_key("dense_layer"));
}
