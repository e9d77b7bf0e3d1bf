//! End-to-end loading tests: fixture CSV -> Table -> JSON export.

use std::fs;
use std::path::Path;

use cardiotree_io::{
    ColumnData, ColumnRole, ColumnRoles, ColumnType, ExperimentName, LoadError, ResultWriter,
    TableReader,
};
use tempfile::TempDir;

/// Path to the test fixture directory.
fn fixture_path(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn heart_roles() -> ColumnRoles {
    ColumnRoles::new("num")
        .with_categorical(
            ["sex", "cp", "fbs", "restecg", "exang", "dataset", "slope", "thal"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
        .with_ignored(vec!["id".to_string()])
}

#[test]
fn heart_fixture_loads_with_schema() {
    let table = TableReader::new(&fixture_path("heart_sample.csv"))
        .with_roles(heart_roles())
        .read()
        .expect("fixture should parse");

    assert_eq!(table.n_rows(), 60);
    assert_eq!(table.n_cols(), 16);

    let schema = table.schema();
    let names: Vec<&str> = schema.names().collect();
    assert_eq!(names[0], "id");
    assert_eq!(names[15], "num");

    let num = &schema.fields[15];
    assert_eq!(num.role, ColumnRole::Outcome);
    assert_eq!(num.column_type, ColumnType::Numeric);

    let sex = schema.fields.iter().find(|f| f.name == "sex").unwrap();
    assert_eq!(sex.role, ColumnRole::Categorical);
    assert_eq!(sex.column_type, ColumnType::Text);

    // `ca` holds numbers only, so it stays a numeric feature.
    let ca = schema.fields.iter().find(|f| f.name == "ca").unwrap();
    assert_eq!(ca.role, ColumnRole::Numeric);
    assert_eq!(ca.column_type, ColumnType::Numeric);
}

#[test]
fn heart_fixture_missingness() {
    let table = TableReader::new(&fixture_path("heart_sample.csv"))
        .with_roles(heart_roles())
        .read()
        .unwrap();

    // Sentinel zeros are still plain values at load time.
    let ColumnData::Numeric(chol) = table.column("chol").unwrap().data() else {
        panic!("chol should be numeric");
    };
    assert_eq!(chol.iter().filter(|v| **v == Some(0.0)).count(), 5);
    assert_eq!(table.column("chol").unwrap().missing_count(), 0);

    assert_eq!(table.column("trestbps").unwrap().missing_count(), 1);
    assert!(table.column("ca").unwrap().missing_fraction() > 0.30);
    assert!(table.column("thal").unwrap().missing_fraction() > 0.30);
}

#[test]
fn wrong_outcome_name_is_reported() {
    let err = TableReader::new(&fixture_path("heart_sample.csv"))
        .with_roles(ColumnRoles::new("target"))
        .read()
        .unwrap_err();
    assert!(matches!(err, LoadError::MissingColumn { role: "outcome", .. }));
}

#[test]
fn uncategorized_text_column_is_reported() {
    // `sex` is text; leaving it out of the categorical list makes it numeric.
    let roles = ColumnRoles::new("num").with_ignored(vec!["id".to_string()]);
    let err = TableReader::new(&fixture_path("heart_sample.csv"))
        .with_roles(roles)
        .read()
        .unwrap_err();
    assert!(matches!(err, LoadError::SchemaMismatch { .. }));
}

#[test]
fn schema_round_trips_through_writer() {
    let table = TableReader::new(&fixture_path("heart_sample.csv"))
        .with_roles(heart_roles())
        .read()
        .unwrap();

    let dir = TempDir::new().unwrap();
    let writer = ResultWriter::new(dir.path(), ExperimentName::new("schema".into()).unwrap())
        .unwrap();
    let path = writer.write_report(&table.schema()).unwrap();

    let content: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(content["experiment"], "schema");
    let fields = content["report"]["fields"].as_array().unwrap();
    assert_eq!(fields.len(), 16);
    assert_eq!(fields[15]["role"], "outcome");
    assert_eq!(fields[2]["column_type"], "text");
}
