//! Integration tests for configuration and schema loading from disk.

use std::fs;
use std::path::PathBuf;

use relfilter::config::{CaseFolding, Settings, SettingsError};
use relfilter::schema::{RelationKind, SchemaSource};
use relfilter::{Dialect, QueryCompiler, Schema, SchemaError};
use serde_json::json;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("relfilter-{}-{}", name, std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_settings_from_file_with_env_schema_path() {
    let dir = scratch_dir("settings");
    let schema_file = dir.join("schema.json");
    fs::write(
        &schema_file,
        r#"{
            "entities": {
                "Page": { "datasource": "db", "properties": ["id", "number"] }
            }
        }"#,
    )
    .unwrap();

    let config_file = dir.join("relfilter.toml");
    fs::write(
        &config_file,
        r#"
schema = "${RELFILTER_TEST_HOME}/schema.json"

[datasources.db]
dialect = "duckdb"

[filter]
reject_unknown_properties = true
"#,
    )
    .unwrap();

    std::env::set_var("RELFILTER_TEST_HOME", &dir);
    let settings = Settings::from_file(&config_file).unwrap();
    let schema_path = settings.schema_path().unwrap().unwrap();
    std::env::remove_var("RELFILTER_TEST_HOME");

    assert_eq!(schema_path, schema_file);
    let db = settings.datasource("db").unwrap();
    assert_eq!(db.dialect, Dialect::DuckDb);
    assert_eq!(db.case_folding(), CaseFolding::Preserve);
    assert!(settings.filter_for("Page").reject_unknown_properties);

    let schema = Schema::from_file(&schema_path).unwrap();
    let compiled = QueryCompiler::new(&schema, &settings)
        .compile("Page", &json!({ "number": { "gte": 10 } }))
        .unwrap();
    assert_eq!(
        compiled.sql(),
        "SELECT\n  \"page\".\"id\"\nFROM \"Page\" AS \"page\"\nWHERE \"page\".\"number\" >= $1\nGROUP BY \"page\".\"id\""
    );

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_missing_config_file() {
    let result = Settings::from_file("/nonexistent/relfilter.toml");
    assert!(matches!(result, Err(SettingsError::FileNotFound(_))));
}

#[test]
fn test_schema_from_toml_file() {
    let dir = scratch_dir("schema");
    let schema_file = dir.join("schema.toml");
    fs::write(
        &schema_file,
        r#"
[entities.Book]
table = "books"
schema = "catalog"
properties = ["id", "title", "publisherId"]
columns = { publisherId = "publisher_id" }

[entities.Book.relations.publisher]
kind = "has_one"
target = "Publisher"
key_from = "publisherId"
key_to = "id"

[entities.Publisher]
table = "publishers"
properties = ["id", "name"]
"#,
    )
    .unwrap();

    let schema = Schema::from_file(&schema_file).unwrap();
    let book = schema.entity("Book").unwrap();
    assert_eq!(book.table_name(), "books");
    assert_eq!(book.column_name("publisherId"), "publisher_id");
    assert_eq!(book.relation("publisher").unwrap().kind, RelationKind::Direct);

    let settings = Settings::from_toml_str("[datasources.default]\ndialect = \"postgres\"\n").unwrap();
    let compiled = QueryCompiler::new(&schema, &settings)
        .compile("Book", &json!({ "publisher": { "name": "Penguin" } }))
        .unwrap();
    assert!(compiled
        .sql()
        .contains("FROM \"catalog\".\"books\" AS \"book\""));
    assert!(compiled.sql().contains(
        "INNER JOIN \"publishers\" AS \"book_publisher\" ON \"book\".\"publisher_id\" = \"book_publisher\".\"id\""
    ));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_unsupported_schema_extension() {
    let dir = scratch_dir("yaml");
    let schema_file = dir.join("schema.yaml");
    fs::write(&schema_file, "entities: {}").unwrap();

    let result = Schema::from_file(&schema_file);
    assert!(matches!(result, Err(SchemaError::UnsupportedFormat(_))));

    fs::remove_dir_all(&dir).ok();
}
