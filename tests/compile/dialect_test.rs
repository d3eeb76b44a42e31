//! Dialect-specific compilation tests.
//!
//! Every statement is parsed back with sqlparser for its dialect.

#[path = "../common/mod.rs"]
mod common;

use insta::assert_snapshot;
use relfilter::config::Settings;
use relfilter::sql::Literal;
use relfilter::{CompiledQuery, Dialect, QueryCompiler};
use serde_json::{json, Value};
use sqlparser::dialect::{DuckDbDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect};
use sqlparser::parser::Parser;

fn validate(sql: &str, dialect: Dialect) {
    let parser_dialect: Box<dyn sqlparser::dialect::Dialect> = match dialect {
        Dialect::Postgres => Box::new(PostgreSqlDialect {}),
        Dialect::DuckDb => Box::new(DuckDbDialect {}),
        Dialect::MySql => Box::new(MySqlDialect {}),
        Dialect::TSql => Box::new(MsSqlDialect {}),
    };
    if let Err(e) = Parser::parse_sql(&*parser_dialect, sql) {
        panic!("Invalid SQL for {:?}: {}\nSQL: {}", dialect, e, sql);
    }
}

fn config_for(dialect: &str) -> Settings {
    common::settings(&format!(
        "[datasources.db]\ndialect = \"{}\"\n",
        dialect
    ))
}

fn compile_with(settings: &Settings, raw: Value) -> CompiledQuery {
    let schema = common::library();
    QueryCompiler::new(&schema, settings)
        .compile("Book", &raw)
        .unwrap()
}

fn orwell() -> Value {
    json!({
        "authors": { "firstName": "George", "lastName": { "ilike": "orwe%" } },
        "title": { "nilike": "%farm%" },
        "or": [ { "id": { "between": [1, 10] } }, { "publisherId": { "nin": [4, 5] } } ]
    })
}

#[test]
fn test_every_dialect_parses() {
    for (name, dialect) in [
        ("postgres", Dialect::Postgres),
        ("duckdb", Dialect::DuckDb),
        ("mysql", Dialect::MySql),
        ("tsql", Dialect::TSql),
    ] {
        let compiled = compile_with(&config_for(name), orwell());
        assert_eq!(compiled.dialect(), dialect);
        validate(compiled.sql(), dialect);
        validate(&compiled.to_inline_sql(), dialect);
        assert_eq!(compiled.params().len(), 7, "{}", name);
    }
}

#[test]
fn test_postgres_native_ilike() {
    let compiled = compile_with(&config_for("postgres"), orwell());
    assert!(compiled.sql().contains("\"book\".\"title\" NOT ILIKE $3"));
    assert!(compiled.sql().contains("\"book_authors\".\"lastname\" ILIKE $2"));
}

#[test]
fn test_duckdb_preserves_case() {
    let compiled = compile_with(&config_for("duckdb"), json!({ "publisherId": 3 }));
    assert_snapshot!(compiled.sql(), @r#"
    SELECT
      "book"."id"
    FROM "Book" AS "book"
    WHERE "book"."publisherId" = $1
    GROUP BY "book"."id"
    "#);
}

#[test]
fn test_mysql() {
    let compiled = compile_with(&config_for("mysql"), orwell());
    assert_snapshot!(compiled.sql(), @r#"
    SELECT
      `book`.`id`
    FROM `Book` AS `book`
    INNER JOIN `AuthorBook` AS `book_authorbook_authors` ON `book`.`id` = `book_authorbook_authors`.`bookId`
    INNER JOIN `Author` AS `book_authors` ON `book_authorbook_authors`.`authorId` = `book_authors`.`id`
    WHERE (`book_authors`.`firstName` = ? AND LOWER(`book_authors`.`lastName`) LIKE LOWER(?)) AND LOWER(`book`.`title`) NOT LIKE LOWER(?) AND (`book`.`id` BETWEEN ? AND ? OR `book`.`publisherId` NOT IN (?, ?))
    GROUP BY `book`.`id`
    "#);
    assert_eq!(
        compiled.params(),
        [
            Literal::String("George".into()),
            Literal::String("orwe%".into()),
            Literal::String("%farm%".into()),
            Literal::Int(1),
            Literal::Int(10),
            Literal::Int(4),
            Literal::Int(5),
        ]
    );
}

#[test]
fn test_tsql() {
    let settings = common::settings(
        r#"
[datasources.db]
dialect = "mssql"
default_schema = "dbo"
"#,
    );
    let compiled = compile_with(&settings, json!({ "authors": { "lastName": { "ilike": "orwe%" } } }));
    assert_snapshot!(compiled.sql(), @r#"
    SELECT
      [book].[id]
    FROM [dbo].[Book] AS [book]
    INNER JOIN [dbo].[AuthorBook] AS [book_authorbook_authors] ON [book].[id] = [book_authorbook_authors].[bookId]
    INNER JOIN [dbo].[Author] AS [book_authors] ON [book_authorbook_authors].[authorId] = [book_authors].[id]
    WHERE LOWER([book_authors].[lastName]) LIKE LOWER(@p1)
    GROUP BY [book].[id]
    "#);
}

#[test]
fn test_tsql_unicode_inline() {
    let settings = config_for("tsql");
    let compiled = compile_with(&settings, json!({ "title": "Čapek" }));
    assert!(compiled.to_inline_sql().contains("[book].[title] = N'Čapek'"));
    assert!(compiled.sql().contains("[book].[title] = @p1"));
}

#[test]
fn test_case_folding_override() {
    let settings = common::settings(
        r#"
[datasources.db]
dialect = "postgres"
case_folding = "preserve"
"#,
    );
    let compiled = compile_with(&settings, json!({ "publisherId": 3 }));
    assert!(compiled.sql().contains("FROM \"Book\" AS \"book\""));
    assert!(compiled.sql().contains("\"book\".\"publisherId\" = $1"));
}

#[test]
fn test_inline_strings_are_escaped() {
    let compiled = compile_with(&config_for("mysql"), json!({ "title": "O'Brien\\" }));
    assert!(compiled
        .to_inline_sql()
        .contains(r"`book`.`title` = 'O''Brien\\'"));
    assert_eq!(compiled.params(), [Literal::String("O'Brien\\".into())]);
}
