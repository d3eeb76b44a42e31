//! Test utilities for SQL emission validation.
//!
//! Provides helpers for validating that emitted SQL is syntactically correct
//! using sqlparser-rs for roundtrip validation.

use sqlparser::dialect::{DuckDbDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect};
use sqlparser::parser::Parser;

use super::dialect::Dialect;

/// Validates that a SQL string is syntactically valid for the given dialect.
///
/// Uses sqlparser-rs to parse the SQL and returns an error if parsing fails.
pub fn validate_sql(sql: &str, dialect: Dialect) -> Result<(), String> {
    let parser_dialect: Box<dyn sqlparser::dialect::Dialect> = match dialect {
        Dialect::Postgres => Box::new(PostgreSqlDialect {}),
        Dialect::DuckDb => Box::new(DuckDbDialect {}),
        Dialect::MySql => Box::new(MySqlDialect {}),
        Dialect::TSql => Box::new(MsSqlDialect {}),
    };

    Parser::parse_sql(&*parser_dialect, sql)
        .map(|_| ())
        .map_err(|e| format!("Invalid SQL for {:?}: {}\nSQL: {}", dialect, e, sql))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_valid_sql() {
        validate_sql("SELECT id FROM book", Dialect::Postgres).unwrap();
        validate_sql("SELECT id FROM book WHERE id = ?", Dialect::MySql).unwrap();
        validate_sql("SELECT id FROM book WHERE id = $1", Dialect::DuckDb).unwrap();
    }

    #[test]
    fn test_validate_invalid_sql() {
        let result = validate_sql("SELEC id FORM book", Dialect::Postgres);
        assert!(result.is_err());
    }
}
