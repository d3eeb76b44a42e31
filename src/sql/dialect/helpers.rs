//! Shared helper functions for SQL dialect implementations.
//!
//! This module provides reusable building blocks that dialects can compose
//! to implement the `SqlDialect` trait with minimal duplication.

// =============================================================================
// Identifier Quoting
// =============================================================================

/// Quote identifier with double quotes (ANSI style).
/// Used by: Postgres, DuckDB
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote identifier with backticks.
/// Used by: MySQL
pub fn quote_backtick(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

/// Quote identifier with square brackets.
/// Used by: T-SQL (SQL Server, Azure SQL)
pub fn quote_bracket(ident: &str) -> String {
    format!("[{}]", ident.replace(']', "]]"))
}

// =============================================================================
// String Quoting
// =============================================================================

/// Quote string with single quotes (standard SQL).
pub fn quote_string_single(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Quote string with single quotes, also doubling backslashes.
/// Used by: MySQL, where backslash is an escape character by default
pub fn quote_string_backslash(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "''"))
}

/// Quote string with N prefix for Unicode (T-SQL).
/// Used by: T-SQL for non-ASCII strings
pub fn quote_string_unicode(s: &str) -> String {
    format!("N'{}'", s.replace('\'', "''"))
}

// =============================================================================
// Boolean Formatting
// =============================================================================

/// Format boolean as literal true/false.
/// Used by: Postgres, DuckDB
pub fn format_bool_literal(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

/// Format boolean as numeric 1/0.
/// Used by: T-SQL, MySQL
pub fn format_bool_numeric(b: bool) -> &'static str {
    if b {
        "1"
    } else {
        "0"
    }
}

// =============================================================================
// Placeholders
// =============================================================================

/// Numbered dollar placeholder: `$1`, `$2`, ...
/// Used by: Postgres, DuckDB
pub fn placeholder_dollar(index: usize) -> String {
    format!("${}", index)
}

/// Positional question-mark placeholder.
/// Used by: MySQL
pub fn placeholder_question(_index: usize) -> String {
    "?".into()
}

/// Named `@pN` placeholder, as bound by sp_executesql and most drivers.
/// Used by: T-SQL
pub fn placeholder_at(index: usize) -> String {
    format!("@p{}", index)
}
