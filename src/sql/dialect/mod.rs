//! SQL Dialect definitions and formatting rules.
//!
//! This module provides a trait-based abstraction for SQL dialect differences.
//! Each dialect implements `SqlDialect` to handle its specific syntax:
//!
//! - Identifier quoting: `"` (PG/DuckDB), `` ` `` (MySQL), `[]` (T-SQL)
//! - Boolean literals: true/false vs 1/0
//! - Bound parameter placeholders: `$n` vs `?` vs `@pN`
//! - Case-insensitive matching: native ILIKE or LOWER() emulation
//!
//! # Usage
//!
//! ```ignore
//! use relfilter::sql::{Dialect, SqlDialect};
//!
//! let dialect = Dialect::Postgres;
//! let quoted = dialect.quote_identifier("book");  // "book"
//! let placeholder = dialect.placeholder(1);       // $1
//! ```

mod duckdb;
pub mod helpers;
mod mysql;
mod postgres;
mod tsql;

pub use duckdb::DuckDb;
pub use mysql::MySql;
pub use postgres::Postgres;
pub use tsql::TSql;

use serde::{Deserialize, Serialize};

/// SQL dialect trait - defines how SQL constructs are rendered.
///
/// Implementations handle dialect-specific syntax differences.
/// The default implementations follow ANSI SQL where possible.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    // =========================================================================
    // Identifier and Literal Quoting
    // =========================================================================

    /// Quote an identifier (table, column, alias).
    ///
    /// - PostgreSQL/DuckDB: `"identifier"`
    /// - MySQL: `` `identifier` ``
    /// - T-SQL: `[identifier]`
    fn quote_identifier(&self, ident: &str) -> String;

    /// Quote a string literal.
    ///
    /// All dialects use single quotes with `''` for escaping.
    /// Override for Unicode prefix (T-SQL N'...') or backslash escapes (MySQL).
    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_single(s)
    }

    /// Format a boolean literal.
    ///
    /// - PostgreSQL/DuckDB: `true`/`false`
    /// - MySQL/T-SQL: `1`/`0`
    fn format_bool(&self, b: bool) -> &'static str;

    // =========================================================================
    // Parameter Binding
    // =========================================================================

    /// Placeholder text for the 1-based bound parameter `index`.
    fn placeholder(&self, index: usize) -> String {
        helpers::placeholder_question(index)
    }

    // =========================================================================
    // Pattern Matching
    // =========================================================================

    /// Whether this dialect has a native `ILIKE` operator.
    ///
    /// Dialects without it get `LOWER(x) LIKE LOWER(y)`.
    fn supports_ilike(&self) -> bool {
        false
    }

    // =========================================================================
    // Identifier Case
    // =========================================================================

    /// Whether unquoted identifiers fold to lower case in this database.
    ///
    /// Schemas generated with unquoted DDL then store lower-case names,
    /// so quoted references have to be lower-cased to match.
    fn folds_to_lower(&self) -> bool {
        false
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    #[serde(alias = "postgresql", alias = "pg")]
    Postgres,
    DuckDb,
    MySql,
    #[serde(alias = "mssql", alias = "sqlserver")]
    TSql,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Postgres => &Postgres,
            Dialect::DuckDb => &DuckDb,
            Dialect::MySql => &MySql,
            Dialect::TSql => &TSql,
        }
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        self.dialect().quote_string(s)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        self.dialect().format_bool(b)
    }

    fn placeholder(&self, index: usize) -> String {
        self.dialect().placeholder(index)
    }

    fn supports_ilike(&self) -> bool {
        self.dialect().supports_ilike()
    }

    fn folds_to_lower(&self) -> bool {
        self.dialect().folds_to_lower()
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dialect().name())
    }
}
