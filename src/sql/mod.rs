//! SQL generation module.
//!
//! This module provides a type-safe SQL builder that generates multi-dialect SQL.
//! It includes:
//!
//! - [`query`] - SELECT / JOIN / WHERE / GROUP BY builder
//! - [`expr`] - Expression AST and builder DSL
//! - [`token`] - Token types for SQL generation, with parameter binding
//! - [`dialect`] - SQL dialect implementations

pub mod dialect;
pub mod expr;
pub mod query;
pub mod token;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types at the sql module level
pub use dialect::{Dialect, SqlDialect};
pub use expr::{
    col, lit_int, param, schema_col, table_col, BinaryOperator, Expr, ExprExt, Literal,
};
pub use query::{Join, Query, TableRef};
pub use token::{Token, TokenStream};
