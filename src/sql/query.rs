//! Query builder - construct the identifier-selecting SELECT with a fluent API.

use super::dialect::Dialect;
use super::expr::{Expr, ExprExt, Literal};
use super::token::{Token, TokenStream};

// =============================================================================
// Table Reference
// =============================================================================

/// A table reference with optional schema and alias.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct TableRef {
    pub schema: Option<String>,
    pub table: String,
    pub alias: Option<String>,
}

impl TableRef {
    pub fn new(table: &str) -> Self {
        Self {
            schema: None,
            table: table.into(),
            alias: None,
        }
    }

    pub fn with_schema(mut self, schema: &str) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::QualifiedIdent {
            schema: self.schema.clone(),
            name: self.table.clone(),
        });
        if let Some(alias) = &self.alias {
            ts.space()
                .push(Token::As)
                .space()
                .push(Token::Ident(alias.clone()));
        }
        ts
    }
}

// =============================================================================
// Joins
// =============================================================================

/// An INNER JOIN clause.
///
/// Filtering through a relation requires at least one related row, so the
/// compiler only ever emits inner joins.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub table: TableRef,
    pub on: Expr,
}

impl Join {
    pub fn to_tokens(&self) -> TokenStream {
        self.to_tokens_for_dialect(Dialect::default())
    }

    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::Inner).space().push(Token::Join).space();
        ts.append(&self.table.to_tokens());
        ts.space().push(Token::On).space();
        ts.append(&self.on.to_tokens_for_dialect(dialect));
        ts
    }
}

// =============================================================================
// Query Builder
// =============================================================================

/// A SELECT query.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use = "Query has no effect until converted to SQL with to_sql() or to_tokens()"]
pub struct Query {
    pub select: Vec<Expr>,
    pub from: Option<TableRef>,
    pub joins: Vec<Join>,
    pub where_clause: Option<Expr>,
    pub group_by: Vec<Expr>,
}

impl Query {
    /// Create a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the SELECT list.
    pub fn select(mut self, exprs: Vec<Expr>) -> Self {
        self.select = exprs;
        self
    }

    /// Set the FROM table.
    pub fn from(mut self, table: TableRef) -> Self {
        self.from = Some(table);
        self
    }

    /// Add an INNER JOIN.
    pub fn inner_join(mut self, table: TableRef, on: Expr) -> Self {
        self.joins.push(Join { table, on });
        self
    }

    /// Add a WHERE condition (ANDed with existing conditions).
    pub fn filter(mut self, condition: Expr) -> Self {
        self.where_clause = Some(match self.where_clause {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    /// Set the GROUP BY clause.
    pub fn group_by(mut self, exprs: Vec<Expr>) -> Self {
        self.group_by = exprs;
        self
    }

    /// Convert to token stream (default dialect).
    pub fn to_tokens(&self) -> TokenStream {
        self.to_tokens_for_dialect(Dialect::default())
    }

    /// Convert to token stream for a specific dialect.
    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        // SELECT
        ts.push(Token::Select);

        // Columns
        for (i, expr) in self.select.iter().enumerate() {
            if i == 0 {
                ts.newline().indent(1);
            } else {
                ts.comma().newline().indent(1);
            }
            ts.append(&expr.to_tokens_for_dialect(dialect));
        }

        // FROM
        if let Some(from) = &self.from {
            ts.newline().push(Token::From).space();
            ts.append(&from.to_tokens());
        }

        // JOINs
        for join in &self.joins {
            ts.newline();
            ts.append(&join.to_tokens_for_dialect(dialect));
        }

        // WHERE
        if let Some(where_clause) = &self.where_clause {
            ts.newline().push(Token::Where).space();
            ts.append(&where_clause.to_tokens_for_dialect(dialect));
        }

        // GROUP BY
        if !self.group_by.is_empty() {
            ts.newline().push(Token::GroupBy).space();
            for (i, expr) in self.group_by.iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                ts.append(&expr.to_tokens_for_dialect(dialect));
            }
        }

        ts
    }

    /// Generate SQL string for a specific dialect, with operands inline.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens_for_dialect(dialect).serialize(dialect)
    }

    /// Generate SQL with placeholders plus the bound operands in order.
    pub fn to_parameterized(&self, dialect: Dialect) -> (String, Vec<Literal>) {
        self.to_tokens_for_dialect(dialect)
            .serialize_parameterized(dialect)
    }
}

impl std::fmt::Display for Query {
    /// Formats the query using the default dialect (Postgres), operands inline.
    ///
    /// For dialect-specific SQL, use [`Query::to_sql`] instead.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_sql(Dialect::default()))
    }
}

// =============================================================================
// Tests
// =============================================================================
