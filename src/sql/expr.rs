//! Expression AST - the predicate side of SQL generation.
//!
//! This module provides a strongly-typed AST for the expressions the filter
//! compiler emits: column references, bound operands, comparisons and
//! boolean combinations, with exhaustive pattern matching enforced by the
//! compiler.

use serde::ser::{Serialize, Serializer};

use super::dialect::{Dialect, SqlDialect};
use super::token::{Token, TokenStream};

// =============================================================================
// Expression AST
// =============================================================================

/// A SQL expression.
///
/// Every variant must be handled in `to_tokens()` - the compiler enforces this.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference: optional_schema.optional_table.column
    Column {
        schema: Option<String>,
        table: Option<String>,
        column: String,
    },

    /// Literal value rendered in place.
    Literal(Literal),

    /// Bound operand. Rendered as a placeholder in parameterized output.
    Param(Literal),

    /// Binary operation: left op right
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },

    /// IN: expr IN (values...)
    In {
        expr: Box<Expr>,
        values: Vec<Expr>,
        negated: bool,
    },

    /// BETWEEN: expr BETWEEN low AND high
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },

    /// Parenthesized expression
    Paren(Box<Expr>),
}

/// Literal values.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Null,
}

impl Literal {
    /// The token that renders this literal in place.
    pub fn to_token(&self) -> Token {
        match self {
            Literal::Int(n) => Token::LitInt(*n),
            Literal::Float(f) => Token::LitFloat(*f),
            Literal::String(s) => Token::LitString(s.clone()),
            Literal::Bool(b) => Token::LitBool(*b),
            Literal::Null => Token::LitNull,
        }
    }
}

impl Serialize for Literal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Literal::Int(n) => serializer.serialize_i64(*n),
            Literal::Float(f) => serializer.serialize_f64(*f),
            Literal::String(s) => serializer.serialize_str(s),
            Literal::Bool(b) => serializer.serialize_bool(*b),
            Literal::Null => serializer.serialize_unit(),
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Comparison
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    // Logical
    And,
    Or,
    // Pattern matching
    Like,
    NotLike,
    ILike,
    NotILike,
}

impl BinaryOperator {
    /// Whether this operator combines predicates (AND / OR).
    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOperator::And | BinaryOperator::Or)
    }
}

// =============================================================================
// Expression to Tokens
// =============================================================================

impl Expr {
    /// Convert this expression to a token stream (default dialect).
    pub fn to_tokens(&self) -> TokenStream {
        self.to_tokens_for_dialect(Dialect::default())
    }

    /// Convert this expression to a token stream for a specific dialect.
    ///
    /// Case-insensitive matching is emitted as `ILIKE` where the dialect has
    /// it and as `LOWER(x) LIKE LOWER(y)` everywhere else.
    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        match self {
            Expr::Column {
                schema,
                table,
                column,
            } => {
                if let Some(s) = schema {
                    ts.push(Token::Ident(s.clone()));
                    ts.push(Token::Dot);
                }
                if let Some(t) = table {
                    ts.push(Token::Ident(t.clone()));
                    ts.push(Token::Dot);
                }
                ts.push(Token::Ident(column.clone()));
            }

            Expr::Literal(lit) => {
                ts.push(lit.to_token());
            }

            Expr::Param(lit) => {
                ts.push(Token::Param(lit.clone()));
            }

            Expr::BinaryOp { left, op, right } => {
                let case_insensitive = matches!(op, BinaryOperator::ILike | BinaryOperator::NotILike);
                if case_insensitive && !dialect.supports_ilike() {
                    emit_lower(&mut ts, left, dialect);
                    ts.space();
                    if *op == BinaryOperator::NotILike {
                        ts.push(Token::Not).space();
                    }
                    ts.push(Token::Like).space();
                    emit_lower(&mut ts, right, dialect);
                } else {
                    ts.append(&left.to_tokens_for_dialect(dialect));
                    ts.space();
                    emit_binary_op(&mut ts, *op);
                    ts.space();
                    ts.append(&right.to_tokens_for_dialect(dialect));
                }
            }

            Expr::In {
                expr,
                values,
                negated,
            } => {
                // Empty IN list: "x IN ()" is invalid SQL
                // "x IN ()" should be FALSE, "x NOT IN ()" should be TRUE
                if values.is_empty() {
                    ts.push(if *negated { Token::True } else { Token::False });
                } else {
                    ts.append(&expr.to_tokens_for_dialect(dialect));
                    if *negated {
                        ts.space().push(Token::Not);
                    }
                    ts.space().push(Token::In).space().lparen();
                    for (i, val) in values.iter().enumerate() {
                        if i > 0 {
                            ts.comma().space();
                        }
                        ts.append(&val.to_tokens_for_dialect(dialect));
                    }
                    ts.rparen();
                }
            }

            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                ts.append(&expr.to_tokens_for_dialect(dialect));
                if *negated {
                    ts.space().push(Token::Not);
                }
                ts.space().push(Token::Between).space();
                ts.append(&low.to_tokens_for_dialect(dialect));
                ts.space().push(Token::And).space();
                ts.append(&high.to_tokens_for_dialect(dialect));
            }

            Expr::Paren(inner) => {
                ts.lparen();
                ts.append(&inner.to_tokens_for_dialect(dialect));
                ts.rparen();
            }
        }

        ts
    }

    /// Whether this expression is an AND / OR combination of predicates.
    pub fn is_compound(&self) -> bool {
        matches!(self, Expr::BinaryOp { op, .. } if op.is_logical())
    }

    /// Whether this expression is an OR combination of predicates.
    pub fn is_disjunction(&self) -> bool {
        matches!(
            self,
            Expr::BinaryOp {
                op: BinaryOperator::Or,
                ..
            }
        )
    }
}

fn emit_binary_op(ts: &mut TokenStream, op: BinaryOperator) {
    match op {
        BinaryOperator::Eq => ts.push(Token::Eq),
        BinaryOperator::Ne => ts.push(Token::Ne),
        BinaryOperator::Lt => ts.push(Token::Lt),
        BinaryOperator::Gt => ts.push(Token::Gt),
        BinaryOperator::Lte => ts.push(Token::Lte),
        BinaryOperator::Gte => ts.push(Token::Gte),
        BinaryOperator::And => ts.push(Token::And),
        BinaryOperator::Or => ts.push(Token::Or),
        BinaryOperator::Like => ts.push(Token::Like),
        BinaryOperator::NotLike => ts.push(Token::Not).space().push(Token::Like),
        BinaryOperator::ILike => ts.push(Token::ILike),
        BinaryOperator::NotILike => ts.push(Token::Not).space().push(Token::ILike),
    };
}

fn emit_lower(ts: &mut TokenStream, expr: &Expr, dialect: Dialect) {
    ts.push(Token::FunctionName("LOWER".into()));
    ts.lparen();
    ts.append(&expr.to_tokens_for_dialect(dialect));
    ts.rparen();
}

// =============================================================================
// Expression Constructors
// =============================================================================

/// Create a column reference.
pub fn col(name: &str) -> Expr {
    Expr::Column {
        schema: None,
        table: None,
        column: name.into(),
    }
}

/// Create a qualified column reference (table.column).
pub fn table_col(table: &str, column: &str) -> Expr {
    Expr::Column {
        schema: None,
        table: Some(table.into()),
        column: column.into(),
    }
}

/// Create a fully qualified column reference (schema.table.column).
pub fn schema_col(schema: Option<&str>, table: &str, column: &str) -> Expr {
    Expr::Column {
        schema: schema.map(Into::into),
        table: Some(table.into()),
        column: column.into(),
    }
}

/// Create an integer literal.
pub fn lit_int(n: i64) -> Expr {
    Expr::Literal(Literal::Int(n))
}

/// Create a bound operand.
pub fn param(value: impl Into<Literal>) -> Expr {
    Expr::Param(value.into())
}

// =============================================================================
// Expression Builder Trait
// =============================================================================

/// Extension trait for building expressions fluently.
pub trait ExprExt: Sized {
    fn into_expr(self) -> Expr;

    fn binary(self, op: BinaryOperator, other: impl Into<Expr>) -> Expr {
        Expr::BinaryOp {
            left: Box::new(self.into_expr()),
            op,
            right: Box::new(other.into()),
        }
    }

    // Comparison operators
    fn eq(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Eq, other)
    }

    fn ne(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Ne, other)
    }

    fn gt(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Gt, other)
    }

    fn gte(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Gte, other)
    }

    fn lt(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Lt, other)
    }

    fn lte(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Lte, other)
    }

    // Logical operators
    fn and(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::And, other)
    }

    fn or(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Or, other)
    }

    // Pattern matching
    fn like(self, pattern: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Like, pattern)
    }

    fn not_like(self, pattern: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::NotLike, pattern)
    }

    fn ilike(self, pattern: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::ILike, pattern)
    }

    fn not_ilike(self, pattern: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::NotILike, pattern)
    }

    // IN operator
    fn in_list(self, values: Vec<Expr>) -> Expr {
        Expr::In {
            expr: Box::new(self.into_expr()),
            values,
            negated: false,
        }
    }

    fn not_in_list(self, values: Vec<Expr>) -> Expr {
        Expr::In {
            expr: Box::new(self.into_expr()),
            values,
            negated: true,
        }
    }

    // BETWEEN operator
    fn between(self, low: impl Into<Expr>, high: impl Into<Expr>) -> Expr {
        Expr::Between {
            expr: Box::new(self.into_expr()),
            low: Box::new(low.into()),
            high: Box::new(high.into()),
            negated: false,
        }
    }
}

impl ExprExt for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<i64> for Expr {
    fn from(n: i64) -> Self {
        lit_int(n)
    }
}

impl From<i32> for Expr {
    fn from(n: i32) -> Self {
        lit_int(n as i64)
    }
}

impl From<i64> for Literal {
    fn from(n: i64) -> Self {
        Literal::Int(n)
    }
}

impl From<i32> for Literal {
    fn from(n: i32) -> Self {
        Literal::Int(n as i64)
    }
}

impl From<f64> for Literal {
    fn from(f: f64) -> Self {
        Literal::Float(f)
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::String(s.into())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Literal::String(s)
    }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Literal::Bool(b)
    }
}

// =============================================================================
// Tests
// =============================================================================
