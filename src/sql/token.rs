//! SQL Tokens - the atomic units of SQL output.
//!
//! Tokens are dialect-agnostic representations that serialize
//! to dialect-specific strings. Bound operands travel as [`Token::Param`]
//! and are either rendered inline or replaced by placeholders.

use super::dialect::{Dialect, SqlDialect};
use super::expr::Literal;

/// SQL Token - every element the filter compiler emits.
///
/// Adding a new variant here will cause compile errors everywhere
/// it needs to be handled (exhaustive matching).
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // === Keywords ===
    Select,
    From,
    Where,
    And,
    Or,
    Not,
    As,
    On,
    Join,
    Inner,
    GroupBy,
    In,
    Between,
    Like,
    ILike,
    True,
    False,

    // === Punctuation ===
    Comma,
    Dot,
    LParen,
    RParen,

    // === Operators ===
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,

    // === Whitespace / Formatting ===
    Space,
    Newline,
    Indent(usize),

    // === Dynamic Content ===
    /// Simple identifier (table, column, alias)
    Ident(String),
    /// Qualified identifier: schema.table or just table
    QualifiedIdent {
        schema: Option<String>,
        name: String,
    },
    /// Integer literal
    LitInt(i64),
    /// Float literal
    LitFloat(f64),
    /// String literal
    LitString(String),
    /// Boolean literal
    LitBool(bool),
    /// NULL literal
    LitNull,
    /// Bound operand. Inline serialization renders it as a literal;
    /// parameterized serialization renders a placeholder.
    Param(Literal),

    /// Function name, rendered upper-case.
    FunctionName(String),
}

impl Token {
    /// Serialize this token to a string for the given dialect.
    pub fn serialize(&self, dialect: Dialect) -> String {
        match self {
            // Keywords
            Token::Select => "SELECT".into(),
            Token::From => "FROM".into(),
            Token::Where => "WHERE".into(),
            Token::And => "AND".into(),
            Token::Or => "OR".into(),
            Token::Not => "NOT".into(),
            Token::As => "AS".into(),
            Token::On => "ON".into(),
            Token::Join => "JOIN".into(),
            Token::Inner => "INNER".into(),
            Token::GroupBy => "GROUP BY".into(),
            Token::In => "IN".into(),
            Token::Between => "BETWEEN".into(),
            Token::Like => "LIKE".into(),
            Token::ILike => "ILIKE".into(),
            Token::True => "TRUE".into(),
            Token::False => "FALSE".into(),

            // Punctuation
            Token::Comma => ",".into(),
            Token::Dot => ".".into(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),

            // Operators
            Token::Eq => "=".into(),
            Token::Ne => "!=".into(),
            Token::Lt => "<".into(),
            Token::Gt => ">".into(),
            Token::Lte => "<=".into(),
            Token::Gte => ">=".into(),

            // Whitespace
            Token::Space => " ".into(),
            Token::Newline => "\n".into(),
            Token::Indent(n) => "  ".repeat(*n),

            // Dynamic - dialect-specific formatting
            Token::Ident(name) => dialect.quote_identifier(name),
            Token::QualifiedIdent { schema, name } => match schema {
                Some(s) => format!(
                    "{}.{}",
                    dialect.quote_identifier(s),
                    dialect.quote_identifier(name)
                ),
                None => dialect.quote_identifier(name),
            },
            Token::LitInt(n) => n.to_string(),
            Token::LitFloat(f) => {
                if f.is_nan() {
                    panic!("Cannot serialize NaN to SQL")
                }
                if f.is_infinite() {
                    panic!("Cannot serialize Infinity to SQL")
                }
                let mut buffer = ryu::Buffer::new();
                buffer.format(*f).to_string()
            }
            Token::LitString(s) => dialect.quote_string(s),
            Token::LitBool(b) => dialect.format_bool(*b).into(),
            Token::LitNull => "NULL".into(),
            Token::Param(lit) => lit.to_token().serialize(dialect),

            Token::FunctionName(name) => name.to_uppercase(),
        }
    }
}

/// A stream of tokens that can be serialized to SQL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    /// Create an empty token stream.
    pub fn new() -> Self {
        Self { tokens: vec![] }
    }

    /// Push a single token.
    pub fn push(&mut self, token: Token) -> &mut Self {
        self.tokens.push(token);
        self
    }

    /// Extend with multiple tokens.
    pub fn extend(&mut self, tokens: impl IntoIterator<Item = Token>) -> &mut Self {
        self.tokens.extend(tokens);
        self
    }

    /// Append another token stream.
    pub fn append(&mut self, other: &TokenStream) -> &mut Self {
        self.tokens.extend(other.tokens.iter().cloned());
        self
    }

    /// Serialize all tokens to a SQL string, rendering bound operands inline.
    pub fn serialize(&self, dialect: Dialect) -> String {
        self.tokens.iter().map(|t| t.serialize(dialect)).collect()
    }

    /// Serialize with placeholders in place of bound operands.
    ///
    /// Returns the SQL text and the bound values in placeholder order.
    /// `NULL` operands are rendered inline and never bound.
    pub fn serialize_parameterized(&self, dialect: Dialect) -> (String, Vec<Literal>) {
        let mut sql = String::new();
        let mut params = Vec::new();

        for token in &self.tokens {
            match token {
                Token::Param(Literal::Null) => sql.push_str("NULL"),
                Token::Param(lit) => {
                    params.push(lit.clone());
                    sql.push_str(&dialect.placeholder(params.len()));
                }
                other => sql.push_str(&other.serialize(dialect)),
            }
        }

        (sql, params)
    }

    /// Number of tokens in the stream.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    // Convenience methods for common tokens
    pub fn space(&mut self) -> &mut Self {
        self.push(Token::Space)
    }
    pub fn newline(&mut self) -> &mut Self {
        self.push(Token::Newline)
    }
    pub fn indent(&mut self, n: usize) -> &mut Self {
        self.push(Token::Indent(n))
    }
    pub fn comma(&mut self) -> &mut Self {
        self.push(Token::Comma)
    }
    pub fn lparen(&mut self) -> &mut Self {
        self.push(Token::LParen)
    }
    pub fn rparen(&mut self) -> &mut Self {
        self.push(Token::RParen)
    }
}
