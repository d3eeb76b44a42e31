//! Normalized relation filters.
//!
//! A raw JSON filter is reduced by the [`Normalizer`] into a [`Filter`]: one
//! list of clauses joined by AND and one joined by OR. Each clause is a
//! tagged node the compiler matches on exhaustively:
//!
//! - [`Clause::Leaf`] - a single property comparison
//! - [`Clause::Relation`] - a sub-filter applied to a related entity
//! - [`Clause::Group`] - a nested AND / OR group
//!
//! Serializing a filter yields its canonical JSON form, e.g.
//! `{"and":[{"title":{"=":"X"}}],"or":[...]}`.

mod normalize;

pub use normalize::Normalizer;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::sql::Literal;

/// Canonical filter: AND-clauses plus optional OR-clauses.
///
/// An empty filter places no constraint on the root entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub and: Vec<Clause>,
    pub or: Vec<Clause>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.and.is_empty() && self.or.is_empty()
    }

    /// All clauses in path order: AND-clauses first, then OR-clauses.
    pub fn clauses(&self) -> impl Iterator<Item = &Clause> {
        self.and.iter().chain(self.or.iter())
    }
}

/// One node of a normalized filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Leaf(Comparison),
    Relation(RelationFilter),
    Group(Group),
}

/// `property <operator> operand`.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub property: String,
    pub operator: Operator,
    pub operand: Operand,
}

impl Comparison {
    pub fn new(property: &str, operator: Operator, operand: Operand) -> Self {
        Self {
            property: property.into(),
            operator,
            operand,
        }
    }

    /// Implicit equality, as produced for `{property: value}`.
    pub fn eq(property: &str, value: impl Into<Literal>) -> Self {
        Self::new(property, Operator::Eq, Operand::Scalar(value.into()))
    }

    /// A null operand places no constraint.
    pub fn is_noop(&self) -> bool {
        self.operand == Operand::Null
    }
}

/// Sub-filter evaluated against the target of a declared relation.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationFilter {
    pub relation: String,
    pub filter: Filter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    And,
    Or,
}

impl GroupKind {
    pub fn key(self) -> &'static str {
        match self {
            GroupKind::And => "and",
            GroupKind::Or => "or",
        }
    }
}

/// Nested boolean group.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub kind: GroupKind,
    pub clauses: Vec<Clause>,
}

impl Group {
    pub fn and(clauses: Vec<Clause>) -> Self {
        Self {
            kind: GroupKind::And,
            clauses,
        }
    }

    pub fn or(clauses: Vec<Clause>) -> Self {
        Self {
            kind: GroupKind::Or,
            clauses,
        }
    }
}

/// Comparison operators accepted in operand objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    ILike,
    NotLike,
    NotILike,
    In,
    NotIn,
    Between,
}

/// Shape of operand an operator takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Scalar,
    List,
    Pair,
}

impl Operator {
    pub const ALL: [Operator; 13] = [
        Operator::Eq,
        Operator::Neq,
        Operator::Lt,
        Operator::Lte,
        Operator::Gt,
        Operator::Gte,
        Operator::Like,
        Operator::ILike,
        Operator::NotLike,
        Operator::NotILike,
        Operator::In,
        Operator::NotIn,
        Operator::Between,
    ];

    /// Parse an operand-object key such as `gte` or `nilike`.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.key() == key)
    }

    pub fn key(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Neq => "neq",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Like => "like",
            Operator::ILike => "ilike",
            Operator::NotLike => "nlike",
            Operator::NotILike => "nilike",
            Operator::In => "inq",
            Operator::NotIn => "nin",
            Operator::Between => "between",
        }
    }

    pub fn arity(self) -> Arity {
        match self {
            Operator::In | Operator::NotIn => Arity::List,
            Operator::Between => Arity::Pair,
            _ => Arity::Scalar,
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Right-hand side of a comparison, shaped to its operator's arity.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Explicit `null`: no constraint.
    Null,
    Scalar(Literal),
    List(Vec<Literal>),
    Pair(Literal, Literal),
}

// =============================================================================
// Canonical JSON form
// =============================================================================

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.or.is_empty() { 1 } else { 2 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("and", &self.and)?;
        if !self.or.is_empty() {
            map.serialize_entry("or", &self.or)?;
        }
        map.end()
    }
}

impl Serialize for Clause {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Clause::Leaf(cmp) => map.serialize_entry(&cmp.property, &OperandObject(cmp))?,
            Clause::Relation(rel) => map.serialize_entry(&rel.relation, &rel.filter)?,
            Clause::Group(group) => map.serialize_entry(group.kind.key(), &group.clauses)?,
        }
        map.end()
    }
}

struct OperandObject<'a>(&'a Comparison);

impl Serialize for OperandObject<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.0.operator.key(), &self.0.operand)?;
        map.end()
    }
}

impl Serialize for Operand {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Operand::Null => serializer.serialize_unit(),
            Operand::Scalar(value) => value.serialize(serializer),
            Operand::List(values) => values.serialize(serializer),
            Operand::Pair(low, high) => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(low)?;
                seq.serialize_element(high)?;
                seq.end()
            }
        }
    }
}
