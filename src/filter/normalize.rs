//! Raw JSON filter to [`Filter`].
//!
//! Own property and relation keys come first, followed by the entries of an
//! explicit `and` array. Nested `and` arrays are flattened into the
//! surrounding conjunction; nested `or` arrays become [`Group`]s.

use serde_json::{Map, Value};

use super::{Arity, Clause, Comparison, Filter, Group, GroupKind, Operand, Operator, RelationFilter};
use crate::error::{FilterError, FilterResult};
use crate::schema::Reflector;
use crate::sql::Literal;

const AND: &str = "and";
const OR: &str = "or";

/// Canonicalizes raw filters against the schema.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer<'a> {
    reflector: Reflector<'a>,
    reject_unknown: bool,
}

impl<'a> Normalizer<'a> {
    pub fn new(reflector: Reflector<'a>) -> Self {
        Self {
            reflector,
            reject_unknown: false,
        }
    }

    /// Fail on keys that are neither properties nor relations instead of
    /// dropping them.
    pub fn reject_unknown_properties(mut self, reject: bool) -> Self {
        self.reject_unknown = reject;
        self
    }

    /// Normalize `raw` against `entity`. `null` is an empty filter.
    pub fn normalize(&self, entity: &str, raw: &Value) -> FilterResult<Filter> {
        self.reflector.entity(entity)?;

        match raw {
            Value::Null => Ok(Filter::new()),
            Value::Object(object) => {
                let (and, or) = self.parts(entity, object)?;
                Ok(Filter { and, or })
            }
            other => Err(invalid_filter(
                entity,
                format!("expected an object, got {}", kind_of(other)),
            )),
        }
    }

    /// Split one filter object into its AND-clauses and OR-alternatives.
    fn parts(&self, entity: &str, object: &Map<String, Value>) -> FilterResult<(Vec<Clause>, Vec<Clause>)> {
        let mut own = Vec::new();
        let mut nested = Vec::new();
        let mut alternatives = Vec::new();

        for (key, value) in object {
            match key.as_str() {
                AND => {
                    for entry in self.entries(entity, AND, value)? {
                        nested.extend(self.conjunction(entity, entry)?);
                    }
                }
                OR => {
                    for entry in self.entries(entity, OR, value)? {
                        alternatives.extend(self.alternative(entity, entry)?);
                    }
                }
                _ => {
                    if let Some(clause) = self.clause(entity, key, value, object)? {
                        own.push(clause);
                    }
                }
            }
        }

        own.extend(nested);
        Ok((own, alternatives))
    }

    /// Clauses of a filter object in AND context.
    fn conjunction(&self, entity: &str, object: &Map<String, Value>) -> FilterResult<Vec<Clause>> {
        let (mut and, or) = self.parts(entity, object)?;
        if !or.is_empty() {
            and.push(Clause::Group(Group::or(or)));
        }
        Ok(and)
    }

    /// Clauses one `or` entry contributes to the enclosing disjunction.
    fn alternative(&self, entity: &str, object: &Map<String, Value>) -> FilterResult<Vec<Clause>> {
        let mut clauses = self.conjunction(entity, object)?;
        if clauses.len() > 1 {
            return Ok(vec![Clause::Group(Group::and(clauses))]);
        }

        Ok(match clauses.pop() {
            Some(Clause::Group(Group {
                kind: GroupKind::Or,
                clauses,
            })) => clauses,
            Some(clause) => vec![clause],
            // An empty alternative matches every row.
            None => vec![Clause::Group(Group::and(Vec::new()))],
        })
    }

    fn entries<'v>(
        &self,
        entity: &str,
        key: &str,
        value: &'v Value,
    ) -> FilterResult<Vec<&'v Map<String, Value>>> {
        let Value::Array(entries) = value else {
            return Err(invalid_filter(
                entity,
                format!("\"{}\" expects an array of filters, got {}", key, kind_of(value)),
            ));
        };

        entries
            .iter()
            .map(|entry| {
                entry.as_object().ok_or_else(|| {
                    invalid_filter(
                        entity,
                        format!("\"{}\" entries must be objects, got {}", key, kind_of(entry)),
                    )
                })
            })
            .collect()
    }

    fn clause(
        &self,
        entity: &str,
        key: &str,
        value: &Value,
        fragment: &Map<String, Value>,
    ) -> FilterResult<Option<Clause>> {
        if self.reflector.is_relation(entity, key) {
            if value.is_null() {
                return Ok(None);
            }
            let relation = self.reflector.relation(entity, key)?;
            let filter = self.normalize(&relation.target, value)?;
            return Ok(Some(Clause::Relation(RelationFilter {
                relation: key.into(),
                filter,
            })));
        }

        if self.reflector.is_property(entity, key) {
            return comparison(entity, key, value).map(|cmp| Some(Clause::Leaf(cmp)));
        }

        if self.reject_unknown {
            return Err(FilterError::UnknownProperty {
                entity: entity.into(),
                property: key.into(),
                fragment: Value::Object(fragment.clone()).to_string(),
            });
        }

        log::debug!("Dropping unknown property {}.{} from filter", entity, key);
        Ok(None)
    }
}

/// Expand a property value into a comparison.
///
/// Scalars mean equality and bare arrays mean `inq`. An object must hold
/// exactly one operator key.
fn comparison(entity: &str, property: &str, value: &Value) -> FilterResult<Comparison> {
    let invalid = |reason: String| FilterError::InvalidOperand {
        entity: entity.into(),
        property: property.into(),
        reason,
    };
    let unknown = |operator: String| FilterError::UnknownOperator {
        entity: entity.into(),
        property: property.into(),
        operator,
    };

    let (operator, operand) = match value {
        Value::Object(object) => {
            let mut keys = object.iter();
            let (key, operand) = match (keys.next(), keys.next()) {
                (Some(entry), None) => entry,
                (None, _) => return Err(unknown(value.to_string())),
                (Some(_), Some(_)) => {
                    if let Some(key) = object.keys().find(|k| Operator::from_key(k).is_none()) {
                        return Err(unknown(key.clone()));
                    }
                    return Err(invalid(format!(
                        "expected exactly one operator, got {}",
                        object.len()
                    )));
                }
            };
            let operator = Operator::from_key(key).ok_or_else(|| unknown(key.clone()))?;
            (operator, operand)
        }
        Value::Array(_) => (Operator::In, value),
        _ => (Operator::Eq, value),
    };

    let operand = match (operand, operator.arity()) {
        (Value::Null, _) => Operand::Null,
        (value, Arity::Scalar) => Operand::Scalar(
            scalar(value).map_err(|reason| invalid(format!("{} expects a scalar, {}", operator, reason)))?,
        ),
        (Value::Array(values), Arity::List) => Operand::List(
            values
                .iter()
                .map(scalar)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|reason| invalid(format!("{} expects a list of scalars, {}", operator, reason)))?,
        ),
        (Value::Array(values), Arity::Pair) => match values.as_slice() {
            [low, high] => match (scalar(low), scalar(high)) {
                (Ok(low), Ok(high)) => Operand::Pair(low, high),
                (Err(reason), _) | (_, Err(reason)) => {
                    return Err(invalid(format!("{} bounds must be scalars, {}", operator, reason)))
                }
            },
            _ => {
                return Err(invalid(format!(
                    "{} expects exactly two bounds, got {}",
                    operator,
                    values.len()
                )))
            }
        },
        (other, _) => {
            return Err(invalid(format!(
                "{} expects an array, got {}",
                operator,
                kind_of(other)
            )))
        }
    };

    Ok(Comparison::new(property, operator, operand))
}

/// Integers must fit in `i64`; only numbers written with a fraction or
/// exponent become floats.
fn scalar(value: &Value) -> Result<Literal, String> {
    match value {
        Value::Null => Ok(Literal::Null),
        Value::Bool(b) => Ok(Literal::Bool(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Literal::Int(i))
            } else if n.is_f64() {
                n.as_f64()
                    .map(Literal::Float)
                    .ok_or_else(|| format!("number {} is not representable", n))
            } else {
                Err(format!("integer {} is out of range", n))
            }
        }
        Value::String(s) => Ok(Literal::String(s.clone())),
        other => Err(format!("got {}", kind_of(other))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn invalid_filter(entity: &str, reason: String) -> FilterError {
    FilterError::InvalidFilter {
        entity: entity.into(),
        reason,
    }
}
