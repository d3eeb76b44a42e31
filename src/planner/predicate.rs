//! Depth-first predicate compilation.

use super::{ClausePath, JoinPlan};
use crate::error::{FilterError, FilterResult};
use crate::filter::{Clause, Comparison, Filter, GroupKind, Operand, Operator};
use crate::schema::Reflector;
use crate::sql::{lit_int, param, BinaryOperator, Expr, ExprExt, Literal};

/// Compiles a normalized filter into a WHERE expression, using the aliases
/// resolved by a [`JoinPlan`].
pub struct PredicateCompiler<'a> {
    reflector: Reflector<'a>,
    plan: &'a JoinPlan,
}

impl<'a> PredicateCompiler<'a> {
    pub fn new(reflector: Reflector<'a>, plan: &'a JoinPlan) -> Self {
        Self { reflector, plan }
    }

    /// Predicate for the root filter, or `None` when nothing constrains it.
    ///
    /// A top-level disjunction is parenthesized.
    pub fn compile(&self, entity: &str, alias: &str, filter: &Filter) -> FilterResult<Option<Expr>> {
        Ok(self
            .filter(entity, alias, filter, &[])?
            .map(|expr| if expr.is_disjunction() { paren(expr) } else { expr }))
    }

    fn filter(
        &self,
        entity: &str,
        alias: &str,
        filter: &Filter,
        base: &[usize],
    ) -> FilterResult<Option<Expr>> {
        let and_len = filter.and.len();
        let conjuncts = self.clauses(entity, alias, &filter.and, base, 0)?;
        let disjuncts = self.clauses(entity, alias, &filter.or, base, and_len)?;

        let mut parts = conjuncts.constrained;
        parts.extend(disjunction(disjuncts));
        Ok(combine(BinaryOperator::And, parts))
    }

    fn clause(
        &self,
        entity: &str,
        alias: &str,
        clause: &Clause,
        path: &[usize],
    ) -> FilterResult<Option<Expr>> {
        match clause {
            Clause::Leaf(comparison) => self.comparison(entity, alias, comparison),
            Clause::Relation(relation) => {
                let target = self.plan.target(path).ok_or_else(|| FilterError::UnknownRelation {
                    entity: entity.to_string(),
                    relation: relation.relation.clone(),
                })?;
                self.filter(&target.entity, &target.alias, &relation.filter, path)
            }
            Clause::Group(group) => {
                let parts = self.clauses(entity, alias, &group.clauses, path, 0)?;
                Ok(match group.kind {
                    GroupKind::And => combine(BinaryOperator::And, parts.constrained),
                    GroupKind::Or => disjunction(parts),
                })
            }
        }
    }

    /// Compile sibling clauses, numbering their paths from `offset`.
    fn clauses(
        &self,
        entity: &str,
        alias: &str,
        clauses: &[Clause],
        base: &[usize],
        offset: usize,
    ) -> FilterResult<Parts> {
        let mut parts = Parts::default();
        for (i, clause) in clauses.iter().enumerate() {
            match self.clause(entity, alias, clause, &extend(base, offset + i))? {
                Some(expr) => parts.constrained.push(expr),
                None => parts.unconstrained = true,
            }
        }
        Ok(parts)
    }

    fn comparison(&self, entity: &str, alias: &str, comparison: &Comparison) -> FilterResult<Option<Expr>> {
        if comparison.is_noop() {
            return Ok(None);
        }

        let column = self
            .reflector
            .column_of(entity, &comparison.property, Some(alias))?;
        let mismatch = || FilterError::InvalidOperand {
            entity: entity.to_string(),
            property: comparison.property.clone(),
            reason: format!("operand does not fit operator {}", comparison.operator),
        };

        let expr = match (&comparison.operator, &comparison.operand) {
            (Operator::In, Operand::List(values)) if values.is_empty() => lit_int(1).eq(lit_int(0)),
            (Operator::NotIn, Operand::List(values)) if values.is_empty() => return Ok(None),
            (Operator::In, Operand::List(values)) => column.in_list(params(values)),
            (Operator::NotIn, Operand::List(values)) => column.not_in_list(params(values)),
            (Operator::Between, Operand::Pair(low, high)) => {
                column.between(param(low.clone()), param(high.clone()))
            }
            (op, Operand::Scalar(value)) => {
                let value = param(value.clone());
                match op {
                    Operator::Eq => column.eq(value),
                    Operator::Neq => column.ne(value),
                    Operator::Lt => column.lt(value),
                    Operator::Lte => column.lte(value),
                    Operator::Gt => column.gt(value),
                    Operator::Gte => column.gte(value),
                    Operator::Like => column.like(value),
                    Operator::ILike => column.ilike(value),
                    Operator::NotLike => column.not_like(value),
                    Operator::NotILike => column.not_ilike(value),
                    Operator::In | Operator::NotIn | Operator::Between => return Err(mismatch()),
                }
            }
            _ => return Err(mismatch()),
        };

        Ok(Some(expr))
    }
}

/// Predicates of sibling clauses. A clause without a predicate matches
/// every row: it is dropped from a conjunction and satisfies a disjunction.
#[derive(Default)]
struct Parts {
    constrained: Vec<Expr>,
    unconstrained: bool,
}

fn disjunction(parts: Parts) -> Option<Expr> {
    if parts.unconstrained {
        return None;
    }
    combine(BinaryOperator::Or, parts.constrained)
}

/// Fold `parts` with `op`, parenthesizing nested AND / OR operands.
fn combine(op: BinaryOperator, parts: Vec<Expr>) -> Option<Expr> {
    if parts.len() <= 1 {
        return parts.into_iter().next();
    }

    parts
        .into_iter()
        .map(|part| if part.is_compound() { paren(part) } else { part })
        .reduce(|left, right| left.binary(op, right))
}

fn paren(expr: Expr) -> Expr {
    Expr::Paren(Box::new(expr))
}

fn params(values: &[Literal]) -> Vec<Expr> {
    values.iter().cloned().map(param).collect()
}

fn extend(path: &[usize], index: usize) -> ClausePath {
    let mut path = path.to_vec();
    path.push(index);
    path
}
