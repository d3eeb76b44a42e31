//! Filter planning: normalized [`Filter`] to joins and a predicate.
//!
//! Two passes over the same tree:
//! 1. Join collection: breadth-first over referenced relations, allocating
//!    one alias per joined table instance ([`JoinPlanner`])
//! 2. Predicate compilation: depth-first, mirroring the AND / OR nesting
//!    and reading aliases from the join plan ([`PredicateCompiler`])
//!
//! Both passes address clauses by [`ClausePath`]: the index of each clause
//! within its parent, where a filter's OR-clauses are numbered after its
//! AND-clauses and a relation's sub-filter continues its parent's path.

mod predicate;

pub use predicate::PredicateCompiler;

use std::collections::{HashMap, VecDeque};

use crate::alias::AliasProvider;
use crate::error::{FilterError, FilterResult};
use crate::filter::{Clause, Filter, RelationFilter};
use crate::schema::{Reflector, RelationDescriptor, RelationKind};
use crate::sql::{Expr, ExprExt, TableRef};

/// Position of a clause in the normalized tree.
pub type ClausePath = Vec<usize>;

/// Entity and alias a relation filter's predicate is evaluated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationTarget {
    pub entity: String,
    pub alias: String,
}

/// One INNER JOIN of the compiled query.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedJoin {
    /// Relation that caused the join, as `Entity.relation`.
    pub relation: String,
    /// Joined entity (the junction for the first hop of a through relation).
    pub entity: String,
    pub alias: String,
    pub table: TableRef,
    pub on: Expr,
}

/// Joins in discovery order plus the alias resolved for every relation
/// filter in the tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinPlan {
    joins: Vec<PlannedJoin>,
    targets: HashMap<ClausePath, RelationTarget>,
}

impl JoinPlan {
    pub fn joins(&self) -> &[PlannedJoin] {
        &self.joins
    }

    /// Target of the relation filter at `path`.
    pub fn target(&self, path: &[usize]) -> Option<&RelationTarget> {
        self.targets.get(path)
    }

    pub fn into_joins(self) -> Vec<PlannedJoin> {
        self.joins
    }
}

/// Relation filters that share joins: a repeated relation within one scope
/// reuses the first occurrence's alias.
type Scope<'f> = Vec<(ClausePath, &'f RelationFilter)>;

struct Level<'f> {
    entity: String,
    alias: String,
    filter: &'f Filter,
    path: ClausePath,
}

/// Collects the joins a filter needs.
pub struct JoinPlanner<'a> {
    reflector: Reflector<'a>,
}

impl<'a> JoinPlanner<'a> {
    pub fn new(reflector: Reflector<'a>) -> Self {
        Self { reflector }
    }

    /// Plan the joins of `filter` applied to `root` (aliased `root_alias`).
    ///
    /// Relations are visited level by level so that shallow joins are
    /// aliased before deep ones. Within a level, the AND-clauses form one
    /// scope, every nested group its own scope, and the OR-clauses another.
    pub fn plan(
        &self,
        root: &str,
        root_alias: &str,
        filter: &Filter,
        aliases: &mut AliasProvider,
    ) -> FilterResult<JoinPlan> {
        let mut plan = JoinPlan::default();
        let mut queue = VecDeque::from([Level {
            entity: root.to_string(),
            alias: root_alias.to_string(),
            filter,
            path: ClausePath::new(),
        }]);

        while let Some(level) = queue.pop_front() {
            for scope in scopes(level.filter, &level.path) {
                let mut joined: HashMap<&str, RelationTarget> = HashMap::new();

                for (path, relation_filter) in scope {
                    let name = relation_filter.relation.as_str();
                    let target = match joined.get(name) {
                        Some(target) => target.clone(),
                        None => {
                            let relation = self.reflector.relation(&level.entity, name)?;
                            let target = self.join(&level.entity, &level.alias, relation, aliases, &mut plan)?;
                            joined.insert(name, target.clone());
                            target
                        }
                    };

                    queue.push_back(Level {
                        entity: target.entity.clone(),
                        alias: target.alias.clone(),
                        filter: &relation_filter.filter,
                        path: path.clone(),
                    });
                    plan.targets.insert(path, target);
                }
            }
        }

        Ok(plan)
    }

    fn join(
        &self,
        source: &str,
        source_alias: &str,
        relation: &RelationDescriptor,
        aliases: &mut AliasProvider,
        plan: &mut JoinPlan,
    ) -> FilterResult<RelationTarget> {
        let label = format!("{}.{}", source, relation.name);

        match relation.kind {
            RelationKind::Direct => {
                self.ensure_same_datasource(source, relation, [relation.target.as_str()])?;

                let alias = aliases.alias(source, Some(&relation.name), None);
                let on = self
                    .reflector
                    .column_of(source, &relation.key_from, Some(source_alias))?
                    .eq(self
                        .reflector
                        .column_of(&relation.target, &relation.key_to, Some(&alias))?);
                plan.joins.push(PlannedJoin {
                    relation: label,
                    entity: relation.target.clone(),
                    alias: alias.clone(),
                    table: self.reflector.table_of(&relation.target)?.with_alias(&alias),
                    on,
                });

                Ok(RelationTarget {
                    entity: relation.target.clone(),
                    alias,
                })
            }
            RelationKind::Through => {
                let (junction, key_through) = match (&relation.through, &relation.key_through) {
                    (Some(junction), Some(key_through)) => (junction.as_str(), key_through.as_str()),
                    _ => {
                        return Err(FilterError::UnknownRelation {
                            entity: source.to_string(),
                            relation: relation.name.clone(),
                        })
                    }
                };
                self.ensure_same_datasource(source, relation, [junction, relation.target.as_str()])?;

                let junction_alias = aliases.alias(source, Some(&relation.name), Some(junction));
                let on = self
                    .reflector
                    .column_of(source, &relation.key_from, Some(source_alias))?
                    .eq(self
                        .reflector
                        .column_of(junction, &relation.key_to, Some(&junction_alias))?);
                plan.joins.push(PlannedJoin {
                    relation: label.clone(),
                    entity: junction.to_string(),
                    alias: junction_alias.clone(),
                    table: self.reflector.table_of(junction)?.with_alias(&junction_alias),
                    on,
                });

                let target = self.reflector.entity(&relation.target)?;
                let target_key = self
                    .reflector
                    .reverse_junction_key(source, relation)?
                    .unwrap_or(target.id_property.as_str());
                let alias = aliases.alias(source, Some(&relation.name), None);
                let on = self
                    .reflector
                    .column_of(junction, key_through, Some(&junction_alias))?
                    .eq(self
                        .reflector
                        .column_of(&relation.target, target_key, Some(&alias))?);
                plan.joins.push(PlannedJoin {
                    relation: label,
                    entity: relation.target.clone(),
                    alias: alias.clone(),
                    table: self.reflector.table_of(&relation.target)?.with_alias(&alias),
                    on,
                });

                Ok(RelationTarget {
                    entity: relation.target.clone(),
                    alias,
                })
            }
        }
    }

    fn ensure_same_datasource<'e>(
        &self,
        source: &str,
        relation: &RelationDescriptor,
        others: impl IntoIterator<Item = &'e str>,
    ) -> FilterResult<()> {
        let expected = self.reflector.datasource_of(source)?;
        for entity in others {
            let actual = self.reflector.datasource_of(entity)?;
            if actual != expected {
                log::warn!(
                    "Relation {}.{} crosses datasources {} and {}",
                    source,
                    relation.name,
                    expected,
                    actual
                );
                return Err(FilterError::UnsupportedDatasource {
                    datasource: actual.to_string(),
                    reason: format!(
                        "relation {}.{} joins {} (datasource \"{}\") from datasource \"{}\"",
                        source, relation.name, entity, actual, expected
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Relation filters of one level, grouped into join-sharing scopes.
fn scopes<'f>(filter: &'f Filter, base: &[usize]) -> Vec<Scope<'f>> {
    let mut scopes = Vec::new();
    collect(&filter.and, base, 0, &mut scopes);
    collect(&filter.or, base, filter.and.len(), &mut scopes);
    scopes
}

fn collect<'f>(clauses: &'f [Clause], base: &[usize], offset: usize, scopes: &mut Vec<Scope<'f>>) {
    let index = scopes.len();
    scopes.push(Scope::new());

    for (i, clause) in clauses.iter().enumerate() {
        let path = extend(base, offset + i);
        match clause {
            Clause::Leaf(_) => {}
            Clause::Relation(relation) => scopes[index].push((path, relation)),
            Clause::Group(group) => collect(&group.clauses, &path, 0, scopes),
        }
    }
}

fn extend(path: &[usize], index: usize) -> ClausePath {
    let mut path = path.to_vec();
    path.push(index);
    path
}
