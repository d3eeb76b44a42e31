//! End-to-end compilation from a raw relation filter to SQL.
//!
//! ```text
//! JSON filter → Normalize → Plan joins → Compile predicate → SELECT id ... GROUP BY id
//! ```
//!
//! # Example
//!
//! ```ignore
//! use relfilter::compile::QueryCompiler;
//! use serde_json::json;
//!
//! let compiler = QueryCompiler::new(&schema, &settings);
//! let compiled = compiler.compile(
//!     "Book",
//!     &json!({ "authors": { "lastName": { "ilike": "orwe%" } } }),
//! )?;
//!
//! // SELECT "book"."id" FROM ... WHERE "book_authors"."lastname" ILIKE $1 GROUP BY "book"."id"
//! let rows = connection.query(compiled.sql(), compiled.params())?;
//! ```

use serde_json::Value;

use crate::alias::AliasProvider;
use crate::config::Settings;
use crate::error::{FilterError, FilterResult};
use crate::filter::{Filter, Normalizer};
use crate::planner::{JoinPlanner, PlannedJoin, PredicateCompiler};
use crate::schema::{Reflector, SchemaSource};
use crate::sql::{Dialect, Literal, Query};

// ============================================================================
// Options
// ============================================================================

/// Per-compiler overrides of the configured filter settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileOptions {
    /// Overrides `reject_unknown_properties` for every entity.
    pub reject_unknown_properties: Option<bool>,
}

impl CompileOptions {
    pub fn with_reject_unknown_properties(mut self, reject: bool) -> Self {
        self.reject_unknown_properties = Some(reject);
        self
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// A compiled filter statement.
///
/// The statement selects the identifier of every root entity that matches
/// the filter. Operands are bound: execute [`sql`](Self::sql) with
/// [`params`](Self::params).
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    dialect: Dialect,
    root_alias: String,
    query: Query,
    joins: Vec<PlannedJoin>,
    sql: String,
    params: Vec<Literal>,
}

impl CompiledQuery {
    /// SQL text with dialect placeholders.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Bound operands, in placeholder order.
    pub fn params(&self) -> &[Literal] {
        &self.params
    }

    /// SQL text with operands rendered in place. For diagnostics only.
    pub fn to_inline_sql(&self) -> String {
        self.query.to_sql(self.dialect)
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn root_alias(&self) -> &str {
        &self.root_alias
    }

    pub fn joins(&self) -> &[PlannedJoin] {
        &self.joins
    }
}

impl std::fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_inline_sql())
    }
}

// ============================================================================
// Compiler
// ============================================================================

/// Compiles relation filters against a schema.
///
/// Holds only shared references; every call builds its own alias provider
/// and query, so one compiler can serve concurrent requests.
#[derive(Clone, Copy)]
pub struct QueryCompiler<'a> {
    source: &'a dyn SchemaSource,
    settings: &'a Settings,
    options: CompileOptions,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(source: &'a dyn SchemaSource, settings: &'a Settings) -> Self {
        Self {
            source,
            settings,
            options: CompileOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn reflector(&self) -> Reflector<'a> {
        Reflector::new(self.source, self.settings)
    }

    /// Whether relation filters may be compiled for `entity`.
    pub fn is_enabled(&self, entity: &str) -> bool {
        self.settings.filter_for(entity).enabled
    }

    /// Normalize `raw` against `entity` using the effective rejection rule.
    pub fn normalize(&self, entity: &str, raw: &Value) -> FilterResult<Filter> {
        let reject = self
            .options
            .reject_unknown_properties
            .unwrap_or(self.settings.filter_for(entity).reject_unknown_properties);

        Normalizer::new(self.reflector())
            .reject_unknown_properties(reject)
            .normalize(entity, raw)
    }

    /// Compile a raw filter on `entity`.
    pub fn compile(&self, entity: &str, raw: &Value) -> FilterResult<CompiledQuery> {
        if !self.is_enabled(entity) {
            return Err(FilterError::FilterDisabled(entity.to_string()));
        }
        let filter = self.normalize(entity, raw)?;
        self.compile_normalized(entity, &filter)
    }

    /// Compile an already normalized filter on `entity`.
    pub fn compile_normalized(&self, entity: &str, filter: &Filter) -> FilterResult<CompiledQuery> {
        let reflector = self.reflector();
        let descriptor = reflector.entity(entity)?;
        let dialect = reflector
            .datasource_settings(entity)?
            .map(|ds| ds.dialect)
            .ok_or_else(|| FilterError::UnsupportedDatasource {
                datasource: descriptor.datasource.clone(),
                reason: "no SQL dialect is configured for it".into(),
            })?;

        log::debug!("Compiling relation filter on {} for {}", entity, dialect);

        let mut aliases = AliasProvider::new();
        let root_alias = aliases.alias(entity, None, None);

        let plan = JoinPlanner::new(reflector).plan(entity, &root_alias, filter, &mut aliases)?;
        let predicate = PredicateCompiler::new(reflector, &plan).compile(entity, &root_alias, filter)?;

        let id = reflector.column_of(entity, &descriptor.id_property, Some(&root_alias))?;
        let mut query = Query::new()
            .select(vec![id.clone()])
            .from(reflector.table_of(entity)?.with_alias(&root_alias));

        let joins = plan.into_joins();
        for join in &joins {
            log::trace!("Joining {} AS {} for {}", join.entity, join.alias, join.relation);
            query = query.inner_join(join.table.clone(), join.on.clone());
        }
        if let Some(predicate) = predicate {
            query = query.filter(predicate);
        }
        let query = query.group_by(vec![id]);

        let (sql, params) = query.to_parameterized(dialect);
        Ok(CompiledQuery {
            dialect,
            root_alias,
            query,
            joins,
            sql,
            params,
        })
    }
}

impl std::fmt::Debug for QueryCompiler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCompiler")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Filter restricting `id_property` to the identifiers a compiled statement
/// returned: `{"<id_property>": {"inq": [...]}}`.
pub fn restrict_to_identifiers<I, V>(id_property: &str, ids: I) -> Value
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let ids: Vec<Value> = ids.into_iter().map(Into::into).collect();
    let mut operand = serde_json::Map::new();
    operand.insert("inq".into(), Value::Array(ids));
    let mut filter = serde_json::Map::new();
    filter.insert(id_property.into(), Value::Object(operand));
    Value::Object(filter)
}
