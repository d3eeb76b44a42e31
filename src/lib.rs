//! # relfilter
//!
//! Compiles nested relation filters into a single SQL statement that
//! selects the identifiers of matching root entities.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │              Raw JSON filter on an entity                │
//! │   { authors: { lastName: { ilike: "orwe%" } }, or: [..] }│
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [filter::Normalizer + schema::Reflector]
//! ┌─────────────────────────────────────────────────────────┐
//! │        Filter (AND / OR clauses: Leaf, Relation, Group)  │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [planner::JoinPlanner + alias::AliasProvider]
//! ┌─────────────────────────────────────────────────────────┐
//! │          JoinPlan (aliased INNER JOINs, breadth-first)   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [planner::PredicateCompiler]
//! ┌─────────────────────────────────────────────────────────┐
//! │  sql::Query  →  CompiledQuery (SQL text + bound params)  │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod alias;
pub mod compile;
pub mod config;
pub mod error;
pub mod filter;
pub mod planner;
pub mod schema;
pub mod sql;

pub use compile::{restrict_to_identifiers, CompileOptions, CompiledQuery, QueryCompiler};
pub use error::{FilterError, FilterResult};
pub use schema::{Schema, SchemaError, SchemaSource};
pub use sql::Dialect;
