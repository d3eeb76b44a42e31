//! Errors raised while normalizing and compiling a filter.
//!
//! Every failure is immediate: compilation either produces a complete
//! statement or one of these errors, never partial SQL.

/// Errors that can occur during filter normalization and compilation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FilterError {
    /// A key is neither a declared property nor a declared relation.
    #[error("Unknown property \"{entity}.{property}\" queried in ({fragment}).")]
    UnknownProperty {
        entity: String,
        property: String,
        /// The offending sub-filter, rendered as JSON.
        fragment: String,
    },

    #[error("Unknown operator \"{operator}\" used on \"{entity}.{property}\"")]
    UnknownOperator {
        entity: String,
        property: String,
        operator: String,
    },

    #[error("Invalid operand for \"{entity}.{property}\": {reason}")]
    InvalidOperand {
        entity: String,
        property: String,
        reason: String,
    },

    #[error("Invalid filter on {entity}: {reason}")]
    InvalidFilter { entity: String, reason: String },

    /// The root datasource has no dialect, or a join would cross datasources.
    #[error("Unsupported datasource \"{datasource}\": {reason}")]
    UnsupportedDatasource { datasource: String, reason: String },

    #[error("Relation \"{relation}\" is not declared on {entity}")]
    UnknownRelation { entity: String, relation: String },

    #[error("Entity not found: {0}")]
    UnknownEntity(String),

    #[error("Relation filtering is disabled for {0}")]
    FilterDisabled(String),
}

impl FilterError {
    /// HTTP-style status for the API boundary that surfaces this error.
    ///
    /// Unknown properties map to 409, other malformed input to 400, and
    /// schema desynchronization to 500.
    pub fn status_code(&self) -> u16 {
        match self {
            FilterError::UnknownProperty { .. } => 409,
            FilterError::UnknownOperator { .. }
            | FilterError::InvalidOperand { .. }
            | FilterError::InvalidFilter { .. }
            | FilterError::UnsupportedDatasource { .. }
            | FilterError::UnknownEntity(_)
            | FilterError::FilterDisabled(_) => 400,
            FilterError::UnknownRelation { .. } => 500,
        }
    }
}

pub type FilterResult<T> = Result<T, FilterError>;
