//! Configuration module for relfilter.
//!
//! Handles datasource dialects, filter settings and environment variables.

mod settings;

pub use settings::{
    expand_env_vars, CaseFolding, DatasourceSettings, EntityFilterSettings, FilterSettings,
    ResolvedFilterSettings, Settings, SettingsError,
};
