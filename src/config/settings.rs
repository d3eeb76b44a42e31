//! TOML-based configuration for relfilter.
//!
//! Supports a config file (relfilter.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! schema = "${RELFILTER_HOME}/schema.toml"
//!
//! [datasources.db]
//! dialect = "postgres"
//! default_schema = "public"
//! case_folding = "lower"
//!
//! [filter]
//! enabled = true
//! reject_unknown_properties = false
//!
//! [filter.entities.Book]
//! reject_unknown_properties = true
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::sql::{Dialect, SqlDialect};

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Path to the schema file (supports ${ENV_VAR} expansion).
    pub schema: Option<String>,

    /// Named datasources, keyed by the id entities refer to.
    pub datasources: HashMap<String, DatasourceSettings>,

    /// Relation filter behaviour.
    pub filter: FilterSettings,
}

/// How identifiers are cased before quoting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseFolding {
    /// Lower-case table and column names.
    Lower,
    /// Use names exactly as declared.
    #[default]
    Preserve,
}

impl CaseFolding {
    pub fn apply(self, ident: &str) -> String {
        match self {
            CaseFolding::Lower => ident.to_lowercase(),
            CaseFolding::Preserve => ident.to_string(),
        }
    }
}

/// Datasource configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatasourceSettings {
    /// SQL dialect spoken by this datasource.
    pub dialect: Dialect,

    /// Schema that qualifies tables which do not name their own.
    #[serde(default)]
    pub default_schema: Option<String>,

    /// Identifier casing. Defaults to the dialect's folding rule.
    #[serde(default)]
    pub case_folding: Option<CaseFolding>,
}

impl DatasourceSettings {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            default_schema: None,
            case_folding: None,
        }
    }

    pub fn with_default_schema(mut self, schema: &str) -> Self {
        self.default_schema = Some(schema.into());
        self
    }

    pub fn with_case_folding(mut self, folding: CaseFolding) -> Self {
        self.case_folding = Some(folding);
        self
    }

    /// Effective identifier casing.
    pub fn case_folding(&self) -> CaseFolding {
        self.case_folding.unwrap_or(if self.dialect.folds_to_lower() {
            CaseFolding::Lower
        } else {
            CaseFolding::Preserve
        })
    }
}

/// Component-level relation filter settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterSettings {
    /// Whether relation filters are compiled at all.
    ///
    /// Defaults to `true`: callers reach the compiler explicitly, so an
    /// absent `[filter]` table means filtering is on. Set `enabled = false`
    /// to make every compilation fail with `FilterDisabled`.
    pub enabled: bool,

    /// Fail on keys that are neither properties nor relations.
    pub reject_unknown_properties: bool,

    /// Per-entity overrides; any value set here wins.
    pub entities: HashMap<String, EntityFilterSettings>,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            reject_unknown_properties: false,
            entities: HashMap::new(),
        }
    }
}

/// Per-entity override of [`FilterSettings`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EntityFilterSettings {
    pub enabled: Option<bool>,
    pub reject_unknown_properties: Option<bool>,
}

/// Filter settings after applying an entity's overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedFilterSettings {
    pub enabled: bool,
    pub reject_unknown_properties: bool,
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse settings from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `RELFILTER_CONFIG`
    /// 2. `./relfilter.toml`
    /// 3. `~/.config/relfilter/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("RELFILTER_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("relfilter.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("relfilter").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        // Return defaults if no config file found
        Ok(Settings::default())
    }

    /// Register a datasource.
    pub fn with_datasource(mut self, name: &str, datasource: DatasourceSettings) -> Self {
        self.datasources.insert(name.into(), datasource);
        self
    }

    /// Look up a datasource by id.
    pub fn datasource(&self, name: &str) -> Option<&DatasourceSettings> {
        self.datasources.get(name)
    }

    /// Filter settings for one entity, with its overrides applied.
    pub fn filter_for(&self, entity: &str) -> ResolvedFilterSettings {
        let overrides = self.filter.entities.get(entity);
        ResolvedFilterSettings {
            enabled: overrides
                .and_then(|o| o.enabled)
                .unwrap_or(self.filter.enabled),
            reject_unknown_properties: overrides
                .and_then(|o| o.reject_unknown_properties)
                .unwrap_or(self.filter.reject_unknown_properties),
        }
    }

    /// Schema file path with environment variables expanded.
    pub fn schema_path(&self) -> Result<Option<PathBuf>, SettingsError> {
        match &self.schema {
            Some(path) => Ok(Some(PathBuf::from(expand_env_vars(path)?))),
            None => Ok(None),
        }
    }

    fn validate(&self) -> Result<(), SettingsError> {
        for (name, datasource) in &self.datasources {
            if datasource.default_schema.as_deref() == Some("") {
                return Err(SettingsError::InvalidConfig(format!(
                    "datasource '{}' has an empty default_schema",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let var_name: String = if chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            chars.by_ref().take_while(|&ch| ch != '}').collect()
        } else {
            // $VAR ends at the first non-alphanumeric/underscore
            let mut name = String::new();
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                name.push(ch);
            }
            if name.is_empty() {
                // Just a lone $, keep it
                result.push('$');
                continue;
            }
            name
        };

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
