//! Entity registry consulted while normalizing and compiling filters.
//!
//! Hosts that already own model metadata implement [`SchemaSource`];
//! everyone else can load a [`Schema`] from a TOML or JSON file:
//!
//! ```toml
//! [entities.Book]
//! datasource = "db"
//! properties = ["id", "title", "publisherId"]
//!
//! [entities.Book.relations.publisher]
//! kind = "belongs_to"
//! target = "Publisher"
//! key_from = "publisherId"
//! key_to = "id"
//!
//! [entities.Book.relations.authors]
//! kind = "through"
//! target = "Author"
//! through = "AuthorBook"
//! key_from = "id"
//! key_to = "bookId"
//! key_through = "authorId"
//! ```

mod entity;
mod reflector;

#[cfg(test)]
pub(crate) mod test_utils;

pub use entity::{EntityDescriptor, RelationDescriptor, RelationKind};
pub use reflector::Reflector;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Error type for schema loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Schema file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read schema file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse schema TOML: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Failed to parse schema JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unsupported schema file format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("Invalid relation {entity}.{relation}: {reason}")]
    InvalidRelation {
        entity: String,
        relation: String,
        reason: String,
    },
}

/// Source of entity metadata.
///
/// Implementations must be shareable across threads: compilations run
/// concurrently against one registry.
pub trait SchemaSource: Send + Sync {
    fn entity(&self, name: &str) -> Option<&EntityDescriptor>;
}

/// In-memory entity registry.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Schema {
    #[serde(default)]
    pub entities: BTreeMap<String, EntityDescriptor>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity under its own name.
    pub fn with_entity(mut self, entity: EntityDescriptor) -> Self {
        self.entities.insert(entity.name.clone(), entity);
        self
    }

    /// Parse a schema from TOML text and validate it.
    pub fn from_toml_str(content: &str) -> Result<Self, SchemaError> {
        let schema: Schema = toml::from_str(content)?;
        schema.finish()
    }

    /// Parse a schema from JSON text and validate it.
    pub fn from_json_str(content: &str) -> Result<Self, SchemaError> {
        let schema: Schema = serde_json::from_str(content)?;
        schema.finish()
    }

    /// Load a schema file, choosing the format by extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SchemaError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            Some("json") => Self::from_json_str(&content),
            _ => Err(SchemaError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Check that every relation points at declared entities and that
    /// through relations name their junction and far key.
    pub fn validate(&self) -> Result<(), SchemaError> {
        for entity in self.entities.values() {
            for relation in entity.relations.values() {
                let invalid = |reason: String| SchemaError::InvalidRelation {
                    entity: entity.name.clone(),
                    relation: relation.name.clone(),
                    reason,
                };

                if !self.entities.contains_key(&relation.target) {
                    return Err(invalid(format!(
                        "target entity '{}' is not declared",
                        relation.target
                    )));
                }

                if relation.kind == RelationKind::Through {
                    let junction = relation
                        .through
                        .as_deref()
                        .ok_or_else(|| invalid("through relation without a junction".into()))?;
                    if !self.entities.contains_key(junction) {
                        return Err(invalid(format!(
                            "junction entity '{}' is not declared",
                            junction
                        )));
                    }
                    if relation.key_through.is_none() {
                        return Err(invalid("through relation without key_through".into()));
                    }
                }
            }
        }
        Ok(())
    }

    /// Fill names from map keys, then validate.
    fn finish(mut self) -> Result<Self, SchemaError> {
        for (name, entity) in self.entities.iter_mut() {
            entity.name = name.clone();
            for (relation_name, relation) in entity.relations.iter_mut() {
                relation.name = relation_name.clone();
            }
        }
        self.validate()?;
        Ok(self)
    }
}

impl SchemaSource for Schema {
    fn entity(&self, name: &str) -> Option<&EntityDescriptor> {
        self.entities.get(name)
    }
}
