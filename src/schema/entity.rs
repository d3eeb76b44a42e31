//! Entity and relation descriptors.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_datasource() -> String {
    "default".into()
}

fn default_id_property() -> String {
    "id".into()
}

/// A named entity: its storage location, properties and relations.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EntityDescriptor {
    /// Filled from the map key when loaded from a file.
    #[serde(default)]
    pub name: String,

    /// Table name; the entity name when absent.
    #[serde(default)]
    pub table: Option<String>,

    /// Database schema; the datasource's default when absent.
    #[serde(default)]
    pub schema: Option<String>,

    #[serde(default = "default_datasource")]
    pub datasource: String,

    #[serde(default = "default_id_property")]
    pub id_property: String,

    /// Declared properties, in declaration order.
    #[serde(default)]
    pub properties: Vec<String>,

    /// Column overrides for properties stored under a different name.
    #[serde(default)]
    pub columns: BTreeMap<String, String>,

    #[serde(default)]
    pub relations: BTreeMap<String, RelationDescriptor>,
}

impl EntityDescriptor {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            table: None,
            schema: None,
            datasource: default_datasource(),
            id_property: default_id_property(),
            properties: vec![],
            columns: BTreeMap::new(),
            relations: BTreeMap::new(),
        }
    }

    pub fn with_table(mut self, table: &str) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_schema(mut self, schema: &str) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_datasource(mut self, datasource: &str) -> Self {
        self.datasource = datasource.into();
        self
    }

    pub fn with_id_property(mut self, property: &str) -> Self {
        self.id_property = property.into();
        self
    }

    pub fn with_properties<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.properties.extend(properties.into_iter().map(Into::into));
        self
    }

    /// Store `property` in column `column`.
    pub fn with_column(mut self, property: &str, column: &str) -> Self {
        self.columns.insert(property.into(), column.into());
        self
    }

    pub fn with_relation(mut self, relation: RelationDescriptor) -> Self {
        self.relations.insert(relation.name.clone(), relation);
        self
    }

    /// Table name before case folding.
    pub fn table_name(&self) -> &str {
        self.table.as_deref().unwrap_or(&self.name)
    }

    /// Column name of `property` before case folding.
    pub fn column_name<'a>(&'a self, property: &'a str) -> &'a str {
        self.columns
            .get(property)
            .map(String::as_str)
            .unwrap_or(property)
    }

    /// The identifier property counts as declared even when not listed.
    pub fn has_property(&self, name: &str) -> bool {
        name == self.id_property || self.properties.iter().any(|p| p == name)
    }

    pub fn relation(&self, name: &str) -> Option<&RelationDescriptor> {
        self.relations.get(name)
    }
}

/// Relation shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// One foreign key hop (belongs-to, has-many, has-one).
    #[serde(alias = "belongs_to", alias = "has_many", alias = "has_one")]
    Direct,
    /// Two hops through a junction entity (many-to-many).
    #[serde(alias = "has_many_through", alias = "has_and_belongs_to_many")]
    Through,
}

/// A declared association from one entity to another.
///
/// `key_from` lives on the source entity. For a direct relation `key_to`
/// lives on the target; for a through relation both `key_to` and
/// `key_through` live on the junction, pointing back at the source and on
/// to the target respectively.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RelationDescriptor {
    /// Filled from the map key when loaded from a file.
    #[serde(default)]
    pub name: String,
    pub target: String,
    pub kind: RelationKind,
    pub key_from: String,
    pub key_to: String,
    #[serde(default)]
    pub through: Option<String>,
    #[serde(default)]
    pub key_through: Option<String>,
}

impl RelationDescriptor {
    /// One-hop relation joined on `source.key_from = target.key_to`.
    pub fn direct(name: &str, target: &str, key_from: &str, key_to: &str) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            kind: RelationKind::Direct,
            key_from: key_from.into(),
            key_to: key_to.into(),
            through: None,
            key_through: None,
        }
    }

    /// Many-to-many relation mediated by `junction`.
    pub fn through(
        name: &str,
        target: &str,
        junction: &str,
        key_from: &str,
        key_to: &str,
        key_through: &str,
    ) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            kind: RelationKind::Through,
            key_from: key_from.into(),
            key_to: key_to.into(),
            through: Some(junction.into()),
            key_through: Some(key_through.into()),
        }
    }
}
