//! Read-only questions about entities: naming, properties and relations.

use super::{EntityDescriptor, RelationDescriptor, RelationKind, SchemaSource};
use crate::config::{CaseFolding, DatasourceSettings, Settings};
use crate::error::{FilterError, FilterResult};
use crate::sql::{schema_col, table_col, Expr, TableRef};

/// Adapter over a [`SchemaSource`] that resolves storage names using the
/// datasource settings (default schema, identifier casing).
#[derive(Clone, Copy)]
pub struct Reflector<'a> {
    source: &'a dyn SchemaSource,
    settings: &'a Settings,
}

impl<'a> Reflector<'a> {
    pub fn new(source: &'a dyn SchemaSource, settings: &'a Settings) -> Self {
        Self { source, settings }
    }

    pub fn entity(&self, name: &str) -> FilterResult<&'a EntityDescriptor> {
        self.source
            .entity(name)
            .ok_or_else(|| FilterError::UnknownEntity(name.to_string()))
    }

    pub fn datasource_of(&self, entity: &str) -> FilterResult<&'a str> {
        Ok(self.entity(entity)?.datasource.as_str())
    }

    /// Settings of the entity's datasource, if configured.
    pub fn datasource_settings(&self, entity: &str) -> FilterResult<Option<&'a DatasourceSettings>> {
        let datasource = self.datasource_of(entity)?;
        Ok(self.settings.datasource(datasource))
    }

    /// Identifier casing for the entity's datasource.
    pub fn case_folding(&self, entity: &str) -> FilterResult<CaseFolding> {
        Ok(self
            .datasource_settings(entity)?
            .map(DatasourceSettings::case_folding)
            .unwrap_or_default())
    }

    /// Schema-qualified table of `entity`, without an alias.
    pub fn table_of(&self, entity: &str) -> FilterResult<TableRef> {
        let descriptor = self.entity(entity)?;
        let folding = self.case_folding(entity)?;
        let table = TableRef::new(&folding.apply(descriptor.table_name()));

        Ok(match self.schema_of(descriptor) {
            Some(schema) => table.with_schema(schema),
            None => table,
        })
    }

    /// Column of `property`: `alias.column` when an alias is given,
    /// `schema.table.column` otherwise.
    pub fn column_of(&self, entity: &str, property: &str, alias: Option<&str>) -> FilterResult<Expr> {
        let descriptor = self.entity(entity)?;
        let folding = self.case_folding(entity)?;
        let column = folding.apply(descriptor.column_name(property));

        Ok(match alias {
            Some(alias) => table_col(alias, &column),
            None => schema_col(
                self.schema_of(descriptor),
                &folding.apply(descriptor.table_name()),
                &column,
            ),
        })
    }

    pub fn is_property(&self, entity: &str, name: &str) -> bool {
        self.source
            .entity(entity)
            .is_some_and(|e| e.has_property(name))
    }

    pub fn is_relation(&self, entity: &str, name: &str) -> bool {
        self.source
            .entity(entity)
            .is_some_and(|e| e.relation(name).is_some())
    }

    pub fn relation(&self, entity: &str, name: &str) -> FilterResult<&'a RelationDescriptor> {
        self.entity(entity)?
            .relation(name)
            .ok_or_else(|| FilterError::UnknownRelation {
                entity: entity.to_string(),
                relation: name.to_string(),
            })
    }

    /// Property on the target that the junction's far key references.
    ///
    /// Found through a relation declared on the target that uses the same
    /// junction and points back at `source`. `None` when the association is
    /// only declared one way; callers then join on the target's identifier.
    pub fn reverse_junction_key(
        &self,
        source: &str,
        relation: &RelationDescriptor,
    ) -> FilterResult<Option<&'a str>> {
        if relation.kind != RelationKind::Through {
            return Ok(None);
        }

        let target = self.entity(&relation.target)?;
        let reverse = target.relations.values().find(|candidate| {
            candidate.kind == RelationKind::Through
                && candidate.through == relation.through
                && candidate.target == source
        });

        Ok(reverse.map(|r| r.key_from.as_str()))
    }

    fn schema_of(&self, descriptor: &'a EntityDescriptor) -> Option<&'a str> {
        descriptor.schema.as_deref().or_else(|| {
            self.settings
                .datasource(&descriptor.datasource)
                .and_then(|ds| ds.default_schema.as_deref())
        })
    }
}

impl std::fmt::Debug for Reflector<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reflector").finish_non_exhaustive()
    }
}
