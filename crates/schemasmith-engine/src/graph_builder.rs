//! Schema graph builder
//!
//! Projects the logical model onto emitted names and applies a decision
//! set, producing a detached `SchemaGraph`. Nothing here touches the file
//! system; errors are caller defects, never data conditions.

use std::collections::HashMap;

use schemasmith_core::graph::{Column, ForeignKey, Index, Table};
use schemasmith_core::model::{Attribute, Entity, Module};
use schemasmith_core::{
    AttributeId, BuildOptions, DecisionSet, EntityRef, IndexId, LogicalSchemaModel, OnDelete, QualifiedName,
    SchemaGraph, TableId,
};

/// Invalid-argument errors: the decision set or options do not fit the model
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("No column decision for '{0}'")]
    MissingColumnDecision(String),

    #[error("No index decision for '{0}'")]
    MissingIndexDecision(String),

    #[error("No relationship decision for '{0}'")]
    MissingRelationshipDecision(String),

    #[error("Reference from '{attribute}' targets unknown entity '{target}'")]
    UnknownReferenceTarget { attribute: String, target: String },

    #[error("Reference from '{attribute}' targets '{target}', which has no single-column primary key")]
    TargetWithoutPrimaryKey { attribute: String, target: String },

    #[error("Index '{index}' names unknown attribute '{attribute}'")]
    UnknownIndexAttribute { index: String, attribute: String },

    #[error("Platform auto-index '{index}': decisions and build options disagree (options include it: {included})")]
    PlatformIndexDisagreement { index: String, included: bool },

    #[error("Default '{value}' of '{attribute}' is not a {data_type} literal")]
    InvalidDefault {
        attribute: String,
        value: String,
        data_type: String,
    },

    #[error("Entities '{first}' and '{second}' both emit table '{name}'")]
    DuplicateEmittedName { name: String, first: String, second: String },

    #[error("Relationship '{attribute}' has an ignored delete rule but was decided as created")]
    IgnoredRuleCreated { attribute: String },
}

/// Emitted identity of one entity, resolved before any table is built
struct Resolved {
    id: TableId,
    name: QualifiedName,
    primary_key: Vec<String>,
}

/// Builds a `SchemaGraph` from a model and its decisions
pub struct GraphBuilder<'a> {
    model: &'a LogicalSchemaModel,
    decisions: &'a DecisionSet,
    options: &'a BuildOptions,

    /// One entry per entity, in model order
    resolved: Vec<Resolved>,
    by_entity: HashMap<EntityRef, TableId>,
}

impl<'a> GraphBuilder<'a> {
    /// Build the graph in one call
    pub fn build(
        model: &'a LogicalSchemaModel,
        decisions: &'a DecisionSet,
        options: &'a BuildOptions,
    ) -> Result<SchemaGraph, BuildError> {
        let mut builder = Self {
            model,
            decisions,
            options,
            resolved: Vec::new(),
            by_entity: HashMap::new(),
        };
        builder.resolve_names()?;
        builder.build_tables()
    }

    /// First pass: ids, emitted table names and primary keys for every entity
    ///
    /// Emitted names must be unique, case-insensitively on schema and name.
    fn resolve_names(&mut self) -> Result<(), BuildError> {
        let mut claimed: HashMap<(String, String), EntityRef> = HashMap::new();

        for (position, (module, entity)) in self.model.entities().enumerate() {
            let primary_key = entity
                .identifiers()
                .filter(|a| a.is_active)
                .map(|a| self.column_name(module, entity, a))
                .collect();
            let name = self.table_name(module, entity);
            let key = EntityRef::new(&module.name, &entity.logical_name);

            let folded = (name.schema.to_lowercase(), name.name.to_lowercase());
            if let Some(first) = claimed.get(&folded) {
                return Err(BuildError::DuplicateEmittedName {
                    name: name.to_string(),
                    first: first.to_string(),
                    second: key.to_string(),
                });
            }
            claimed.insert(folded, key.clone());

            let id = TableId(position);
            self.by_entity.insert(key, id);
            self.resolved.push(Resolved { id, name, primary_key });
        }

        Ok(())
    }

    fn build_tables(&self) -> Result<SchemaGraph, BuildError> {
        let mut tables = Vec::with_capacity(self.resolved.len());

        for ((module, entity), resolved) in self.model.entities().zip(&self.resolved) {
            tables.push(self.build_table(module, entity, resolved)?);
        }

        tracing::debug!(tables = tables.len(), "schema graph built");
        Ok(SchemaGraph::from_tables(tables))
    }

    fn build_table(&self, module: &Module, entity: &Entity, resolved: &Resolved) -> Result<Table, BuildError> {
        let mut columns = Vec::new();
        let mut foreign_keys = Vec::new();

        for attribute in &entity.attributes {
            let id = AttributeId::new(&module.name, &entity.logical_name, &attribute.logical_name);
            let decision = self
                .decisions
                .column(&id)
                .ok_or_else(|| BuildError::MissingColumnDecision(id.to_string()))?;

            if !attribute.is_active {
                continue;
            }

            let name = self.column_name(module, entity, attribute);

            if let Some(reference) = &attribute.reference {
                let relationship = self
                    .decisions
                    .relationship(&id)
                    .ok_or_else(|| BuildError::MissingRelationshipDecision(id.to_string()))?;

                if relationship.creates() {
                    let on_delete = OnDelete::from_rule(reference.delete_rule)
                        .ok_or_else(|| BuildError::IgnoredRuleCreated { attribute: id.to_string() })?;
                    let target = self
                        .by_entity
                        .get(&reference.target)
                        .and_then(|table| self.resolved.get(table.0))
                        .ok_or_else(|| BuildError::UnknownReferenceTarget {
                            attribute: id.to_string(),
                            target: reference.target.to_string(),
                        })?;
                    if target.primary_key.len() != 1 {
                        return Err(BuildError::TargetWithoutPrimaryKey {
                            attribute: id.to_string(),
                            target: reference.target.to_string(),
                        });
                    }

                    foreign_keys.push(ForeignKey {
                        name: format!("FK_{}_{}", resolved.name.name, name),
                        columns: vec![name.clone()],
                        references: target.id,
                        referenced_table: target.name.clone(),
                        referenced_columns: target.primary_key.clone(),
                        on_delete,
                    });
                }
            }

            columns.push(Column {
                logical_name: attribute.logical_name.clone(),
                name,
                source_physical: attribute.physical_name.clone(),
                data_type: attribute.data_type.clone(),
                nullable: !decision.enforces_not_null(),
                default_value: default_value(&id, attribute)?,
                description: attribute.description.clone(),
            });
        }

        let mut indexes = Vec::new();
        for index in &entity.indexes {
            if let Some(built) = self.build_index(module, entity, &resolved.name, index)? {
                indexes.push(built);
            }
        }

        Ok(Table {
            id: resolved.id,
            module: module.name.clone(),
            logical_name: entity.logical_name.clone(),
            name: resolved.name.clone(),
            source_physical: entity.physical.as_ref().map(ToString::to_string),
            description: entity.description.clone(),
            columns,
            primary_key: resolved.primary_key.clone(),
            indexes,
            foreign_keys,
        })
    }

    fn build_index(
        &self,
        module: &Module,
        entity: &Entity,
        table: &QualifiedName,
        index: &schemasmith_core::model::Index,
    ) -> Result<Option<Index>, BuildError> {
        let id = IndexId::new(&module.name, &entity.logical_name, &index.name);
        let decision = self.decisions.index(&id);
        let included = self.options.include_platform_auto_indexes;

        if index.is_platform_auto && !included {
            if decision.is_some() {
                return Err(BuildError::PlatformIndexDisagreement {
                    index: id.to_string(),
                    included,
                });
            }
            return Ok(None);
        }

        let decision = match decision {
            Some(decision) => decision,
            None if index.is_platform_auto => {
                return Err(BuildError::PlatformIndexDisagreement {
                    index: id.to_string(),
                    included,
                })
            }
            None => return Err(BuildError::MissingIndexDecision(id.to_string())),
        };

        let mut columns = Vec::with_capacity(index.attributes.len());
        for name in &index.attributes {
            let attribute = entity.attribute(name).ok_or_else(|| BuildError::UnknownIndexAttribute {
                index: id.to_string(),
                attribute: name.clone(),
            })?;
            if !attribute.is_active {
                tracing::warn!(index = %id, attribute = %name, "index over inactive attribute pruned");
                return Ok(None);
            }
            columns.push(self.column_name(module, entity, attribute));
        }

        Ok(Some(Index {
            logical_name: index.name.clone(),
            name: format!("{}_{}", table.name, index.name),
            columns,
            unique: decision.enforces_unique(),
            platform_auto: index.is_platform_auto,
        }))
    }

    fn table_name(&self, module: &Module, entity: &Entity) -> QualifiedName {
        let key = format!("{}.{}", module.name, entity.logical_name);
        let rename = self.options.table_name(&key);

        let schema = rename
            .and_then(|r| r.schema.clone())
            .unwrap_or_else(|| self.options.default_schema.clone());
        let table = rename
            .and_then(|r| r.table.clone())
            .unwrap_or_else(|| entity.logical_name.clone());

        QualifiedName::new(schema, table)
    }

    fn column_name(&self, module: &Module, entity: &Entity, attribute: &Attribute) -> String {
        let key = format!("{}.{}.{}", module.name, entity.logical_name, attribute.logical_name);
        self.options
            .column_name(&key)
            .map_or_else(|| attribute.logical_name.clone(), str::to_string)
    }
}

/// Default value checked against the column type; blank non-text defaults are dropped
fn default_value(id: &AttributeId, attribute: &Attribute) -> Result<Option<String>, BuildError> {
    let data_type = &attribute.data_type;
    match &attribute.default_value {
        None => Ok(None),
        Some(value) if !data_type.is_textual() && value.trim().is_empty() => Ok(None),
        Some(value) => match data_type.default_literal(value) {
            Some(_) => Ok(Some(value.clone())),
            None => Err(BuildError::InvalidDefault {
                attribute: id.to_string(),
                value: value.clone(),
                data_type: data_type.to_string(),
            }),
        },
    }
}
