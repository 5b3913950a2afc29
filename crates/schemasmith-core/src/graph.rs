//! Intended schema graph
//!
//! A detached arena of value objects. Tables are addressed by `TableId`
//! (their position in the arena); foreign keys point at tables through
//! ids, never through references into a live system.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{DataType, DeleteRule};

/// Position of a table in its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TableId(pub usize);

/// Schema-qualified emitted name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    pub schema: String,
    pub name: String,
}

impl QualifiedName {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Case-insensitive on each part; the schema part is never dropped
    pub fn matches(&self, schema: &str, name: &str) -> bool {
        self.schema.eq_ignore_ascii_case(schema) && self.name.eq_ignore_ascii_case(name)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// Referential action emitted for a created foreign key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OnDelete {
    NoAction,
    Cascade,
}

impl OnDelete {
    /// Action for a delete rule; `Ignore` never produces a foreign key
    pub fn from_rule(rule: DeleteRule) -> Option<Self> {
        match rule {
            DeleteRule::Protect => Some(Self::NoAction),
            DeleteRule::Delete => Some(Self::Cascade),
            DeleteRule::Ignore => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Cascade => "CASCADE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    /// Logical identifier of the attribute
    pub logical_name: String,

    /// Emitted column name
    pub name: String,

    /// Source-platform column name, for messages only
    pub source_physical: Option<String>,

    pub data_type: DataType,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Index {
    pub logical_name: String,

    /// Emitted index name
    pub name: String,

    /// Emitted column names
    pub columns: Vec<String>,

    pub unique: bool,
    pub platform_auto: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: String,

    /// Emitted referencing columns
    pub columns: Vec<String>,

    pub references: TableId,

    /// Emitted name of the referenced table
    pub referenced_table: QualifiedName,

    pub referenced_columns: Vec<String>,
    pub on_delete: OnDelete,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Table {
    pub id: TableId,
    pub module: String,

    /// Logical identifier of the entity
    pub logical_name: String,

    /// Emitted name
    pub name: QualifiedName,

    /// Source-platform table, for messages only
    pub source_physical: Option<String>,

    pub description: Option<String>,

    /// Ordered columns; inactive attributes never appear
    pub columns: Vec<Column>,

    /// Emitted primary-key column names
    pub primary_key: Vec<String>,

    pub indexes: Vec<Index>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_key.iter().any(|c| c.eq_ignore_ascii_case(column))
    }

    /// Emitted name of the primary-key constraint
    pub fn primary_key_name(&self) -> String {
        format!("PK_{}", self.name.name)
    }
}

/// The intended schema: built once, read many times
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaGraph {
    tables: Vec<Table>,
}

impl SchemaGraph {
    /// Build from tables whose ids equal their positions
    pub fn from_tables(tables: Vec<Table>) -> Self {
        debug_assert!(tables.iter().enumerate().all(|(i, t)| t.id == TableId(i)));
        Self { tables }
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table(&self, id: TableId) -> Option<&Table> {
        self.tables.get(id.0)
    }

    /// Find a table by emitted name, case-insensitively within its schema
    pub fn find(&self, schema: &str, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name.matches(schema, name))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(id: usize, schema: &str, name: &str) -> Table {
        Table {
            id: TableId(id),
            module: "Sales".into(),
            logical_name: name.into(),
            name: QualifiedName::new(schema, name),
            source_physical: None,
            description: None,
            columns: vec![Column {
                logical_name: "Id".into(),
                name: "Id".into(),
                source_physical: None,
                data_type: DataType::LongInteger,
                nullable: false,
                default_value: None,
                description: None,
            }],
            primary_key: vec!["Id".into()],
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    #[test]
    fn qualified_names_fold_case_but_keep_schema() {
        let name = QualifiedName::new("sales", "Order");
        assert!(name.matches("SALES", "ORDER"));
        assert!(!name.matches("archive", "Order"));
        assert_eq!(name.to_string(), "sales.Order");
    }

    #[test]
    fn graph_lookup() {
        let graph = SchemaGraph::from_tables(vec![table(0, "sales", "Order"), table(1, "archive", "Order")]);

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.find("ARCHIVE", "order").unwrap().id, TableId(1));
        assert_eq!(graph.table(TableId(0)).unwrap().name.schema, "sales");
        assert!(graph.table(TableId(2)).is_none());
        assert!(graph.tables()[0].is_primary_key("ID"));
    }

    #[test]
    fn delete_rules_map_to_actions() {
        assert_eq!(OnDelete::from_rule(DeleteRule::Protect), Some(OnDelete::NoAction));
        assert_eq!(OnDelete::from_rule(DeleteRule::Delete), Some(OnDelete::Cascade));
        assert_eq!(OnDelete::from_rule(DeleteRule::Ignore), None);
    }
}
