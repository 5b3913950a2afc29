//! Deployed schema definition, as read from DDL
//!
//! Produced by the SQL-reading collaborator, consumed by the comparator.
//! Data types are kept as written; no canonicalization happens here.

use serde::{Deserialize, Serialize};

use crate::diagnostic::Location;
use crate::graph::QualifiedName;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedColumn {
    pub name: String,

    /// Data type as written in the DDL
    pub data_type: String,

    /// `Some` when NULL / NOT NULL was spelled out
    pub nullable: Option<bool>,

    /// Declared with an inline PRIMARY KEY column option
    pub inline_primary_key: bool,

    pub default_value: Option<String>,
    pub description: Option<String>,
}

impl DeployedColumn {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: None,
            inline_primary_key: false,
            default_value: None,
            description: None,
        }
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedIndex {
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub unique: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedForeignKey {
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub referenced_table: QualifiedName,
    pub referenced_columns: Vec<String>,
    pub on_delete: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedTable {
    pub name: QualifiedName,

    /// Columns in declaration order
    pub columns: Vec<DeployedColumn>,

    /// Columns of a table-level PRIMARY KEY constraint
    pub primary_key: Vec<String>,

    pub indexes: Vec<DeployedIndex>,
    pub foreign_keys: Vec<DeployedForeignKey>,
    pub description: Option<String>,

    /// Where the CREATE TABLE statement was read from
    pub location: Location,
}

impl DeployedTable {
    pub fn new(name: QualifiedName, location: Location) -> Self {
        Self {
            name,
            columns: Vec::new(),
            primary_key: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            description: None,
            location,
        }
    }

    pub fn with_column(mut self, column: DeployedColumn) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_primary_key(mut self, columns: Vec<String>) -> Self {
        self.primary_key = columns;
        self
    }

    pub fn column(&self, name: &str) -> Option<&DeployedColumn> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut DeployedColumn> {
        self.columns.iter_mut().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Membership in the table-level primary key
    pub fn in_primary_key(&self, column: &str) -> bool {
        self.primary_key.iter().any(|c| c.eq_ignore_ascii_case(column))
    }

    /// Nullability as the database resolves it
    ///
    /// Unspelled nullability means NULL, except for members of a
    /// table-level primary key, which SQL makes NOT NULL. Inline primary
    /// keys are not consulted.
    pub fn effective_nullable(&self, column: &DeployedColumn) -> bool {
        match column.nullable {
            Some(nullable) => nullable,
            None => !self.in_primary_key(&column.name),
        }
    }
}

/// Every table found in a deployed definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedSchema {
    pub tables: Vec<DeployedTable>,
}

impl DeployedSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: DeployedTable) -> Self {
        self.tables.push(table);
        self
    }

    /// Case-insensitive on schema and name; schemas are never collapsed
    pub fn find(&self, schema: &str, name: &str) -> Option<&DeployedTable> {
        self.tables.iter().find(|t| t.name.matches(schema, name))
    }

    pub fn find_mut(&mut self, schema: &str, name: &str) -> Option<&mut DeployedTable> {
        self.tables.iter_mut().find(|t| t.name.matches(schema, name))
    }

    /// Append the tables of another definition
    pub fn merge(&mut self, other: DeployedSchema) {
        self.tables.extend(other.tables);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_nullability() {
        let table = DeployedTable::new(QualifiedName::new("sales", "Order"), Location::new("order.sql"))
            .with_column(DeployedColumn::new("Id", "BIGINT"))
            .with_column(DeployedColumn::new("Name", "VARCHAR(50)"))
            .with_column(DeployedColumn::new("Code", "VARCHAR(5)").with_nullable(false))
            .with_primary_key(vec!["id".into()]);

        assert!(!table.effective_nullable(table.column("Id").unwrap()));
        assert!(table.effective_nullable(table.column("name").unwrap()));
        assert!(!table.effective_nullable(table.column("CODE").unwrap()));
    }

    #[test]
    fn schema_boundaries_are_kept() {
        let schema = DeployedSchema::new()
            .with_table(DeployedTable::new(QualifiedName::new("sales", "Order"), Location::new("a.sql")));

        assert!(schema.find("SALES", "ORDER").is_some());
        assert!(schema.find("archive", "Order").is_none());
    }
}
