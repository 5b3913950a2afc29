//! DDL reading using datafusion-sqlparser-rs
//!
//! Parses deployed DDL into the deployed-schema definition. Statements the
//! comparator has no use for are skipped; statements that target a table the
//! input never created are errors.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use sqlparser::ast::{
    AlterTableOperation, ColumnDef, ColumnOption, CommentObject, CreateIndex, CreateTable, Expr, Ident, ObjectName,
    Statement, TableConstraint,
};
use sqlparser::dialect::{BigQueryDialect, Dialect, GenericDialect, PostgreSqlDialect, SnowflakeDialect};
use sqlparser::parser::{Parser, ParserError};
use thiserror::Error;
use walkdir::WalkDir;

use schemasmith_core::{
    Config, DeployedColumn, DeployedForeignKey, DeployedIndex, DeployedSchema, DeployedTable, DialectConfig, Location,
    QualifiedName, DEFAULT_SCHEMA,
};

/// DDL reading error with location information
#[derive(Debug, Error)]
pub enum DdlParseError {
    #[error("{location}: cannot read DDL: {source}")]
    Io {
        location: Location,
        source: std::io::Error,
    },

    #[error("{location}: {message}")]
    Syntax { location: Location, message: String },

    #[error("{location}: {statement} targets unknown table '{table}'")]
    UnknownTable {
        location: Location,
        statement: &'static str,
        table: String,
    },

    #[error("{location}: table '{table}' has no column '{column}'")]
    UnknownColumn {
        location: Location,
        table: String,
        column: String,
    },

    #[error("{location}: table '{table}' is created more than once")]
    DuplicateTable { location: Location, table: String },
}

impl DdlParseError {
    /// Where the error was found
    pub fn location(&self) -> &Location {
        match self {
            Self::Io { location, .. }
            | Self::Syntax { location, .. }
            | Self::UnknownTable { location, .. }
            | Self::UnknownColumn { location, .. }
            | Self::DuplicateTable { location, .. } => location,
        }
    }

    fn syntax(file: &str, error: &ParserError) -> Self {
        let message = error.to_string();
        let location = match position(&message) {
            Some((line, column)) => Location::with_position(file, line, column),
            None => Location::new(file),
        };
        Self::Syntax { location, message }
    }
}

/// Line and column from a parser message (`... at Line: N, Column: M`)
fn position(message: &str) -> Option<(usize, usize)> {
    static POSITION: OnceLock<Option<Regex>> = OnceLock::new();
    let regex = POSITION
        .get_or_init(|| Regex::new(r"Line: (\d+), Column: (\d+)").ok())
        .as_ref()?;

    let captures = regex.captures(message)?;
    let line = captures.get(1)?.as_str().parse().ok()?;
    let column = captures.get(2)?.as_str().parse().ok()?;
    Some((line, column))
}

/// Deployed DDL reader with configurable dialect
#[derive(Debug)]
pub struct DdlReader {
    dialect: Box<dyn Dialect>,

    /// Schema for unqualified names
    default_schema: String,
}

impl DdlReader {
    /// Create a reader with the generic dialect
    pub fn new() -> Self {
        Self::with_dialect(Box::new(GenericDialect {}))
    }

    /// Create a reader for BigQuery
    pub fn bigquery() -> Self {
        Self::with_dialect(Box::new(BigQueryDialect {}))
    }

    /// Create a reader for PostgreSQL
    pub fn postgres() -> Self {
        Self::with_dialect(Box::new(PostgreSqlDialect {}))
    }

    /// Create a reader for Snowflake
    pub fn snowflake() -> Self {
        Self::with_dialect(Box::new(SnowflakeDialect {}))
    }

    /// Create a reader from a dialect config
    pub fn from_dialect(dialect: &DialectConfig) -> Self {
        match dialect {
            DialectConfig::BigQuery => Self::bigquery(),
            DialectConfig::Snowflake => Self::snowflake(),
            DialectConfig::Postgres => Self::postgres(),
            DialectConfig::Ansi => Self::new(),
        }
    }

    /// Dialect and default schema from `schemasmith.toml`
    pub fn from_config(config: &Config) -> Self {
        Self::from_dialect(&config.dialect).with_default_schema(config.build.default_schema.clone())
    }

    fn with_dialect(dialect: Box<dyn Dialect>) -> Self {
        Self {
            dialect,
            default_schema: DEFAULT_SCHEMA.to_string(),
        }
    }

    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = schema.into();
        self
    }

    /// Read DDL text; `file` is only used for locations
    pub fn read_str(&self, sql: &str, file: &str) -> Result<DeployedSchema, DdlParseError> {
        let mut schema = DeployedSchema::new();
        self.apply(sql, file, &mut schema)?;
        Ok(schema)
    }

    /// Read a DDL file
    pub fn read_file(&self, path: &Path) -> Result<DeployedSchema, DdlParseError> {
        let mut schema = DeployedSchema::new();
        self.apply_file(path, &mut schema)?;
        Ok(schema)
    }

    /// Read every `.sql` file under `dir`, in file-name order
    ///
    /// Files share one definition, so a statement may target a table
    /// created by an earlier file.
    pub fn read_dir(&self, dir: &Path) -> Result<DeployedSchema, DdlParseError> {
        let mut schema = DeployedSchema::new();

        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| DdlParseError::Io {
                location: Location::new(e.path().unwrap_or(dir).display().to_string()),
                source: std::io::Error::from(e),
            })?;
            if entry.file_type().is_file() && entry.path().extension().is_some_and(|ext| ext == "sql") {
                self.apply_file(entry.path(), &mut schema)?;
            }
        }

        tracing::debug!(dir = %dir.display(), tables = schema.tables.len(), "deployed DDL read");
        Ok(schema)
    }

    fn apply_file(&self, path: &Path, schema: &mut DeployedSchema) -> Result<(), DdlParseError> {
        let file = path.display().to_string();
        let sql = std::fs::read_to_string(path).map_err(|source| DdlParseError::Io {
            location: Location::new(&file),
            source,
        })?;
        self.apply(&sql, &file, schema)
    }

    fn apply(&self, sql: &str, file: &str, schema: &mut DeployedSchema) -> Result<(), DdlParseError> {
        let statements = Parser::parse_sql(&*self.dialect, sql).map_err(|e| DdlParseError::syntax(file, &e))?;

        for statement in &statements {
            match statement {
                Statement::CreateTable(create) => self.create_table(create, file, schema)?,
                Statement::CreateIndex(create) => self.create_index(create, file, schema)?,
                Statement::AlterTable { name, operations, .. } => {
                    let table = self.target(schema, name, file, "ALTER TABLE")?;
                    for operation in operations {
                        match operation {
                            AlterTableOperation::AddConstraint(constraint) => self.add_constraint(table, constraint),
                            _ => tracing::debug!(file, table = %table.name, "alter operation skipped"),
                        }
                    }
                }
                Statement::Comment {
                    object_type,
                    object_name,
                    comment,
                    ..
                } => self.comment(object_type, object_name, comment.clone(), file, schema)?,
                other => {
                    let sql = other.to_string();
                    let kind = sql.split_whitespace().take(2).collect::<Vec<_>>().join(" ");
                    tracing::debug!(file, statement = %kind, "statement skipped");
                }
            }
        }

        Ok(())
    }

    fn create_table(&self, create: &CreateTable, file: &str, schema: &mut DeployedSchema) -> Result<(), DdlParseError> {
        let name = self.qualify(&create.name);
        if schema.find(&name.schema, &name.name).is_some() {
            return Err(DdlParseError::DuplicateTable {
                location: Location::new(file),
                table: name.to_string(),
            });
        }

        let mut table = DeployedTable::new(name, Location::new(file));
        for column in &create.columns {
            let (deployed, foreign_key) = self.column(column);
            table.columns.push(deployed);
            table.foreign_keys.extend(foreign_key);
        }
        for constraint in &create.constraints {
            self.add_constraint(&mut table, constraint);
        }

        schema.tables.push(table);
        Ok(())
    }

    fn column(&self, def: &ColumnDef) -> (DeployedColumn, Option<DeployedForeignKey>) {
        let mut column = DeployedColumn::new(def.name.value.clone(), def.data_type.to_string());
        let mut foreign_key = None;

        for option in &def.options {
            match &option.option {
                ColumnOption::Null => column.nullable = Some(true),
                ColumnOption::NotNull => column.nullable = Some(false),
                ColumnOption::Default(expr) => column.default_value = Some(expr.to_string()),
                ColumnOption::Unique { is_primary: true, .. } => column.inline_primary_key = true,
                ColumnOption::Comment(comment) => column.description = Some(comment.clone()),
                ColumnOption::ForeignKey {
                    foreign_table,
                    referred_columns,
                    on_delete,
                    ..
                } => {
                    foreign_key = Some(DeployedForeignKey {
                        name: option.name.as_ref().map(|n| n.value.clone()),
                        columns: vec![def.name.value.clone()],
                        referenced_table: self.qualify(foreign_table),
                        referenced_columns: idents(referred_columns),
                        on_delete: on_delete.as_ref().map(ToString::to_string),
                    });
                }
                _ => {}
            }
        }

        (column, foreign_key)
    }

    fn add_constraint(&self, table: &mut DeployedTable, constraint: &TableConstraint) {
        match constraint {
            TableConstraint::PrimaryKey { columns, .. } => table.primary_key = idents(columns),
            TableConstraint::ForeignKey {
                name,
                columns,
                foreign_table,
                referred_columns,
                on_delete,
                ..
            } => table.foreign_keys.push(DeployedForeignKey {
                name: name.as_ref().map(|n| n.value.clone()),
                columns: idents(columns),
                referenced_table: self.qualify(foreign_table),
                referenced_columns: idents(referred_columns),
                on_delete: on_delete.as_ref().map(ToString::to_string),
            }),
            TableConstraint::Unique { name, columns, .. } => table.indexes.push(DeployedIndex {
                name: name.as_ref().map(|n| n.value.clone()),
                columns: idents(columns),
                unique: true,
            }),
            _ => tracing::debug!(table = %table.name, "table constraint skipped"),
        }
    }

    fn create_index(&self, create: &CreateIndex, file: &str, schema: &mut DeployedSchema) -> Result<(), DdlParseError> {
        let table = self.target(schema, &create.table_name, file, "CREATE INDEX")?;
        table.indexes.push(DeployedIndex {
            name: create.name.as_ref().and_then(last_part),
            columns: create
                .columns
                .iter()
                .map(|c| match &c.expr {
                    Expr::Identifier(ident) => ident.value.clone(),
                    expr => expr.to_string(),
                })
                .collect(),
            unique: create.unique,
        });
        Ok(())
    }

    fn comment(
        &self,
        object_type: &CommentObject,
        object_name: &ObjectName,
        comment: Option<String>,
        file: &str,
        schema: &mut DeployedSchema,
    ) -> Result<(), DdlParseError> {
        match object_type {
            CommentObject::Table => {
                let table = self.target(schema, object_name, file, "COMMENT ON TABLE")?;
                table.description = comment;
            }
            CommentObject::Column => {
                let parts = &object_name.0;
                let Some((column, table_parts)) = parts.split_last().filter(|(_, rest)| !rest.is_empty()) else {
                    tracing::debug!(file, object = %object_name, "column comment without table skipped");
                    return Ok(());
                };
                let table_name = ObjectName(table_parts.to_vec());
                let table = self.target(schema, &table_name, file, "COMMENT ON COLUMN")?;
                let table_label = table.name.to_string();
                let deployed = table.column_mut(&column.value).ok_or_else(|| DdlParseError::UnknownColumn {
                    location: Location::new(file),
                    table: table_label,
                    column: column.value.clone(),
                })?;
                deployed.description = comment;
            }
            _ => tracing::debug!(file, object = %object_name, "comment skipped"),
        }
        Ok(())
    }

    /// Table a statement modifies; it must have been created already
    fn target<'a>(
        &self,
        schema: &'a mut DeployedSchema,
        name: &ObjectName,
        file: &str,
        statement: &'static str,
    ) -> Result<&'a mut DeployedTable, DdlParseError> {
        let name = self.qualify(name);
        schema
            .find_mut(&name.schema, &name.name)
            .ok_or_else(|| DdlParseError::UnknownTable {
                location: Location::new(file),
                statement,
                table: name.to_string(),
            })
    }

    /// `schema.table`; unqualified names take the default schema
    fn qualify(&self, name: &ObjectName) -> QualifiedName {
        match name.0.as_slice() {
            [] => QualifiedName::new(&self.default_schema, ""),
            [table] => QualifiedName::new(&self.default_schema, &table.value),
            [.., schema, table] => QualifiedName::new(&schema.value, &table.value),
        }
    }
}

impl Default for DdlReader {
    fn default() -> Self {
        Self::postgres()
    }
}

fn idents(columns: &[Ident]) -> Vec<String> {
    columns.iter().map(|c| c.value.clone()).collect()
}

fn last_part(name: &ObjectName) -> Option<String> {
    name.0.last().map(|ident| ident.value.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ORDER_DDL: &str = r#"-- Sales.Order
CREATE TABLE "sales"."Order" (
    "Id" BIGINT NOT NULL,
    "CustomerId" BIGINT NULL,
    "Status" VARCHAR(10) NOT NULL DEFAULT 'new',
    CONSTRAINT "PK_Order" PRIMARY KEY ("Id")
);

CREATE UNIQUE INDEX "Order_IX_Status" ON "sales"."Order" ("Status");

ALTER TABLE "sales"."Order" ADD CONSTRAINT "FK_Order_CustomerId" FOREIGN KEY ("CustomerId") REFERENCES "sales"."Customer" ("Id") ON DELETE NO ACTION;

COMMENT ON TABLE "sales"."Order" IS 'Customer orders';
COMMENT ON COLUMN "sales"."Order"."Status" IS 'Lifecycle state, e.g. ''open''';
"#;

    #[test]
    fn reads_full_table_definition() {
        let schema = DdlReader::postgres().read_str(ORDER_DDL, "Sales/Order.sql").unwrap();

        assert_eq!(schema.tables.len(), 1);
        let order = schema.find("sales", "Order").unwrap();
        assert_eq!(
            order.columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            vec!["Id", "CustomerId", "Status"]
        );
        assert_eq!(order.column("Id").unwrap().nullable, Some(false));
        assert_eq!(order.column("CustomerId").unwrap().nullable, Some(true));
        assert_eq!(order.column("Status").unwrap().default_value.as_deref(), Some("'new'"));
        assert_eq!(order.primary_key, vec!["Id"]);
        assert_eq!(
            order.indexes,
            vec![DeployedIndex {
                name: Some("Order_IX_Status".into()),
                columns: vec!["Status".into()],
                unique: true,
            }]
        );
        assert_eq!(
            order.foreign_keys,
            vec![DeployedForeignKey {
                name: Some("FK_Order_CustomerId".into()),
                columns: vec!["CustomerId".into()],
                referenced_table: QualifiedName::new("sales", "Customer"),
                referenced_columns: vec!["Id".into()],
                on_delete: Some("NO ACTION".into()),
            }]
        );
        assert_eq!(order.description.as_deref(), Some("Customer orders"));
        assert_eq!(
            order.column("Status").unwrap().description.as_deref(),
            Some("Lifecycle state, e.g. 'open'")
        );
        assert_eq!(order.location, Location::new("Sales/Order.sql"));
    }

    #[test]
    fn unqualified_names_take_default_schema() {
        let reader = DdlReader::postgres().with_default_schema("app");
        let schema = reader
            .read_str("CREATE TABLE customer (id INT, name TEXT);", "customer.sql")
            .unwrap();

        assert!(schema.find("app", "customer").is_some());
        assert!(schema.find("dbo", "customer").is_none());
    }

    #[test]
    fn inline_primary_key_is_not_folded_into_table_key() {
        let schema = DdlReader::postgres()
            .read_str("CREATE TABLE customer (id INT PRIMARY KEY, name TEXT);", "customer.sql")
            .unwrap();

        let customer = schema.find(DEFAULT_SCHEMA, "customer").unwrap();
        let id = customer.column("id").unwrap();
        assert!(id.inline_primary_key);
        assert_eq!(id.nullable, None);
        assert!(customer.primary_key.is_empty());
        assert!(customer.effective_nullable(id));
    }

    #[test]
    fn other_statements_are_skipped() {
        let sql = "CREATE VIEW v AS SELECT 1; INSERT INTO t VALUES (1); CREATE TABLE t (id INT);";
        let schema = DdlReader::postgres().read_str(sql, "mixed.sql").unwrap();

        assert_eq!(schema.tables.len(), 1);
        assert!(schema.find(DEFAULT_SCHEMA, "t").is_some());
    }

    #[test]
    fn syntax_errors_carry_position() {
        let sql = "CREATE TABLE t (\n    id INT,\n    name VARCHAR(10) BANANA\n);";
        let err = DdlReader::postgres().read_str(sql, "broken.sql").unwrap_err();

        assert!(matches!(err, DdlParseError::Syntax { .. }));
        assert_eq!(err.location().file, "broken.sql");
        assert_eq!(err.location().line, Some(3));
        assert!(err.location().column.is_some());
    }

    #[test]
    fn position_is_read_from_parser_message() {
        assert_eq!(position("Expected: ), found: x at Line: 4, Column: 12"), Some((4, 12)));
        assert_eq!(position("recursion limit exceeded"), None);
    }

    #[test]
    fn statements_on_unknown_tables_are_rejected() {
        let err = DdlReader::postgres()
            .read_str(r#"CREATE INDEX "IX" ON "sales"."Missing" ("Id");"#, "ix.sql")
            .unwrap_err();
        assert!(matches!(err, DdlParseError::UnknownTable { statement: "CREATE INDEX", .. }));

        let err = DdlReader::postgres()
            .read_str("CREATE TABLE t (id INT); COMMENT ON COLUMN t.nope IS 'x';", "c.sql")
            .unwrap_err();
        assert!(matches!(err, DdlParseError::UnknownColumn { .. }));

        let err = DdlReader::postgres()
            .read_str("CREATE TABLE t (id INT); CREATE TABLE T (id INT);", "dup.sql")
            .unwrap_err();
        assert!(matches!(err, DdlParseError::DuplicateTable { .. }));
    }

    #[test]
    fn directory_is_read_in_file_name_order() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("Sales")).unwrap();
        std::fs::write(
            dir.path().join("Sales/a_tables.sql"),
            "CREATE TABLE customer (id INT NOT NULL); CREATE TABLE orders (id INT NOT NULL, customer_id INT);",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("Sales/b_keys.sql"),
            "ALTER TABLE orders ADD CONSTRAINT fk_customer FOREIGN KEY (customer_id) REFERENCES customer (id);",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not sql").unwrap();

        let schema = DdlReader::postgres().read_dir(dir.path()).unwrap();

        assert_eq!(schema.tables.len(), 2);
        let orders = schema.find(DEFAULT_SCHEMA, "orders").unwrap();
        assert_eq!(orders.foreign_keys.len(), 1);
        assert_eq!(orders.foreign_keys[0].referenced_table, QualifiedName::new(DEFAULT_SCHEMA, "customer"));
        assert!(orders.location.file.ends_with("a_tables.sql"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = DdlReader::postgres().read_file(Path::new("does/not/exist.sql")).unwrap_err();
        assert!(matches!(err, DdlParseError::Io { .. }));
        assert_eq!(err.location().file, "does/not/exist.sql");
    }

    #[test]
    fn different_dialects() {
        let sql = "CREATE TABLE users (id INT NOT NULL, name VARCHAR(50))";

        for dialect in [
            DialectConfig::Ansi,
            DialectConfig::Postgres,
            DialectConfig::BigQuery,
            DialectConfig::Snowflake,
        ] {
            let schema = DdlReader::from_dialect(&dialect).read_str(sql, "users.sql").unwrap();
            assert_eq!(schema.tables[0].columns.len(), 2, "{:?}", dialect);
        }
    }
}
