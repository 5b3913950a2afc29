//! DDL rendering for one table
//!
//! ANSI DDL with double-quoted identifiers. Statement order is fixed:
//! `CREATE TABLE`, indexes, foreign keys, then documentation comments.
//! Foreign keys are separate `ALTER TABLE` statements so a file never
//! depends on another file having run first.

use std::fmt::Write as _;

use schemasmith_core::{Column, QualifiedName, Table};

/// Render the full definition of a table
///
/// With `bare_tables` only the `CREATE TABLE` statement is rendered.
pub fn render_table(table: &Table, bare_tables: bool) -> String {
    let mut sql = String::new();
    let _ = writeln!(sql, "-- {}.{}", table.module, table.logical_name);

    render_create_table(&mut sql, table);
    if bare_tables {
        return sql;
    }

    if !table.indexes.is_empty() {
        sql.push('\n');
        for index in &table.indexes {
            let _ = writeln!(
                sql,
                "CREATE {}INDEX {} ON {} ({});",
                if index.unique { "UNIQUE " } else { "" },
                quote(&index.name),
                qualified(&table.name),
                column_list(&index.columns),
            );
        }
    }

    if !table.foreign_keys.is_empty() {
        sql.push('\n');
        for fk in &table.foreign_keys {
            let _ = writeln!(
                sql,
                "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {};",
                qualified(&table.name),
                quote(&fk.name),
                column_list(&fk.columns),
                qualified(&fk.referenced_table),
                column_list(&fk.referenced_columns),
                fk.on_delete.as_sql(),
            );
        }
    }

    let documented: Vec<&Column> = table.columns.iter().filter(|c| c.description.is_some()).collect();
    if table.description.is_some() || !documented.is_empty() {
        sql.push('\n');
        if let Some(description) = &table.description {
            let _ = writeln!(sql, "COMMENT ON TABLE {} IS {};", qualified(&table.name), string_literal(description));
        }
        for column in documented {
            if let Some(description) = &column.description {
                let _ = writeln!(
                    sql,
                    "COMMENT ON COLUMN {}.{} IS {};",
                    qualified(&table.name),
                    quote(&column.name),
                    string_literal(description),
                );
            }
        }
    }

    sql
}

fn render_create_table(sql: &mut String, table: &Table) {
    let mut lines: Vec<String> = table.columns.iter().map(column_definition).collect();
    if !table.primary_key.is_empty() {
        lines.push(format!(
            "CONSTRAINT {} PRIMARY KEY ({})",
            quote(&table.primary_key_name()),
            column_list(&table.primary_key),
        ));
    }

    let _ = writeln!(sql, "CREATE TABLE {} (", qualified(&table.name));
    let _ = writeln!(sql, "    {}", lines.join(",\n    "));
    sql.push_str(");\n");
}

fn column_definition(column: &Column) -> String {
    let mut definition = format!(
        "{} {} {}",
        quote(&column.name),
        column.data_type,
        if column.nullable { "NULL" } else { "NOT NULL" },
    );
    if let Some(value) = &column.default_value {
        match column.data_type.default_literal(value) {
            Some(literal) => {
                let _ = write!(definition, " DEFAULT {}", literal);
            }
            None => tracing::warn!(column = %column.name, value = %value, "non-literal default omitted"),
        }
    }
    definition
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn qualified(name: &QualifiedName) -> String {
    format!("{}.{}", quote(&name.schema), quote(&name.name))
}

fn column_list(columns: &[String]) -> String {
    columns.iter().map(|c| quote(c)).collect::<Vec<_>>().join(", ")
}

fn string_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
