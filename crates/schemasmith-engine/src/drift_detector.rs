//! Drift detection engine for comparing intended vs deployed schemas
//!
//! Compares the tables of a `SchemaGraph` against a deployed definition
//! read from DDL. Table names match case-insensitively within their schema;
//! schemas are never collapsed. Drift is always reported, never raised.

use schemasmith_core::graph::{Column, Table};
use schemasmith_core::{
    DeployedSchema, DeployedTable, DriftCategory, DriftConfig, DriftEntry, DriftReport, ParityConfirmation,
    SchemaGraph, Severity, SeverityThreshold, UnsupportedCheck, UnsupportedNotice,
};

/// Result of comparing one intended table against the deployed definition
#[derive(Debug, Clone)]
pub struct DriftDetection {
    /// Intended table as `schema.name`
    pub table: String,

    /// Drift found for this table
    pub drift: Vec<DriftEntry>,

    /// Checks that found no drift
    pub parity: Vec<ParityConfirmation>,

    /// Comparisons skipped for this table
    pub unsupported: Vec<UnsupportedNotice>,
}

impl DriftDetection {
    /// Compare one intended table against its deployed counterpart
    ///
    /// A missing deployed table yields a single `MISSING_TABLE` entry and
    /// no other checks. Otherwise every category is either reported or
    /// confirmed:
    /// - missing and extra columns
    /// - nullability as the database resolves it
    /// - table-level primary-key participation
    /// - order of the columns both sides share
    pub fn detect(intended: &Table, deployed: Option<&DeployedTable>, severity: &SeverityThreshold) -> Self {
        let mut detection = Self {
            table: intended.name.to_string(),
            drift: Vec::new(),
            parity: Vec::new(),
            unsupported: Vec::new(),
        };

        let deployed = match deployed {
            Some(deployed) => deployed,
            None => {
                let message = format!(
                    "Table '{}' ({}.{}) is missing from the deployed definition",
                    intended.name, intended.module, intended.logical_name
                );
                detection.push(DriftEntry::new(DriftCategory::MissingTable, &detection.table, message), severity);
                return detection;
            }
        };

        detection.confirm(DriftCategory::MissingTable);

        let mut shared = Vec::new();
        for column in &intended.columns {
            match deployed.column(&column.name) {
                Some(actual) => shared.push((column, actual)),
                None => {
                    let message = format!("Column '{}' ({}) is missing", column.name, describe(intended, column));
                    detection.report(DriftCategory::MissingColumn, &column.name, message, deployed, severity);
                }
            }
        }

        for actual in &deployed.columns {
            if intended.column(&actual.name).is_none() {
                let message = format!(
                    "Column '{}' exists in the deployed table but not in the intended schema",
                    actual.name
                );
                detection.report(DriftCategory::ExtraColumn, &actual.name, message, deployed, severity);
            }
        }

        for (column, actual) in &shared {
            let actual_nullable = deployed.effective_nullable(actual);
            if column.nullable != actual_nullable {
                let message = format!(
                    "Column '{}' ({}) nullability differs",
                    column.name,
                    describe(intended, column)
                );
                let entry = DriftEntry::new(DriftCategory::NullabilityMismatch, &detection.table, message)
                    .with_column(&column.name)
                    .with_comparison(null_keyword(column.nullable), null_keyword(actual_nullable))
                    .with_location(deployed.location.clone());
                detection.push(entry, severity);
            }
        }

        for (column, actual) in &shared {
            if actual.inline_primary_key {
                detection.unsupported.push(UnsupportedNotice {
                    check: UnsupportedCheck::InlinePrimaryKey,
                    table: Some(detection.table.clone()),
                    column: Some(actual.name.clone()),
                    message: format!(
                        "Column '{}' declares an inline PRIMARY KEY; only table-level keys are compared",
                        actual.name
                    ),
                });
            }

            let expected = intended.is_primary_key(&column.name);
            let found = deployed.in_primary_key(&actual.name);
            if expected != found {
                let message = format!(
                    "Column '{}' ({}) primary-key participation differs",
                    column.name,
                    describe(intended, column)
                );
                let entry = DriftEntry::new(DriftCategory::PrimaryKeyMismatch, &detection.table, message)
                    .with_column(&column.name)
                    .with_comparison(key_membership(expected), key_membership(found))
                    .with_location(deployed.location.clone());
                detection.push(entry, severity);
            }
        }

        let intended_order: Vec<&str> = shared.iter().map(|(c, _)| c.name.as_str()).collect();
        let deployed_order: Vec<&str> = deployed
            .columns
            .iter()
            .filter(|c| intended.column(&c.name).is_some())
            .map(|c| c.name.as_str())
            .collect();
        let same_order = intended_order.len() == deployed_order.len()
            && intended_order
                .iter()
                .zip(&deployed_order)
                .all(|(a, b)| a.eq_ignore_ascii_case(b));
        if !same_order {
            let entry = DriftEntry::new(
                DriftCategory::ColumnOrderDifference,
                &detection.table,
                format!("Column order of '{}' differs", detection.table),
            )
            .with_comparison(intended_order.join(", "), deployed_order.join(", "))
            .with_location(deployed.location.clone());
            detection.push(entry, severity);
        }

        for category in &DriftCategory::ALL[1..] {
            if !detection.drift.iter().any(|d| d.category == *category) {
                detection.confirm(*category);
            }
        }

        detection
    }

    /// Check if there are any drift errors
    pub fn has_errors(&self) -> bool {
        self.drift.iter().any(|d| d.severity == Severity::Error)
    }

    /// Count error entries
    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    /// Count warning entries
    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warn)
    }

    /// Count info entries
    pub fn info_count(&self) -> usize {
        self.count(Severity::Info)
    }

    fn count(&self, severity: Severity) -> usize {
        self.drift.iter().filter(|d| d.severity == severity).count()
    }

    fn push(&mut self, entry: DriftEntry, severity: &SeverityThreshold) {
        let level = severity.get_severity(entry.category);
        self.drift.push(entry.with_severity(level));
    }

    fn report(
        &mut self,
        category: DriftCategory,
        column: &str,
        message: String,
        deployed: &DeployedTable,
        severity: &SeverityThreshold,
    ) {
        let entry = DriftEntry::new(category, &self.table, message)
            .with_column(column)
            .with_location(deployed.location.clone());
        self.push(entry, severity);
    }

    fn confirm(&mut self, category: DriftCategory) {
        self.parity.push(ParityConfirmation {
            check: category.parity(),
            table: self.table.clone(),
        });
    }
}

/// Compares whole graphs against deployed definitions
#[derive(Debug, Clone, Default)]
pub struct DriftDetector {
    config: DriftConfig,
}

impl DriftDetector {
    pub fn new(config: DriftConfig) -> Self {
        Self { config }
    }

    /// Compare every intended table; deployed tables the graph lacks are ignored
    pub fn compare(&self, graph: &SchemaGraph, deployed: &DeployedSchema) -> DriftReport {
        let mut tables_checked = 0;
        let mut drift = Vec::new();
        let mut parity = Vec::new();
        let mut unsupported = vec![UnsupportedNotice {
            check: UnsupportedCheck::DataTypeCanonicalization,
            table: None,
            column: None,
            message: "Data types are not compared; equivalent spellings are not canonicalized".to_string(),
        }];

        for table in graph.tables() {
            let name = table.name.to_string();
            if self.config.is_table_skipped(&name) {
                tracing::debug!(table = %name, "table skipped by configuration");
                continue;
            }

            tables_checked += 1;
            let detection = DriftDetection::detect(
                table,
                deployed.find(&table.name.schema, &table.name.name),
                &self.config.severity,
            );
            drift.extend(detection.drift);
            parity.extend(detection.parity);
            unsupported.extend(detection.unsupported);
        }

        let report = DriftReport::new(tables_checked, drift, parity, unsupported);
        tracing::info!(
            tables = report.summary.tables_checked,
            drift = report.summary.total,
            errors = report.summary.errors,
            parity = report.summary.parity,
            "schema comparison finished"
        );
        report
    }
}

/// Logical identity and source column, for messages only
fn describe(table: &Table, column: &Column) -> String {
    let logical = format!("{}.{}.{}", table.module, table.logical_name, column.logical_name);
    match &column.source_physical {
        Some(physical) => format!("{}, source {}", logical, physical),
        None => logical,
    }
}

fn null_keyword(nullable: bool) -> &'static str {
    if nullable {
        "NULL"
    } else {
        "NOT NULL"
    }
}

fn key_membership(member: bool) -> &'static str {
    if member {
        "PRIMARY KEY"
    } else {
        "not in PRIMARY KEY"
    }
}
