//! Drift categories, parity checks and locations
//!
//! IMPORTANT: category codes are versioned and stable.
//! NEVER rename or remove codes - they are part of the report format.
//! Add new codes with new names only.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Drift category registry (v1)
///
/// Every category has exactly one parity check confirming its absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriftCategory {
    /// An intended table is absent from the deployed definition
    MissingTable,

    /// An intended column is absent from the deployed table
    MissingColumn,

    /// The deployed table has a column the intended table lacks
    ExtraColumn,

    /// NULL / NOT NULL differs
    NullabilityMismatch,

    /// Primary-key participation differs
    PrimaryKeyMismatch,

    /// Shared columns appear in a different order
    ColumnOrderDifference,
}

impl DriftCategory {
    pub const ALL: [DriftCategory; 6] = [
        Self::MissingTable,
        Self::MissingColumn,
        Self::ExtraColumn,
        Self::NullabilityMismatch,
        Self::PrimaryKeyMismatch,
        Self::ColumnOrderDifference,
    ];

    /// Get the category as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingTable => "MISSING_TABLE",
            Self::MissingColumn => "MISSING_COLUMN",
            Self::ExtraColumn => "EXTRA_COLUMN",
            Self::NullabilityMismatch => "NULLABILITY_MISMATCH",
            Self::PrimaryKeyMismatch => "PRIMARY_KEY_MISMATCH",
            Self::ColumnOrderDifference => "COLUMN_ORDER_DIFFERENCE",
        }
    }

    /// Severity before configuration overrides
    pub fn default_severity(&self) -> Severity {
        match self {
            Self::MissingTable
            | Self::MissingColumn
            | Self::NullabilityMismatch
            | Self::PrimaryKeyMismatch => Severity::Error,
            Self::ColumnOrderDifference => Severity::Warn,
            Self::ExtraColumn => Severity::Info,
        }
    }

    /// The check that confirms this category did not occur
    pub fn parity(&self) -> ParityCheck {
        match self {
            Self::MissingTable => ParityCheck::TablePresent,
            Self::MissingColumn => ParityCheck::ColumnsPresent,
            Self::ExtraColumn => ParityCheck::NoExtraColumns,
            Self::NullabilityMismatch => ParityCheck::NullabilityMatches,
            Self::PrimaryKeyMismatch => ParityCheck::PrimaryKeyMatches,
            Self::ColumnOrderDifference => ParityCheck::ColumnOrderMatches,
        }
    }
}

impl fmt::Display for DriftCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parity check registry (v1), one per drift category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParityCheck {
    TablePresent,
    ColumnsPresent,
    NoExtraColumns,
    NullabilityMatches,
    PrimaryKeyMatches,
    ColumnOrderMatches,
}

impl ParityCheck {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TablePresent => "TABLE_PRESENT",
            Self::ColumnsPresent => "COLUMNS_PRESENT",
            Self::NoExtraColumns => "NO_EXTRA_COLUMNS",
            Self::NullabilityMatches => "NULLABILITY_MATCHES",
            Self::PrimaryKeyMatches => "PRIMARY_KEY_MATCHES",
            Self::ColumnOrderMatches => "COLUMN_ORDER_MATCHES",
        }
    }
}

impl fmt::Display for ParityCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Comparisons the comparator deliberately does not perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnsupportedCheck {
    /// Equivalent spellings of a data type are not unified, so types are not compared
    DataTypeCanonicalization,

    /// Inline `PRIMARY KEY` column options are not folded into the table key
    InlinePrimaryKey,
}

impl UnsupportedCheck {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DataTypeCanonicalization => "DATA_TYPE_CANONICALIZATION",
            Self::InlinePrimaryKey => "INLINE_PRIMARY_KEY",
        }
    }
}

impl fmt::Display for UnsupportedCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Drift severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,

    /// Warning - should be reviewed but not blocking
    Warn,

    /// Error - blocking issue that should fail CI
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Source location in a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// File path
    pub file: String,

    /// Optional line number (1-indexed)
    pub line: Option<usize>,

    /// Optional column number (1-indexed)
    pub column: Option<usize>,
}

impl Location {
    /// Create a new location with just a file path
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: None,
            column: None,
        }
    }

    /// Create a location with file, line, and column
    pub fn with_position(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line: Some(line),
            column: Some(column),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(f, "{}:{}:{}", self.file, line, column),
            (Some(line), None) => write!(f, "{}:{}", self.file, line),
            _ => write!(f, "{}", self.file),
        }
    }
}

/// One structural difference between intended and deployed schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftEntry {
    pub category: DriftCategory,
    pub severity: Severity,

    /// Intended table as `schema.name`
    pub table: String,

    /// Emitted column name, for column-level drift
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,

    /// Human-readable message
    pub message: String,

    /// Expected value (for comparison entries)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,

    /// Actual value (for comparison entries)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,

    /// Deployed definition location (best-effort)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl DriftEntry {
    /// Create an entry at the category's default severity
    pub fn new(category: DriftCategory, table: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            category,
            severity: category.default_severity(),
            table: table.into(),
            column: None,
            message: message.into(),
            expected: None,
            actual: None,
            location: None,
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Set expected/actual values
    pub fn with_comparison(mut self, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self.actual = Some(actual.into());
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }
}

/// A check that found no drift
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParityConfirmation {
    pub check: ParityCheck,

    /// Intended table as `schema.name`
    pub table: String,
}

/// A comparison that was not performed, and where
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsupportedNotice {
    pub check: UnsupportedCheck,

    /// Table the notice applies to; `None` for the whole run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,

    pub message: String,
}
