//! Observed data statistics
//!
//! A `ProfileSnapshot` is produced once per execution by the profiling
//! collaborator. Observations are keyed by physical schema + table +
//! column(s); identifier matching is ASCII case-insensitive, the way the
//! database itself resolves unquoted names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How an observation was gathered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum SamplingStrategy {
    /// Every row was inspected
    FullScan,

    /// Only a sample of rows was inspected
    Sampled { sample_rows: u64 },

    /// Observation comes from a checked-in fixture rather than a live probe
    Fixture,
}

impl SamplingStrategy {
    /// Whether the observation covers every row
    pub fn is_exhaustive(&self) -> bool {
        matches!(self, Self::FullScan | Self::Fixture)
    }
}

/// Physical schema + table + column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnKey {
    pub schema: String,
    pub table: String,
    pub column: String,
}

impl ColumnKey {
    pub fn new(schema: impl Into<String>, table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            column: column.into(),
        }
    }

    fn matches(&self, schema: &str, table: &str, column: &str) -> bool {
        self.schema.eq_ignore_ascii_case(schema)
            && self.table.eq_ignore_ascii_case(table)
            && self.column.eq_ignore_ascii_case(column)
    }
}

/// Null statistics for one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub key: ColumnKey,

    /// Rows inspected
    pub row_count: u64,

    /// Rows holding NULL
    pub null_count: u64,

    pub sampling: SamplingStrategy,

    pub observed_at: DateTime<Utc>,

    /// The probe could not run; counts are meaningless
    #[serde(default)]
    pub missing: bool,
}

/// Duplicate statistics for a unique-candidate column set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueProfile {
    pub schema: String,
    pub table: String,

    /// Ordered physical column names
    pub columns: Vec<String>,

    /// Number of value groups occurring more than once
    pub duplicate_groups: u64,

    pub sampling: SamplingStrategy,

    pub observed_at: DateTime<Utc>,

    #[serde(default)]
    pub missing: bool,
}

/// Orphan statistics for one referencing column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyProfile {
    /// Referencing column
    pub key: ColumnKey,

    /// Rows whose value has no match in the referenced table
    pub orphan_rows: u64,

    pub sampling: SamplingStrategy,

    pub observed_at: DateTime<Utc>,

    #[serde(default)]
    pub missing: bool,
}

/// All observations of one profiling run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    /// When the run started
    pub captured_at: DateTime<Utc>,

    #[serde(default)]
    pub columns: Vec<ColumnProfile>,

    #[serde(default)]
    pub unique_candidates: Vec<UniqueProfile>,

    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyProfile>,
}

impl ProfileSnapshot {
    /// Create an empty snapshot
    pub fn new(captured_at: DateTime<Utc>) -> Self {
        Self {
            captured_at,
            columns: Vec::new(),
            unique_candidates: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Parse a snapshot from its JSON form
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_column(mut self, profile: ColumnProfile) -> Self {
        self.columns.push(profile);
        self
    }

    pub fn with_unique_candidate(mut self, profile: UniqueProfile) -> Self {
        self.unique_candidates.push(profile);
        self
    }

    pub fn with_foreign_key(mut self, profile: ForeignKeyProfile) -> Self {
        self.foreign_keys.push(profile);
        self
    }

    /// Null statistics for a column
    pub fn column(&self, schema: &str, table: &str, column: &str) -> Option<&ColumnProfile> {
        self.columns.iter().find(|p| p.key.matches(schema, table, column))
    }

    /// Duplicate statistics for an ordered column set
    pub fn unique_candidate(&self, schema: &str, table: &str, columns: &[&str]) -> Option<&UniqueProfile> {
        self.unique_candidates.iter().find(|p| {
            p.schema.eq_ignore_ascii_case(schema)
                && p.table.eq_ignore_ascii_case(table)
                && p.columns.len() == columns.len()
                && p.columns.iter().zip(columns).all(|(a, b)| a.eq_ignore_ascii_case(b))
        })
    }

    /// Orphan statistics for a referencing column
    pub fn foreign_key(&self, schema: &str, table: &str, column: &str) -> Option<&ForeignKeyProfile> {
        self.foreign_keys.iter().find(|p| p.key.matches(schema, table, column))
    }
}
