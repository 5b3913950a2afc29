//! Resolved options for the decision engine and the graph builder
//!
//! Options are validated when they are constructed. The decision engine
//! never sees an unrecognized mode or an out-of-range budget.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::model::DEFAULT_SCHEMA;

/// Strictness of schema tightening, ordered from least to most strict
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TighteningMode {
    /// Tighten only on exhaustive evidence
    Cautious,

    /// Tighten on any evidence showing zero violations
    EvidenceGated,

    /// Tighten unless evidence exceeds the null budget
    Aggressive,
}

impl TighteningMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cautious => "cautious",
            Self::EvidenceGated => "evidence-gated",
            Self::Aggressive => "aggressive",
        }
    }
}

impl Default for TighteningMode {
    fn default() -> Self {
        Self::EvidenceGated
    }
}

impl fmt::Display for TighteningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TighteningMode {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cautious" => Ok(Self::Cautious),
            "evidence-gated" | "evidence_gated" | "evidencegated" => Ok(Self::EvidenceGated),
            "aggressive" => Ok(Self::Aggressive),
            _ => Err(OptionsError::UnknownMode(s.to_string())),
        }
    }
}

/// Fraction of rows allowed to hold NULL before tightening is refused
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct NullBudget(f64);

impl NullBudget {
    pub const ZERO: NullBudget = NullBudget(0.0);

    pub fn new(fraction: f64) -> Result<Self, OptionsError> {
        if fraction.is_finite() && (0.0..=1.0).contains(&fraction) {
            Ok(Self(fraction))
        } else {
            Err(OptionsError::InvalidNullBudget(fraction))
        }
    }

    pub fn fraction(&self) -> f64 {
        self.0
    }

    /// Whether `null_rows` out of `total_rows` fits in the budget
    pub fn admits(&self, null_rows: u64, total_rows: u64) -> bool {
        if null_rows == 0 {
            return true;
        }
        if total_rows == 0 {
            return false;
        }
        (null_rows as f64) <= self.0 * (total_rows as f64)
    }
}

impl Default for NullBudget {
    fn default() -> Self {
        Self::ZERO
    }
}

impl TryFrom<f64> for NullBudget {
    type Error = OptionsError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NullBudget> for f64 {
    fn from(budget: NullBudget) -> Self {
        budget.0
    }
}

/// Explicit override for one relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForeignKeyOverride {
    /// Create the constraint even if orphan rows were observed
    Create,

    /// Never create the constraint
    Suppress,
}

/// Inputs to the decision engine besides the model and the snapshot
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TighteningOptions {
    pub mode: TighteningMode,

    /// Consider indexes generated by the source platform
    #[serde(default)]
    pub include_platform_auto_indexes: bool,

    /// Keyed by `Module.Entity.Attribute` of the referencing attribute
    #[serde(default)]
    pub foreign_key_overrides: BTreeMap<String, ForeignKeyOverride>,

    #[serde(default)]
    pub null_budget: NullBudget,
}

impl TighteningOptions {
    pub fn new(mode: TighteningMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn with_platform_auto_indexes(mut self, include: bool) -> Self {
        self.include_platform_auto_indexes = include;
        self
    }

    pub fn with_null_budget(mut self, fraction: f64) -> Result<Self, OptionsError> {
        self.null_budget = NullBudget::new(fraction)?;
        Ok(self)
    }

    pub fn with_foreign_key_override(mut self, attribute: impl Into<String>, value: ForeignKeyOverride) -> Self {
        self.foreign_key_overrides.insert(attribute.into(), value);
        self
    }

    pub fn foreign_key_override(&self, attribute: &str) -> Option<ForeignKeyOverride> {
        self.foreign_key_overrides.get(attribute).copied()
    }
}

/// Emitted schema and/or table name for one entity
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableNameOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
}

/// Inputs to the graph builder and the emitter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOptions {
    /// Explicit emitted names keyed by `Module.Entity`; always win over projection
    #[serde(default)]
    pub table_names: BTreeMap<String, TableNameOverride>,

    /// Explicit emitted names keyed by `Module.Entity.Attribute`
    #[serde(default)]
    pub column_names: BTreeMap<String, String>,

    /// Emit only the CREATE TABLE statement for each table
    #[serde(default)]
    pub bare_tables: bool,

    /// Schema for entities without a physical schema or override
    #[serde(default = "default_schema")]
    pub default_schema: String,

    /// Remove `.sql` files the current run did not write
    #[serde(default)]
    pub reconcile_output_directory: bool,

    /// Copied from the tightening options; never set independently
    #[serde(skip)]
    pub include_platform_auto_indexes: bool,
}

fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            table_names: BTreeMap::new(),
            column_names: BTreeMap::new(),
            bare_tables: false,
            default_schema: default_schema(),
            reconcile_output_directory: false,
            include_platform_auto_indexes: false,
        }
    }
}

impl BuildOptions {
    /// Build options agreeing with the given tightening options
    pub fn for_tightening(tightening: &TighteningOptions) -> Self {
        Self {
            include_platform_auto_indexes: tightening.include_platform_auto_indexes,
            ..Self::default()
        }
    }

    pub fn with_bare_tables(mut self, bare: bool) -> Self {
        self.bare_tables = bare;
        self
    }

    pub fn with_reconcile(mut self, reconcile: bool) -> Self {
        self.reconcile_output_directory = reconcile;
        self
    }

    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = schema.into();
        self
    }

    pub fn with_table_name(mut self, entity: impl Into<String>, rename: TableNameOverride) -> Self {
        self.table_names.insert(entity.into(), rename);
        self
    }

    pub fn with_column_name(mut self, attribute: impl Into<String>, name: impl Into<String>) -> Self {
        self.column_names.insert(attribute.into(), name.into());
        self
    }

    pub fn table_name(&self, entity: &str) -> Option<&TableNameOverride> {
        self.table_names.get(entity)
    }

    pub fn column_name(&self, attribute: &str) -> Option<&str> {
        self.column_names.get(attribute).map(String::as_str)
    }
}

/// Rejected option values
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OptionsError {
    #[error("Unknown tightening mode '{0}' (expected cautious, evidence-gated or aggressive)")]
    UnknownMode(String),

    #[error("Null budget must be a fraction between 0 and 1, got {0}")]
    InvalidNullBudget(f64),
}
