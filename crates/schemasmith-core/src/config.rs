//! Configuration schema (schemasmith.toml)

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::diagnostic::{DriftCategory, Severity};
use crate::options::{BuildOptions, ForeignKeyOverride, NullBudget, OptionsError, TighteningMode, TighteningOptions};

/// SQL dialect used to read deployed DDL
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectConfig {
    /// BigQuery SQL dialect
    BigQuery,

    /// Snowflake SQL dialect
    Snowflake,

    /// PostgreSQL SQL dialect
    #[default]
    Postgres,

    /// Generic ANSI SQL
    Ansi,
}

/// Severity threshold overrides for specific drift categories
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeverityThreshold {
    /// Map of category code to severity override
    #[serde(default)]
    pub overrides: HashMap<String, Severity>,
}

impl SeverityThreshold {
    /// Get severity for a category, or its default
    pub fn get_severity(&self, category: DriftCategory) -> Severity {
        self.overrides
            .get(category.as_str())
            .copied()
            .unwrap_or_else(|| category.default_severity())
    }

    /// Set severity override for a category
    pub fn set_override(&mut self, category: DriftCategory, severity: Severity) {
        self.overrides.insert(category.as_str().to_string(), severity);
    }
}

/// `[tightening]` section, validated by `Config::tightening_options`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TighteningConfig {
    #[serde(default = "default_mode")]
    pub mode: String,

    #[serde(default)]
    pub include_platform_auto_indexes: bool,

    #[serde(default)]
    pub null_budget: f64,

    #[serde(default)]
    pub foreign_key_overrides: BTreeMap<String, ForeignKeyOverride>,
}

fn default_mode() -> String {
    TighteningMode::default().as_str().to_string()
}

impl Default for TighteningConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            include_platform_auto_indexes: false,
            null_budget: 0.0,
            foreign_key_overrides: BTreeMap::new(),
        }
    }
}

/// `[drift]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriftConfig {
    /// Severity overrides per category
    #[serde(default)]
    pub severity: SeverityThreshold,

    /// Intended tables (`schema.table`, glob patterns) left out of comparison
    #[serde(default)]
    pub skip_tables: Vec<String>,
}

impl DriftConfig {
    /// Check if a table should be skipped
    pub fn is_table_skipped(&self, table: &str) -> bool {
        self.skip_tables.iter().any(|pattern| {
            if pattern.contains('*') {
                glob_match(&pattern.to_ascii_lowercase(), &table.to_ascii_lowercase())
            } else {
                pattern.eq_ignore_ascii_case(table)
            }
        })
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// SQL dialect of deployed DDL
    #[serde(default)]
    pub dialect: DialectConfig,

    #[serde(default)]
    pub tightening: TighteningConfig,

    #[serde(default)]
    pub build: BuildOptions,

    #[serde(default)]
    pub drift: DriftConfig,
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Self::from_toml(&contents)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Validated decision-engine options
    pub fn tightening_options(&self) -> Result<TighteningOptions, ConfigError> {
        let mode: TighteningMode = self.tightening.mode.parse()?;
        let null_budget = NullBudget::new(self.tightening.null_budget)?;

        Ok(TighteningOptions {
            mode,
            include_platform_auto_indexes: self.tightening.include_platform_auto_indexes,
            foreign_key_overrides: self.tightening.foreign_key_overrides.clone(),
            null_budget,
        })
    }

    /// Graph-builder options agreeing with the tightening section
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            include_platform_auto_indexes: self.tightening.include_platform_auto_indexes,
            ..self.build.clone()
        }
    }
}

/// Glob matching where every `*` matches any run of characters
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    // Position of the last `*` seen and the text position it currently covers up to
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, t));
            p += 1;
        } else if p < pattern.len() && pattern[p] == text[t] {
            p += 1;
            t += 1;
        } else if let Some((star, covered)) = backtrack {
            backtrack = Some((star, covered + 1));
            p = star + 1;
            t = covered + 1;
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid option: {0}")]
    Options(#[from] OptionsError),
}
