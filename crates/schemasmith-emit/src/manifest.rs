//! Emission manifest (manifest.json v1)
//!
//! This schema is STABLE and VERSIONED.
//! Breaking changes require a new version.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use schemasmith_core::{DecisionSummary, TighteningMode};

/// File name of the manifest inside the output directory
pub const MANIFEST_FILE: &str = "manifest.json";

/// Manifest schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ManifestVersion {
    /// Current manifest schema version
    pub const CURRENT: ManifestVersion = ManifestVersion { major: 1, minor: 0 };
}

/// Toggles active during the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toggles {
    pub mode: TighteningMode,
    pub bare_tables: bool,
    pub include_platform_auto_indexes: bool,
    pub reconcile_output_directory: bool,
}

/// One written table artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub module: String,

    /// Logical entity name
    pub logical_name: String,

    /// Emitted `schema.table`
    pub emitted_name: String,

    /// Path relative to the output directory, `/`-separated
    pub path: String,

    /// Hex SHA-256 of the file content
    pub sha256: String,

    /// Rationale codes behind the table's shape
    pub rationale: Vec<String>,
}

/// What one emitter run wrote, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: ManifestVersion,

    /// When the run started
    pub generated_at: DateTime<Utc>,

    /// Wall-clock duration of the run
    pub elapsed_ms: u64,

    pub toggles: Toggles,

    /// Table files written per module
    pub files_per_module: BTreeMap<String, usize>,

    /// Written tables in graph order
    pub tables: Vec<ManifestEntry>,

    /// Decision totals
    pub decisions: DecisionSummary,

    /// Decision report paths, relative to the output directory
    pub decision_reports: Vec<String>,

    /// Stale files removed by reconciliation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<String>,
}

impl Manifest {
    /// Number of table files written
    pub fn file_count(&self) -> usize {
        self.tables.len()
    }

    /// Entry for a logical entity
    pub fn entry(&self, module: &str, logical_name: &str) -> Option<&ManifestEntry> {
        self.tables
            .iter()
            .find(|e| e.module == module && e.logical_name == logical_name)
    }

    /// Copy with timing fields cleared, for comparing runs
    pub fn without_timing(&self) -> Self {
        Self {
            generated_at: DateTime::<Utc>::default(),
            elapsed_ms: 0,
            ..self.clone()
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load a manifest from a file
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> Manifest {
        Manifest {
            version: ManifestVersion::CURRENT,
            generated_at: Utc::now(),
            elapsed_ms: 12,
            toggles: Toggles {
                mode: TighteningMode::Cautious,
                bare_tables: false,
                include_platform_auto_indexes: false,
                reconcile_output_directory: false,
            },
            files_per_module: BTreeMap::from([("Sales".to_string(), 1)]),
            tables: vec![ManifestEntry {
                module: "Sales".into(),
                logical_name: "Order".into(),
                emitted_name: "dbo.Order".into(),
                path: "Sales/Order.sql".into(),
                sha256: "00".into(),
                rationale: vec!["PK".into()],
            }],
            decisions: DecisionSummary::default(),
            decision_reports: vec!["decisions.json".into(), "decisions.md".into()],
            removed: Vec::new(),
        }
    }

    #[test]
    fn timing_is_ignored_when_comparing_runs() {
        let first = manifest();
        let mut second = first.clone();
        second.elapsed_ms = 99;

        assert_ne!(first, second);
        assert_eq!(first.without_timing(), second.without_timing());
    }

    #[test]
    fn manifest_serialization() {
        let manifest = manifest();
        let json = manifest.to_json().unwrap();
        assert!(json.contains("\"cautious\""));
        assert!(!json.contains("\"removed\""));

        let parsed: Manifest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, manifest);
        assert_eq!(parsed.entry("Sales", "Order").unwrap().path, "Sales/Order.sql");
    }
}
