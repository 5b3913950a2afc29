//! Drift report schema (stable v1)
//!
//! This schema is STABLE and VERSIONED.
//! Breaking changes require a new version.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::diagnostic::{DriftCategory, DriftEntry, ParityConfirmation, Severity, UnsupportedNotice};

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Summary statistics for a report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Number of intended tables compared
    pub tables_checked: usize,

    /// Total number of drift entries
    pub total: usize,

    /// Number of errors
    pub errors: usize,

    /// Number of warnings
    pub warnings: usize,

    /// Number of info entries
    pub info: usize,

    /// Number of parity confirmations
    pub parity: usize,
}

/// Comparison report (drift.json v1)
///
/// Contains no timestamps: two comparisons of the same inputs serialize
/// identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    /// Schema version
    pub version: ReportVersion,

    /// Summary statistics
    pub summary: ReportSummary,

    /// Every drift found, in table order
    pub drift: Vec<DriftEntry>,

    /// Every check that found no drift, in table order
    pub parity: Vec<ParityConfirmation>,

    /// Comparisons not performed
    pub unsupported: Vec<UnsupportedNotice>,
}

impl DriftReport {
    /// Create a report from comparison results
    pub fn new(
        tables_checked: usize,
        drift: Vec<DriftEntry>,
        parity: Vec<ParityConfirmation>,
        unsupported: Vec<UnsupportedNotice>,
    ) -> Self {
        let summary = ReportSummary {
            tables_checked,
            total: drift.len(),
            errors: drift.iter().filter(|d| d.severity == Severity::Error).count(),
            warnings: drift.iter().filter(|d| d.severity == Severity::Warn).count(),
            info: drift.iter().filter(|d| d.severity == Severity::Info).count(),
            parity: parity.len(),
        };

        Self {
            version: ReportVersion::CURRENT,
            summary,
            drift,
            parity,
            unsupported,
        }
    }

    /// Check if the report has any errors
    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }

    /// Whether any entry reaches the given severity (CI gate)
    pub fn fails_at(&self, threshold: Severity) -> bool {
        self.drift.iter().any(|d| d.severity >= threshold)
    }

    /// No drift of any severity
    pub fn is_clean(&self) -> bool {
        self.drift.is_empty()
    }

    /// Entries of one category
    pub fn entries(&self, category: DriftCategory) -> impl Iterator<Item = &DriftEntry> {
        self.drift.iter().filter(move |d| d.category == category)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self.to_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Plain-text summary for terminals and PR comments
    pub fn render_summary(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(
            out,
            "Drift report v{}: {} table(s) checked, {} drift ({} error, {} warn, {} info), {} parity confirmation(s)",
            self.version,
            self.summary.tables_checked,
            self.summary.total,
            self.summary.errors,
            self.summary.warnings,
            self.summary.info,
            self.summary.parity,
        );

        for entry in &self.drift {
            let _ = write!(out, "  [{}] {} {}", entry.severity, entry.category, entry.message);
            if let (Some(expected), Some(actual)) = (&entry.expected, &entry.actual) {
                let _ = write!(out, " (expected {}, found {})", expected, actual);
            }
            out.push('\n');
        }

        for notice in &self.unsupported {
            let _ = writeln!(out, "  [unsupported] {} {}", notice.check, notice.message);
        }

        out
    }
}
