//! Artifact emitter
//!
//! Writes one DDL file per table, the decision report and the manifest.
//! Output is a function of the graph, the decisions and the options:
//! re-running overwrites every file with identical bytes, and only the
//! manifest's timing fields change.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use schemasmith_core::{BuildOptions, DecisionSet, SchemaGraph, Table};

use crate::decision_report::{self, DECISIONS_JSON, DECISIONS_MARKDOWN};
use crate::error::EmitError;
use crate::manifest::{Manifest, ManifestEntry, ManifestVersion, Toggles, MANIFEST_FILE};
use crate::render::render_table;

/// Attempts per file before an interrupted write becomes fatal
const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Writes schema artifacts into an output directory
#[derive(Debug, Clone, Default)]
pub struct Emitter {
    options: BuildOptions,
}

impl Emitter {
    pub fn new(options: BuildOptions) -> Self {
        Self { options }
    }

    /// Emit every table of the graph
    ///
    /// Stops at the first failed table; files already written stay.
    pub fn emit(&self, graph: &SchemaGraph, decisions: &DecisionSet, out_dir: &Path) -> Result<Manifest, EmitError> {
        let generated_at = Utc::now();
        let started = Instant::now();

        let paths = claim_paths(graph, out_dir)?;
        create_dir(out_dir)?;

        let mut tables = Vec::with_capacity(graph.len());
        let mut files_per_module = BTreeMap::new();
        let mut written = BTreeSet::new();

        for (table, relative) in graph.tables().iter().zip(paths) {
            let path = out_dir.join(&relative);
            if let Some(parent) = path.parent() {
                create_dir(parent)?;
            }

            let sql = render_table(table, self.options.bare_tables);
            write_with_retry(&path, sql.as_bytes()).map_err(|source| EmitError::TableWrite {
                table: table.name.to_string(),
                path: path.clone(),
                source,
            })?;
            tracing::debug!(table = %table.name, path = %relative, "table written");

            *files_per_module.entry(table.module.clone()).or_insert(0) += 1;
            tables.push(ManifestEntry {
                module: table.module.clone(),
                logical_name: table.logical_name.clone(),
                emitted_name: table.name.to_string(),
                path: relative.clone(),
                sha256: hex::encode(Sha256::digest(sql.as_bytes())),
                rationale: decisions
                    .rationale_digest(&table.module, &table.logical_name)
                    .into_iter()
                    .map(String::from)
                    .collect(),
            });
            written.insert(relative);
        }

        let json = serde_json::to_string_pretty(decisions).map_err(io::Error::other);
        write_artifact(out_dir, DECISIONS_JSON, json)?;
        write_artifact(out_dir, DECISIONS_MARKDOWN, Ok(decision_report::render_markdown(decisions)))?;

        let removed = if self.options.reconcile_output_directory {
            reconcile(out_dir, &written)?
        } else {
            Vec::new()
        };

        let manifest = Manifest {
            version: ManifestVersion::CURRENT,
            generated_at,
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            toggles: Toggles {
                mode: decisions.mode,
                bare_tables: self.options.bare_tables,
                include_platform_auto_indexes: self.options.include_platform_auto_indexes,
                reconcile_output_directory: self.options.reconcile_output_directory,
            },
            files_per_module,
            tables,
            decisions: decisions.summary(),
            decision_reports: vec![DECISIONS_JSON.to_string(), DECISIONS_MARKDOWN.to_string()],
            removed,
        };
        write_artifact(out_dir, MANIFEST_FILE, manifest.to_json().map_err(io::Error::other))?;

        tracing::info!(
            files = manifest.file_count(),
            modules = manifest.files_per_module.len(),
            removed = manifest.removed.len(),
            elapsed_ms = manifest.elapsed_ms,
            out_dir = %out_dir.display(),
            "artifacts emitted"
        );

        Ok(manifest)
    }
}

/// `<Module>/<Table>.sql`, relative and `/`-separated
pub fn table_path(table: &Table) -> String {
    format!("{}/{}.sql", sanitize(&table.module), sanitize(&table.name.name))
}

/// Artifact path of every table, in graph order
///
/// Paths are compared case-insensitively so no file is overwritten by a
/// later table, whatever the file system folds.
fn claim_paths(graph: &SchemaGraph, out_dir: &Path) -> Result<Vec<String>, EmitError> {
    let mut claimed: HashMap<String, &Table> = HashMap::with_capacity(graph.len());
    let mut paths = Vec::with_capacity(graph.len());

    for table in graph.tables() {
        let relative = table_path(table);
        if let Some(first) = claimed.insert(relative.to_lowercase(), table) {
            return Err(EmitError::PathCollision {
                path: out_dir.join(&relative),
                first: first.name.to_string(),
                second: table.name.to_string(),
            });
        }
        paths.push(relative);
    }

    Ok(paths)
}

/// Restrict a path segment to `[A-Za-z0-9_.-]`
fn sanitize(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') { c } else { '_' })
        .collect();

    if cleaned.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        cleaned
    }
}

fn create_dir(path: &Path) -> Result<(), EmitError> {
    std::fs::create_dir_all(path).map_err(|source| EmitError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

fn write_artifact(out_dir: &Path, name: &str, contents: io::Result<String>) -> Result<(), EmitError> {
    let path = out_dir.join(name);
    contents
        .and_then(|contents| write_with_retry(&path, contents.as_bytes()))
        .map_err(|source| EmitError::ArtifactWrite { path, source })
}

/// Write a file, retrying only interrupted writes
fn write_with_retry(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut attempt = 1;
    loop {
        match std::fs::write(path, contents) {
            Err(e) if e.kind() == ErrorKind::Interrupted && attempt < MAX_WRITE_ATTEMPTS => {
                tracing::warn!(path = %path.display(), attempt, "write interrupted, retrying");
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// Remove `.sql` files under `out_dir` that this run did not write
fn reconcile(out_dir: &Path, written: &BTreeSet<String>) -> Result<Vec<String>, EmitError> {
    let mut stale: Vec<(String, PathBuf)> = Vec::new();

    for entry in WalkDir::new(out_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| EmitError::Reconcile {
            path: e.path().map_or_else(|| out_dir.to_path_buf(), Path::to_path_buf),
            source: io::Error::from(e),
        })?;
        if !entry.file_type().is_file() || entry.path().extension().map_or(true, |ext| ext != "sql") {
            continue;
        }

        let relative = match entry.path().strip_prefix(out_dir) {
            Ok(relative) => relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
            Err(_) => continue,
        };
        if !written.contains(&relative) {
            stale.push((relative, entry.into_path()));
        }
    }

    let mut removed = Vec::with_capacity(stale.len());
    for (relative, path) in stale {
        std::fs::remove_file(&path).map_err(|source| EmitError::Reconcile {
            path: path.clone(),
            source,
        })?;
        tracing::warn!(path = %relative, "stale artifact removed");
        removed.push(relative);
    }

    Ok(removed)
}
