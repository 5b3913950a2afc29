//! Emission errors
//!
//! Every variant names the file involved. All but `PathCollision` are
//! I/O failures; a collision is caught before anything is written.

use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("Failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write {} for table {table}: {source}", path.display())]
    TableWrite {
        table: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Tables {first} and {second} both map to {}", path.display())]
    PathCollision {
        path: PathBuf,
        first: String,
        second: String,
    },

    #[error("Failed to write {}: {source}", path.display())]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to reconcile {}: {source}", path.display())]
    Reconcile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl EmitError {
    /// Path the failed operation targeted
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::CreateDir { path, .. }
            | Self::TableWrite { path, .. }
            | Self::PathCollision { path, .. }
            | Self::ArtifactWrite { path, .. }
            | Self::Reconcile { path, .. } => path,
        }
    }

    /// Table being written, when the failure belongs to one
    pub fn table(&self) -> Option<&str> {
        match self {
            Self::TableWrite { table, .. } | Self::PathCollision { second: table, .. } => Some(table),
            _ => None,
        }
    }
}
