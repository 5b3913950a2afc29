//! SchemaSmith emitter
//!
//! The only stage that touches the file system. Writes per-table DDL,
//! the decision report and a manifest describing the run.

pub mod decision_report;
pub mod emitter;
pub mod error;
pub mod manifest;
pub mod render;

pub use emitter::{table_path, Emitter};
pub use error::EmitError;
pub use manifest::{Manifest, ManifestEntry, ManifestVersion, Toggles, MANIFEST_FILE};
pub use render::render_table;
