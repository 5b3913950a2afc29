//! SchemaSmith engine - Core business logic
//!
//! This crate implements the pure stages of the pipeline:
//! - Decision engine (tightening verdicts)
//! - Schema graph builder
//! - Drift detection against a deployed definition

pub mod decisions;
pub mod drift_detector;
pub mod graph_builder;

pub use decisions::DecisionEngine;
pub use drift_detector::{DriftDetection, DriftDetector};
pub use graph_builder::{BuildError, GraphBuilder};
