//! schemasmith core
//!
//! Value types shared by every stage: the logical model, profile
//! observations, options, decisions, the intended schema graph, the
//! deployed-schema definition and the drift report.
//! Never rename rationale or drift codes - they are part of the output formats.

pub mod config;
pub mod decision;
pub mod deployed;
pub mod diagnostic;
pub mod graph;
pub mod model;
pub mod options;
pub mod profile;
pub mod report;

pub use config::{Config, ConfigError, DialectConfig, DriftConfig, SeverityThreshold};
pub use decision::{
    AttributeId, ColumnDecision, DecisionCounts, DecisionSet, DecisionSummary, IndexDecision, IndexId,
    Nullability, Rationale, Relationship, RelationshipDecision, Uniqueness,
};
pub use deployed::{DeployedColumn, DeployedForeignKey, DeployedIndex, DeployedSchema, DeployedTable};
pub use diagnostic::{
    DriftCategory, DriftEntry, Location, ParityCheck, ParityConfirmation, Severity, UnsupportedCheck,
    UnsupportedNotice,
};
pub use graph::{Column, ForeignKey, Index, OnDelete, QualifiedName, SchemaGraph, Table, TableId};
pub use model::{
    Attribute, AttributeReference, DataType, DeleteRule, Entity, EntityRef, LogicalSchemaModel, Module,
    PhysicalTable, DEFAULT_SCHEMA,
};
pub use options::{
    BuildOptions, ForeignKeyOverride, NullBudget, OptionsError, TableNameOverride, TighteningMode,
    TighteningOptions,
};
pub use profile::{ColumnKey, ColumnProfile, ForeignKeyProfile, ProfileSnapshot, SamplingStrategy, UniqueProfile};
pub use report::{DriftReport, ReportSummary, ReportVersion};
