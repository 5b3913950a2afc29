//! Deployed DDL reading
//!
//! This crate handles:
//! - Parsing DDL text using datafusion-sqlparser-rs
//! - Lowering CREATE TABLE, CREATE INDEX, ALTER TABLE and COMMENT ON
//!   statements into the deployed-schema definition
//! - Extracting location information for parse errors

pub mod parser;

pub use parser::{DdlParseError, DdlReader};
