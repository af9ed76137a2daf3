// file: src/index/mod.rs
// description: index schema and registry module exports
// reference: internal module structure

pub mod manager;
pub mod schema;

pub use manager::{BulkStats, Index, IndexManager, WriteMode, WriteOptions, WriteOutcome};
pub use schema::{EngineType, SchemaMapper};
