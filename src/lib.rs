// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/readme.md"))]

pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod models;
pub mod query;
pub mod utils;

pub use backend::SearchBackend;
pub use config::{CommitPolicy, Config, EngineConfig, SearchConfig};
pub use engine::{ElasticsearchClient, EngineFlavor, MemoryEngine, SearchEngine};
pub use error::{Result, SearchError};
pub use index::{
    BulkStats, EngineType, Index, IndexManager, SchemaMapper, WriteMode, WriteOptions,
    WriteOutcome,
};
pub use models::{Column, Document, FieldType, Hit, Record, RecordType, Related};
pub use query::{
    GeoFilter, GeoPoint, HitSet, Operator, QueryTranslator, ResultMapper, SearchParams, SqlParam,
    SqlSelect, StoreQuery,
};
pub use utils::Validator;
