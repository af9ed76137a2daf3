// file: src/query/mod.rs
// description: query translation and result mapping module exports
// reference: internal module structure

pub mod results;
pub mod translator;

pub use results::{HitSet, ResultMapper, SqlParam, SqlSelect, StoreQuery};
pub use translator::{GeoFilter, GeoPoint, Operator, QueryTranslator, SearchParams};
