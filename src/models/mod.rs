// file: src/models/mod.rs
// description: data models module exports
// reference: internal module structure

pub mod document;
pub mod record;
pub mod search_result;

pub use document::Document;
pub use record::{Column, FieldType, Record, RecordType, Related};
pub use search_result::Hit;
