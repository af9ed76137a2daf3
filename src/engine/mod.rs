// file: src/engine/mod.rs
// description: search engine abstraction and its implementations
// reference: internal module structure

pub mod client;
pub mod flavor;
pub mod memory;

pub use client::ElasticsearchClient;
pub use flavor::EngineFlavor;
pub use memory::{EngineCall, MemoryEngine};

use crate::error::Result;
use crate::models::{Document, Hit};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Remote calls the indexer and search path need from an engine.
///
/// Implementations report a missing document on update or delete as
/// [`SearchError::NotFound`](crate::SearchError::NotFound); every other
/// failure is returned unchanged. Nothing is retried.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    async fn index_exists(&self, index: &str) -> Result<bool>;

    /// Create an index with the given field properties. An index created
    /// concurrently by someone else counts as success.
    async fn create_index(&self, index: &str, properties: &Map<String, Value>) -> Result<()>;

    async fn delete_index(&self, index: &str) -> Result<()>;

    async fn refresh(&self, index: &str) -> Result<()>;

    async fn index_document(&self, index: &str, id: &str, document: &Document) -> Result<()>;

    async fn update_document(&self, index: &str, id: &str, document: &Document) -> Result<()>;

    async fn delete_document(&self, index: &str, id: &str) -> Result<()>;

    /// Run a query body and return hits in engine rank order
    async fn search(&self, index: &str, body: &Value) -> Result<Vec<Hit>>;
}
