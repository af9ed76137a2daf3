// file: src/backend.rs
// description: search backend facade wiring indexes, translation and result mapping to one engine
// reference: entry point used by host applications and the cli

use crate::config::{Config, SearchConfig};
use crate::engine::{ElasticsearchClient, SearchEngine};
use crate::error::Result;
use crate::index::{BulkStats, Index, IndexManager, WriteOptions, WriteOutcome};
use crate::models::{Hit, Record, RecordType};
use crate::query::{QueryTranslator, ResultMapper, SearchParams, StoreQuery};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

pub struct SearchBackend {
    engine: Arc<dyn SearchEngine>,
    indexes: IndexManager,
    translator: QueryTranslator,
}

impl SearchBackend {
    pub fn new(engine: Arc<dyn SearchEngine>, config: &SearchConfig) -> Self {
        let indexes = IndexManager::new(Arc::clone(&engine), config.primary_key.clone())
            .with_commit_policy(config.commit)
            .with_bulk_concurrency(config.bulk_concurrency);

        Self {
            engine,
            indexes,
            translator: QueryTranslator::new(config),
        }
    }

    /// Connect to the configured engine over HTTP
    pub async fn connect(config: &Config) -> Result<Self> {
        let client = ElasticsearchClient::connect(&config.engine, &config.search.index_name).await?;
        info!("Search backend ready ({:?})", client.flavor());
        Ok(Self::new(Arc::new(client), &config.search))
    }

    pub fn engine(&self) -> &Arc<dyn SearchEngine> {
        &self.engine
    }

    pub fn indexes(&self) -> &IndexManager {
        &self.indexes
    }

    pub fn translator(&self) -> &QueryTranslator {
        &self.translator
    }

    pub async fn index(&self, record_type: &RecordType) -> Result<Arc<Index>> {
        self.indexes.resolve(record_type).await
    }

    pub async fn upsert(&self, record: &dyn Record, options: WriteOptions) -> Result<WriteOutcome> {
        self.indexes.upsert(record, options).await
    }

    pub async fn index_all<'a, I>(&self, records: I, options: WriteOptions) -> Result<BulkStats>
    where
        I: IntoIterator<Item = &'a dyn Record>,
    {
        self.indexes.index_all(records, options).await
    }

    pub async fn commit(&self, record_type: &RecordType) -> Result<()> {
        self.indexes.commit(record_type).await
    }

    pub async fn drop_index(&self, record_type: &RecordType) -> Result<()> {
        self.indexes.drop_index(record_type).await
    }

    /// Query body that a search with these parameters would send
    pub async fn translate(&self, record_type: &RecordType, params: &SearchParams) -> Result<Value> {
        let index = self.index(record_type).await?;
        self.translator.translate(&index, params)
    }

    pub async fn search_hits(&self, record_type: &RecordType, params: &SearchParams) -> Result<Vec<Hit>> {
        let index = self.index(record_type).await?;
        let body = self.translator.translate(&index, params)?;
        let hits = index.search(&body).await?;
        debug!("{} hits from {}", hits.len(), index.name());
        Ok(hits)
    }

    /// Search the record type's index and narrow `query` to the hits,
    /// ordered by rank when the parameters ask for it.
    pub async fn msearch<Q: StoreQuery>(
        &self,
        record_type: &RecordType,
        query: Q,
        params: &SearchParams,
    ) -> Result<Q> {
        let index = self.index(record_type).await?;
        let body = self.translator.translate(&index, params)?;
        let hits = index.search(&body).await?;
        debug!("{} hits from {}", hits.len(), index.name());

        Ok(ResultMapper::apply(
            query,
            index.primary_key(),
            index.key_type(),
            &hits,
            params.rank_order,
        ))
    }
}
