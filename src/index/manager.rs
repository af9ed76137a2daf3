// file: src/index/manager.rs
// description: per-record-type index registry and document write path
// reference: https://docs.rs/tokio/latest/tokio/sync/struct.RwLock.html

use crate::config::CommitPolicy;
use crate::engine::SearchEngine;
use crate::error::{Result, SearchError};
use crate::index::schema::SchemaMapper;
use crate::models::document::{Document, document_id};
use crate::models::{FieldType, Hit, Record, RecordType};
use crate::utils::Validator;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Engine index bound to one record type.
pub struct Index {
    engine: Arc<dyn SearchEngine>,
    table: String,
    name: String,
    primary_key: String,
    key_type: Option<FieldType>,
    searchable: Vec<String>,
    geo: Vec<String>,
}

impl Index {
    pub(crate) fn new(engine: Arc<dyn SearchEngine>, record_type: &RecordType, default_pk: &str) -> Self {
        let primary_key = record_type
            .primary_key
            .clone()
            .unwrap_or_else(|| default_pk.to_string());

        Self {
            engine,
            table: record_type.table.clone(),
            name: record_type
                .index_name
                .clone()
                .unwrap_or_else(|| record_type.table.clone()),
            key_type: record_type.column_type(&primary_key).cloned(),
            primary_key,
            searchable: record_type.searchable.clone(),
            geo: record_type.geo.clone(),
        }
    }

    /// Create the engine index with the derived schema unless it already exists
    async fn ensure(&self, record_type: &RecordType) -> Result<()> {
        if self.engine.index_exists(&self.name).await? {
            debug!("Index {} already exists", self.name);
            return Ok(());
        }

        let properties = SchemaMapper::new(record_type, &self.primary_key).fields();
        self.engine.create_index(&self.name, &properties).await?;
        info!(
            "Created index {} for {} with {} mapped fields",
            self.name,
            self.table,
            properties.len()
        );
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Declared type of the primary-key column, if the record type declares it
    pub fn key_type(&self) -> Option<&FieldType> {
        self.key_type.as_ref()
    }

    pub fn searchable(&self) -> &[String] {
        &self.searchable
    }

    pub fn geo(&self) -> &[String] {
        &self.geo
    }

    /// Searchable fields that are not geo fields, in declaration order
    pub fn text_fields(&self) -> Vec<String> {
        self.searchable
            .iter()
            .filter(|field| !self.geo.contains(field))
            .cloned()
            .collect()
    }

    pub async fn create(&self, id: &str, document: &Document) -> Result<()> {
        self.engine.index_document(&self.name, id, document).await
    }

    pub async fn update(&self, id: &str, document: &Document) -> Result<()> {
        self.engine.update_document(&self.name, id, document).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.engine.delete_document(&self.name, id).await
    }

    pub async fn search(&self, body: &Value) -> Result<Vec<Hit>> {
        self.engine.search(&self.name, body).await
    }

    pub async fn commit(&self) -> Result<()> {
        self.engine.refresh(&self.name).await
    }
}

/// Document operation requested for one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Update,
    Delete,
}

/// Flags of a write request, validated into a [`WriteMode`] before any remote call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    pub update: bool,
    pub delete: bool,
    /// Refresh after the write; the manager's commit policy decides when unset
    pub commit: Option<bool>,
}

impl WriteOptions {
    pub fn create() -> Self {
        Self::default()
    }

    pub fn update() -> Self {
        Self {
            update: true,
            ..Self::default()
        }
    }

    pub fn delete() -> Self {
        Self {
            delete: true,
            ..Self::default()
        }
    }

    pub fn with_commit(mut self, commit: bool) -> Self {
        self.commit = Some(commit);
        self
    }

    pub fn mode(&self) -> Result<WriteMode> {
        match (self.update, self.delete) {
            (true, true) => Err(SearchError::Config(
                "update and delete can't work together".to_string(),
            )),
            (true, false) => Ok(WriteMode::Update),
            (false, true) => Ok(WriteMode::Delete),
            (false, false) => Ok(WriteMode::Create),
        }
    }
}

/// Result of a document write that reached the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Indexed,
    Updated,
    Deleted,
    /// Update or delete of a document the index does not hold
    Missing,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkStats {
    pub documents_written: usize,
    pub documents_missing: usize,
    pub indexes_committed: usize,
}

/// Registry of indexes keyed by record-type table name.
///
/// Lookups share a read lock that is never held across an engine call.
/// Creating or dropping an index takes the `creation` mutex, checks the
/// registry again, talks to the engine, and only then locks the registry
/// briefly to insert or evict. Concurrent first use creates the schema once,
/// and cached lookups never wait on a slow engine.
pub struct IndexManager {
    engine: Arc<dyn SearchEngine>,
    default_pk: String,
    commit_policy: CommitPolicy,
    bulk_concurrency: usize,
    indexes: RwLock<HashMap<String, Arc<Index>>>,
    creation: Mutex<()>,
}

impl IndexManager {
    pub fn new(engine: Arc<dyn SearchEngine>, default_pk: impl Into<String>) -> Self {
        Self {
            engine,
            default_pk: default_pk.into(),
            commit_policy: CommitPolicy::Immediate,
            bulk_concurrency: 8,
            indexes: RwLock::new(HashMap::new()),
            creation: Mutex::new(()),
        }
    }

    pub fn with_commit_policy(mut self, policy: CommitPolicy) -> Self {
        self.commit_policy = policy;
        self
    }

    pub fn with_bulk_concurrency(mut self, concurrency: usize) -> Self {
        self.bulk_concurrency = concurrency.max(1);
        self
    }

    pub fn commit_policy(&self) -> CommitPolicy {
        self.commit_policy
    }

    async fn cached_index(&self, table: &str) -> Option<Arc<Index>> {
        self.indexes.read().await.get(table).cloned()
    }

    /// Cached index for the record type, created on first use
    pub async fn resolve(&self, record_type: &RecordType) -> Result<Arc<Index>> {
        if let Some(index) = self.cached_index(&record_type.table).await {
            return Ok(index);
        }

        let _creating = self.creation.lock().await;
        if let Some(index) = self.cached_index(&record_type.table).await {
            return Ok(index);
        }

        let index = Index::new(Arc::clone(&self.engine), record_type, &self.default_pk);
        Validator::validate_index_name(&index.name)?;

        if let Some(owner) = self
            .indexes
            .read()
            .await
            .values()
            .find(|other| other.name == index.name)
        {
            return Err(SearchError::Config(format!(
                "Index name '{}' is already bound to '{}'",
                index.name, owner.table
            )));
        }

        index.ensure(record_type).await?;

        let index = Arc::new(index);
        self.indexes
            .write()
            .await
            .insert(record_type.table.clone(), Arc::clone(&index));
        Ok(index)
    }

    /// Write one record's document according to the options.
    pub async fn upsert(&self, record: &dyn Record, options: WriteOptions) -> Result<WriteOutcome> {
        let (index, outcome) = self.write(record, options).await?;

        if options.commit.unwrap_or(self.commit_policy == CommitPolicy::Immediate) {
            index.commit().await?;
        }
        Ok(outcome)
    }

    async fn write(&self, record: &dyn Record, options: WriteOptions) -> Result<(Arc<Index>, WriteOutcome)> {
        let mode = options.mode()?;
        let record_type = record.record_type();
        let index = self.resolve(record_type).await?;

        let id = record
            .field(&index.primary_key)
            .as_ref()
            .and_then(document_id)
            .ok_or_else(|| SearchError::MissingPrimaryKey {
                table: record_type.table.clone(),
                field: index.primary_key.clone(),
            })?;

        let result = match mode {
            WriteMode::Create => {
                debug!("creating document {} in {}", id, index.name);
                let document = Document::extract(record, &index.searchable);
                index.create(&id, &document).await.map(|_| WriteOutcome::Indexed)
            }
            WriteMode::Update => {
                debug!("updating document {} in {}", id, index.name);
                let document = Document::extract(record, &index.searchable);
                index.update(&id, &document).await.map(|_| WriteOutcome::Updated)
            }
            WriteMode::Delete => {
                debug!("deleting document {} from {}", id, index.name);
                index.delete(&id).await.map(|_| WriteOutcome::Deleted)
            }
        };

        match result {
            Err(e) if e.is_not_found() && mode != WriteMode::Create => {
                warn!("Document {} not found in {}, nothing to {:?}", id, index.name, mode);
                Ok((index, WriteOutcome::Missing))
            }
            other => other.map(|outcome| (index, outcome)),
        }
    }

    /// Write many records with bounded concurrency, then refresh each touched
    /// index once. The first failure is returned.
    pub async fn index_all<'a, I>(&self, records: I, options: WriteOptions) -> Result<BulkStats>
    where
        I: IntoIterator<Item = &'a dyn Record>,
    {
        options.mode()?;

        let results: Vec<Result<(Arc<Index>, WriteOutcome)>> = stream::iter(records)
            .map(|record| self.write(record, options))
            .buffer_unordered(self.bulk_concurrency)
            .collect()
            .await;

        let mut stats = BulkStats::default();
        let mut touched: HashMap<String, Arc<Index>> = HashMap::new();

        for result in results {
            let (index, outcome) = result?;
            match outcome {
                WriteOutcome::Missing => stats.documents_missing += 1,
                _ => stats.documents_written += 1,
            }
            touched.entry(index.name.clone()).or_insert(index);
        }

        if options.commit.unwrap_or(self.commit_policy == CommitPolicy::Immediate) {
            for index in touched.values() {
                index.commit().await?;
                stats.indexes_committed += 1;
            }
        }

        info!(
            "Bulk write finished: {} written, {} missing, {} indexes committed",
            stats.documents_written, stats.documents_missing, stats.indexes_committed
        );
        Ok(stats)
    }

    /// Refresh the record type's index so pending writes become searchable
    pub async fn commit(&self, record_type: &RecordType) -> Result<()> {
        self.resolve(record_type).await?.commit().await
    }

    /// Delete the engine index and forget it; the next resolve recreates it
    pub async fn drop_index(&self, record_type: &RecordType) -> Result<()> {
        let _creating = self.creation.lock().await;
        let evicted = self.indexes.write().await.remove(&record_type.table);
        let name = match evicted {
            Some(index) => index.name.clone(),
            None => record_type
                .index_name
                .clone()
                .unwrap_or_else(|| record_type.table.clone()),
        };

        if self.engine.index_exists(&name).await? {
            self.engine.delete_index(&name).await?;
            info!("Dropped index {}", name);
        }
        Ok(())
    }

    pub async fn cached(&self) -> usize {
        self.indexes.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineCall, MemoryEngine};
    use async_trait::async_trait;
    use serde_json::{Map, json};
    use std::time::Duration;

    struct Post {
        record_type: RecordType,
        id: Value,
        title: &'static str,
    }

    impl Record for Post {
        fn record_type(&self) -> &RecordType {
            &self.record_type
        }

        fn field(&self, name: &str) -> Option<Value> {
            match name {
                "id" => Some(self.id.clone()),
                "title" => Some(json!(self.title)),
                _ => None,
            }
        }
    }

    fn posts() -> RecordType {
        RecordType::new("posts").searchable(["title"])
    }

    fn post(id: Value) -> Post {
        Post {
            record_type: posts(),
            id,
            title: "Hello",
        }
    }

    fn manager(engine: &Arc<MemoryEngine>) -> IndexManager {
        IndexManager::new(Arc::clone(engine) as Arc<dyn SearchEngine>, "id")
    }

    /// Engine whose index creation hangs for one index name
    struct SlowCreate {
        inner: MemoryEngine,
        slow_index: &'static str,
    }

    #[async_trait]
    impl SearchEngine for SlowCreate {
        async fn index_exists(&self, index: &str) -> Result<bool> {
            self.inner.index_exists(index).await
        }

        async fn create_index(&self, index: &str, properties: &Map<String, Value>) -> Result<()> {
            if index == self.slow_index {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            self.inner.create_index(index, properties).await
        }

        async fn delete_index(&self, index: &str) -> Result<()> {
            self.inner.delete_index(index).await
        }

        async fn refresh(&self, index: &str) -> Result<()> {
            self.inner.refresh(index).await
        }

        async fn index_document(&self, index: &str, id: &str, document: &Document) -> Result<()> {
            self.inner.index_document(index, id, document).await
        }

        async fn update_document(&self, index: &str, id: &str, document: &Document) -> Result<()> {
            self.inner.update_document(index, id, document).await
        }

        async fn delete_document(&self, index: &str, id: &str) -> Result<()> {
            self.inner.delete_document(index, id).await
        }

        async fn search(&self, index: &str, body: &Value) -> Result<Vec<Hit>> {
            self.inner.search(index, body).await
        }
    }

    #[test]
    fn test_write_options_mode() {
        assert_eq!(WriteOptions::create().mode().unwrap(), WriteMode::Create);
        assert_eq!(WriteOptions::update().mode().unwrap(), WriteMode::Update);
        assert_eq!(WriteOptions::delete().mode().unwrap(), WriteMode::Delete);

        let both = WriteOptions {
            update: true,
            delete: true,
            commit: None,
        };
        assert!(matches!(both.mode(), Err(SearchError::Config(_))));
    }

    #[tokio::test]
    async fn test_resolve_caches_and_creates_once() {
        let engine = Arc::new(MemoryEngine::new());
        let manager = manager(&engine);

        let first = manager.resolve(&posts()).await.unwrap();
        let second = manager.resolve(&posts()).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            engine.count_calls(|call| matches!(call, EngineCall::CreateIndex(..))),
            1
        );
        assert_eq!(manager.cached().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_use_creates_once() {
        let engine = Arc::new(MemoryEngine::new());
        let manager = manager(&engine);
        let record_type = posts();

        let (a, b) = tokio::join!(manager.resolve(&record_type), manager.resolve(&record_type));

        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert_eq!(
            engine.count_calls(|call| matches!(call, EngineCall::CreateIndex(..))),
            1
        );
    }

    #[tokio::test]
    async fn test_cached_lookup_does_not_wait_on_pending_creation() {
        let engine = Arc::new(SlowCreate {
            inner: MemoryEngine::new(),
            slow_index: "reports",
        });
        let manager = Arc::new(IndexManager::new(engine as Arc<dyn SearchEngine>, "id"));
        manager.resolve(&posts()).await.unwrap();

        let pending = tokio::spawn({
            let manager = Arc::clone(&manager);
            async move {
                manager
                    .resolve(&RecordType::new("reports"))
                    .await
                    .map(|index| index.name().to_string())
            }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let cached = tokio::time::timeout(Duration::from_millis(500), manager.resolve(&posts())).await;
        assert_eq!(cached.unwrap().unwrap().name(), "posts");
        assert!(!pending.is_finished());
        pending.abort();
    }

    #[tokio::test]
    async fn test_resolve_skips_creation_when_index_exists() {
        let engine = Arc::new(MemoryEngine::new().with_index("posts"));
        let manager = manager(&engine);

        manager.resolve(&posts()).await.unwrap();
        assert_eq!(
            engine.count_calls(|call| matches!(call, EngineCall::CreateIndex(..))),
            0
        );
    }

    #[tokio::test]
    async fn test_overrides_are_applied() {
        let engine = Arc::new(MemoryEngine::new());
        let manager = manager(&engine);
        let record_type = RecordType::new("articles")
            .primary_key("uid")
            .index_name("blog")
            .searchable(["title", "location"])
            .geo("location");

        let index = manager.resolve(&record_type).await.unwrap();
        assert_eq!(index.name(), "blog");
        assert_eq!(index.table(), "articles");
        assert_eq!(index.primary_key(), "uid");
        assert_eq!(index.text_fields(), vec!["title"]);
        assert!(engine.has_index("blog"));
    }

    #[tokio::test]
    async fn test_index_name_conflict_is_config_error() {
        let engine = Arc::new(MemoryEngine::new());
        let manager = manager(&engine);

        manager
            .resolve(&RecordType::new("a").index_name("shared"))
            .await
            .unwrap();
        let err = manager
            .resolve(&RecordType::new("b").index_name("shared"))
            .await
            .err()
            .expect("expected index name conflict error");
        assert!(matches!(err, SearchError::Config(_)));
    }

    #[tokio::test]
    async fn test_upsert_rejects_update_and_delete_without_remote_calls() {
        let engine = Arc::new(MemoryEngine::new());
        let manager = manager(&engine);

        let options = WriteOptions {
            update: true,
            delete: true,
            commit: Some(true),
        };
        let err = manager.upsert(&post(json!(1)), options).await.unwrap_err();

        assert!(matches!(err, SearchError::Config(_)));
        assert_eq!(engine.call_count(), 0);
    }

    #[tokio::test]
    async fn test_upsert_requires_primary_key() {
        let engine = Arc::new(MemoryEngine::new());
        let manager = manager(&engine);

        let err = manager
            .upsert(&post(Value::Null), WriteOptions::create())
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::MissingPrimaryKey { .. }));
        assert_eq!(
            engine.count_calls(|call| matches!(call, EngineCall::IndexDocument(..))),
            0
        );
    }

    #[tokio::test]
    async fn test_upsert_create_commits_by_default() {
        let engine = Arc::new(MemoryEngine::new());
        let manager = manager(&engine);

        let outcome = manager
            .upsert(&post(json!(1)), WriteOptions::create())
            .await
            .unwrap();

        assert_eq!(outcome, WriteOutcome::Indexed);
        assert_eq!(
            engine.document("posts", "1").unwrap().get("title"),
            Some(&json!("Hello"))
        );
        assert_eq!(
            engine.calls().last(),
            Some(&EngineCall::Refresh("posts".to_string()))
        );
    }

    #[tokio::test]
    async fn test_deferred_policy_skips_refresh() {
        let engine = Arc::new(MemoryEngine::new());
        let manager = manager(&engine).with_commit_policy(CommitPolicy::Deferred);

        manager
            .upsert(&post(json!(1)), WriteOptions::create())
            .await
            .unwrap();
        assert_eq!(
            engine.count_calls(|call| matches!(call, EngineCall::Refresh(_))),
            0
        );

        manager
            .upsert(&post(json!(2)), WriteOptions::create().with_commit(true))
            .await
            .unwrap();
        assert_eq!(
            engine.count_calls(|call| matches!(call, EngineCall::Refresh(_))),
            1
        );
    }

    #[tokio::test]
    async fn test_missing_document_on_update_and_delete_is_suppressed() {
        let engine = Arc::new(MemoryEngine::new());
        let manager = manager(&engine);

        let outcome = manager
            .upsert(&post(json!(9)), WriteOptions::update())
            .await
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Missing);

        let outcome = manager
            .upsert(&post(json!(9)), WriteOptions::delete())
            .await
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Missing);
    }

    #[tokio::test]
    async fn test_engine_errors_propagate() {
        let engine = Arc::new(MemoryEngine::new().with_index("posts"));
        let manager = manager(&engine);
        manager.resolve(&posts()).await.unwrap();

        engine.fail_with(500, "shard failure");
        let err = manager
            .upsert(&post(json!(1)), WriteOptions::delete())
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Engine { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_drop_index_evicts_cache() {
        let engine = Arc::new(MemoryEngine::new());
        let manager = manager(&engine);

        manager.resolve(&posts()).await.unwrap();
        manager.drop_index(&posts()).await.unwrap();

        assert!(!engine.has_index("posts"));
        assert_eq!(manager.cached().await, 0);

        manager.resolve(&posts()).await.unwrap();
        assert_eq!(
            engine.count_calls(|call| matches!(call, EngineCall::CreateIndex(..))),
            2
        );
    }

    #[tokio::test]
    async fn test_index_all_commits_once() {
        let engine = Arc::new(MemoryEngine::new());
        let manager = manager(&engine);

        let records = vec![post(json!(1)), post(json!(2)), post(json!(3))];
        let stats = manager
            .index_all(records.iter().map(|r| r as &dyn Record), WriteOptions::create())
            .await
            .unwrap();

        assert_eq!(stats.documents_written, 3);
        assert_eq!(stats.indexes_committed, 1);
        assert_eq!(
            engine.count_calls(|call| matches!(call, EngineCall::Refresh(_))),
            1
        );
    }
}
