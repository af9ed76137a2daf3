// file: src/engine/memory.rs
// description: in-process engine double that records every remote call
// reference: used by unit and integration tests in place of a live engine

use crate::engine::SearchEngine;
use crate::error::{Result, SearchError};
use crate::models::{Document, Hit};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// One call received by [`MemoryEngine`]
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    IndexExists(String),
    CreateIndex(String, Map<String, Value>),
    DeleteIndex(String),
    Refresh(String),
    IndexDocument(String, String, Document),
    UpdateDocument(String, String, Document),
    DeleteDocument(String, String),
    Search(String, Value),
}

#[derive(Default)]
struct State {
    calls: Vec<EngineCall>,
    indexes: HashMap<String, BTreeMap<String, Document>>,
    scripted_hits: HashMap<String, Vec<String>>,
    failure: Option<(u16, String)>,
}

/// Engine kept in memory. Documents are stored but never ranked: searches
/// return the ids scripted with [`MemoryEngine::script_hits`], or every stored
/// id in key order when nothing was scripted.
#[derive(Default)]
pub struct MemoryEngine {
    state: Mutex<State>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index(self, index: &str) -> Self {
        self.lock().indexes.entry(index.to_string()).or_default();
        self
    }

    pub fn script_hits<I, S>(&self, index: &str, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock()
            .scripted_hits
            .insert(index.to_string(), ids.into_iter().map(Into::into).collect());
    }

    /// Make every following call fail with the given engine status
    pub fn fail_with(&self, status: u16, body: &str) {
        self.lock().failure = Some((status, body.to_string()));
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    pub fn count_calls(&self, predicate: impl Fn(&EngineCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|call| predicate(call)).count()
    }

    pub fn document(&self, index: &str, id: &str) -> Option<Document> {
        self.lock()
            .indexes
            .get(index)
            .and_then(|docs| docs.get(id))
            .cloned()
    }

    pub fn has_index(&self, index: &str) -> bool {
        self.lock().indexes.contains_key(index)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, call: EngineCall) -> Result<std::sync::MutexGuard<'_, State>> {
        let mut state = self.lock();
        state.calls.push(call);
        if let Some((status, body)) = state.failure.clone() {
            return Err(SearchError::Engine { status, body });
        }
        Ok(state)
    }
}

#[async_trait]
impl SearchEngine for MemoryEngine {
    async fn index_exists(&self, index: &str) -> Result<bool> {
        let state = self.record(EngineCall::IndexExists(index.to_string()))?;
        Ok(state.indexes.contains_key(index))
    }

    async fn create_index(&self, index: &str, properties: &Map<String, Value>) -> Result<()> {
        let mut state = self.record(EngineCall::CreateIndex(
            index.to_string(),
            properties.clone(),
        ))?;
        state.indexes.entry(index.to_string()).or_default();
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<()> {
        let mut state = self.record(EngineCall::DeleteIndex(index.to_string()))?;
        state.indexes.remove(index);
        state.scripted_hits.remove(index);
        Ok(())
    }

    async fn refresh(&self, index: &str) -> Result<()> {
        self.record(EngineCall::Refresh(index.to_string()))?;
        Ok(())
    }

    async fn index_document(&self, index: &str, id: &str, document: &Document) -> Result<()> {
        let mut state = self.record(EngineCall::IndexDocument(
            index.to_string(),
            id.to_string(),
            document.clone(),
        ))?;
        state
            .indexes
            .entry(index.to_string())
            .or_default()
            .insert(id.to_string(), document.clone());
        Ok(())
    }

    async fn update_document(&self, index: &str, id: &str, document: &Document) -> Result<()> {
        let mut state = self.record(EngineCall::UpdateDocument(
            index.to_string(),
            id.to_string(),
            document.clone(),
        ))?;
        match state.indexes.get_mut(index).and_then(|docs| docs.get_mut(id)) {
            Some(existing) => {
                for (field, value) in &document.fields {
                    existing.fields.insert(field.clone(), value.clone());
                }
                Ok(())
            }
            None => Err(SearchError::NotFound {
                index: index.to_string(),
                id: id.to_string(),
            }),
        }
    }

    async fn delete_document(&self, index: &str, id: &str) -> Result<()> {
        let mut state = self.record(EngineCall::DeleteDocument(
            index.to_string(),
            id.to_string(),
        ))?;
        match state.indexes.get_mut(index).and_then(|docs| docs.remove(id)) {
            Some(_) => Ok(()),
            None => Err(SearchError::NotFound {
                index: index.to_string(),
                id: id.to_string(),
            }),
        }
    }

    async fn search(&self, index: &str, body: &Value) -> Result<Vec<Hit>> {
        let state = self.record(EngineCall::Search(index.to_string(), body.clone()))?;
        let ids: Vec<String> = match state.scripted_hits.get(index) {
            Some(ids) => ids.clone(),
            None => state
                .indexes
                .get(index)
                .map(|docs| docs.keys().cloned().collect())
                .unwrap_or_default(),
        };
        Ok(Hit::ranked(ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(title: &str) -> Document {
        let mut fields = Map::new();
        fields.insert("title".to_string(), json!(title));
        Document { fields }
    }

    #[tokio::test]
    async fn test_document_lifecycle() {
        let engine = MemoryEngine::new().with_index("posts");

        engine.index_document("posts", "1", &doc("a")).await.unwrap();
        engine.update_document("posts", "1", &doc("b")).await.unwrap();
        assert_eq!(engine.document("posts", "1"), Some(doc("b")));

        engine.delete_document("posts", "1").await.unwrap();
        let err = engine.delete_document("posts", "1").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_scripted_hits_win_over_stored_order() {
        let engine = MemoryEngine::new().with_index("posts");
        engine.index_document("posts", "1", &doc("a")).await.unwrap();
        engine.index_document("posts", "2", &doc("b")).await.unwrap();

        let hits = engine.search("posts", &json!({})).await.unwrap();
        assert_eq!(hits, Hit::ranked(["1", "2"]));

        engine.script_hits("posts", ["2"]);
        let hits = engine.search("posts", &json!({})).await.unwrap();
        assert_eq!(hits, Hit::ranked(["2"]));
    }

    #[test]
    fn test_seeded_index_exists() {
        let engine = MemoryEngine::new().with_index("posts");
        assert!(tokio_test::block_on(engine.index_exists("posts")).unwrap());
        assert!(!tokio_test::block_on(engine.index_exists("shops")).unwrap());
        assert_eq!(engine.call_count(), 2);
    }

    #[tokio::test]
    async fn test_failure_is_reported_after_recording() {
        let engine = MemoryEngine::new();
        engine.fail_with(503, "unavailable");

        let err = engine.refresh("posts").await.unwrap_err();
        assert!(matches!(err, SearchError::Engine { status: 503, .. }));
        assert_eq!(engine.calls(), vec![EngineCall::Refresh("posts".to_string())]);
    }
}
