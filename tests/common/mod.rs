//! Shared fixtures for query integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use aeroquery::document::Document;
use aeroquery::executor::QueryEngine;
use aeroquery::index::FieldIndexEngine;
use aeroquery::store::{DocumentStore, MemoryStore, ScanOptions, ScanStream, StoreResult};
use futures_util::future::BoxFuture;
use serde_json::json;

/// Five people, two of them without a defined age
pub fn people() -> MemoryStore {
    MemoryStore::from_documents(vec![
        ("p1", json!({"name": "ada", "age": 10, "city": "oslo"})),
        ("p2", json!({"name": "bo", "age": null, "city": "rome"})),
        ("p3", json!({"name": "cy", "age": 30, "city": "oslo"})),
        ("p4", json!({"name": "di", "city": "rome"})),
        ("p5", json!({"name": "ed", "age": 5, "city": "oslo"})),
    ])
}

/// Engine over `store` with indexes on `fields`
pub async fn engine_over<S>(store: S, fields: &[&str]) -> QueryEngine<S, FieldIndexEngine>
where
    S: DocumentStore + 'static,
{
    let index = FieldIndexEngine::new(fields.iter().copied());
    index.rebuild_from_store(&store).await.unwrap();
    QueryEngine::new(Arc::new(store), Arc::new(index))
}

pub fn names(docs: &[Document]) -> Vec<&str> {
    docs.iter().filter_map(|d| d["name"].as_str()).collect()
}

/// Store whose point lookups take a configurable time per id
pub struct DelayedStore {
    inner: MemoryStore,
    delays: HashMap<String, u64>,
    pub started: Arc<AtomicUsize>,
}

impl DelayedStore {
    pub fn new(inner: MemoryStore, delays: &[(&str, u64)]) -> Self {
        Self {
            inner,
            delays: delays.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            started: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl DocumentStore for DelayedStore {
    fn get(&self, id: &str) -> BoxFuture<'static, StoreResult<Option<Document>>> {
        let delay = self.delays.get(id).copied().unwrap_or(0);
        let lookup = self.inner.get(id);
        let started = Arc::clone(&self.started);
        Box::pin(async move {
            started.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            lookup.await
        })
    }

    fn scan(&self, options: ScanOptions) -> ScanStream {
        self.inner.scan(options)
    }
}
