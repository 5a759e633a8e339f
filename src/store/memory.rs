//! In-memory ordered store
//!
//! Entries live in a `BTreeMap` so scans are deterministic and key-ordered.
//! Deletes leave a tombstone behind, which scans still report.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use futures_util::future::{self, BoxFuture, FutureExt};
use futures_util::stream::{self, StreamExt};

use crate::document::Document;

use super::errors::{StoreError, StoreResult};
use super::{DocumentStore, ScanEntry, ScanOptions, ScanStream};

/// An ordered in-memory document store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<BTreeMap<String, Option<Document>>>>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store from `(id, document)` pairs
    pub fn from_documents<I, K>(documents: I) -> Self
    where
        I: IntoIterator<Item = (K, Document)>,
        K: Into<String>,
    {
        let entries = documents
            .into_iter()
            .map(|(id, doc)| (id.into(), Some(doc)))
            .collect();
        Self {
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    /// Inserts or replaces a document
    pub fn put(&self, id: impl Into<String>, document: Document) -> StoreResult<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.insert(id.into(), Some(document));
        Ok(())
    }

    /// Deletes a document, leaving a tombstone
    pub fn delete(&self, id: &str) -> StoreResult<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        if let Some(slot) = entries.get_mut(id) {
            *slot = None;
        }
        Ok(())
    }

    fn snapshot(&self, options: &ScanOptions) -> StoreResult<Vec<ScanEntry>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        let limit = options.limit.unwrap_or(usize::MAX);

        let to_entry = |(key, value): (&String, &Option<Document>)| ScanEntry {
            key: key.clone(),
            value: value.clone(),
        };

        let snapshot = if options.reverse {
            entries.iter().rev().take(limit).map(to_entry).collect()
        } else {
            entries.iter().take(limit).map(to_entry).collect()
        };
        Ok(snapshot)
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("store lock poisoned".to_string())
}

impl DocumentStore for MemoryStore {
    fn get(&self, id: &str) -> BoxFuture<'static, StoreResult<Option<Document>>> {
        let result = self
            .entries
            .read()
            .map_err(|_| poisoned())
            .map(|entries| entries.get(id).cloned().flatten());
        future::ready(result).boxed()
    }

    fn scan(&self, options: ScanOptions) -> ScanStream {
        match self.snapshot(&options) {
            Ok(entries) => stream::iter(entries.into_iter().map(Ok)).boxed(),
            Err(e) => stream::once(future::ready(Err(e))).boxed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::TryStreamExt;
    use serde_json::json;

    fn keys(entries: &[ScanEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.key.as_str()).collect()
    }

    #[tokio::test]
    async fn test_get_existing_and_missing() {
        let store = MemoryStore::new();
        store.put("user_1", json!({"name": "Alice"})).unwrap();

        let found = store.get("user_1").await.unwrap();
        assert_eq!(found, Some(json!({"name": "Alice"})));

        let missing = store.get("user_2").await.unwrap();
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn test_delete_leaves_tombstone() {
        let store = MemoryStore::new();
        store.put("a", json!({"n": 1})).unwrap();
        store.put("b", json!({"n": 2})).unwrap();
        store.delete("a").unwrap();

        assert_eq!(store.get("a").await.unwrap(), None);

        let entries: Vec<ScanEntry> = store
            .scan(ScanOptions::unbounded())
            .try_collect()
            .await
            .unwrap();
        assert_eq!(keys(&entries), vec!["a", "b"]);
        assert_eq!(entries[0].value, None);
    }

    #[tokio::test]
    async fn test_scan_is_key_ordered() {
        let store = MemoryStore::from_documents(vec![
            ("c", json!({})),
            ("a", json!({})),
            ("b", json!({})),
        ]);

        let forward: Vec<ScanEntry> = store
            .scan(ScanOptions::unbounded())
            .try_collect()
            .await
            .unwrap();
        assert_eq!(keys(&forward), vec!["a", "b", "c"]);

        let backward: Vec<ScanEntry> = store
            .scan(ScanOptions::unbounded().reversed(true))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(keys(&backward), vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn test_scan_limit() {
        let store = MemoryStore::from_documents((0..10).map(|i| (format!("k{}", i), json!(i))));

        let entries: Vec<ScanEntry> = store
            .scan(ScanOptions::unbounded().with_limit(Some(3)))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(keys(&entries), vec!["k0", "k1", "k2"]);
    }
}
