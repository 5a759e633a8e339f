//! Query Streaming Tests
//!
//! Tests for streaming behavior of the executor:
//! - Slow lookups do not block faster ones
//! - The stream ends only after every lookup has settled
//! - Faults surface exactly once and end the stream
//! - Dropping a stream part way is clean

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use aeroquery::config::QueryConfig;
use aeroquery::document::Document;
use aeroquery::executor::{ExecutorErrorCode, ExecutorResult, QueryEngine};
use aeroquery::index::FieldIndexEngine;
use aeroquery::planner::{Filter, Predicate, QueryOptions, SortSpec};
use aeroquery::store::{
    DocumentStore, MemoryStore, ScanEntry, ScanOptions, ScanStream, StoreError, StoreResult,
};
use futures_util::future::BoxFuture;
use futures_util::stream::{self, StreamExt};
use serde_json::json;

use common::{engine_over, names, people, DelayedStore};

// =============================================================================
// Concurrent Resolution
// =============================================================================

/// Filter matching every person through the city index
fn everyone() -> Filter {
    Filter::all().and(Predicate::exists("city", true))
}

/// A slow lookup does not hold back the ones behind it.
#[tokio::test]
async fn test_slow_lookup_emitted_last() {
    let store = DelayedStore::new(people(), &[("p1", 120)]);
    let engine = engine_over(store, &["city"]).await;

    let docs = engine.query_all(&everyone(), &QueryOptions::new()).await.unwrap();

    assert_eq!(docs.len(), 5);
    assert_eq!(names(&docs).last(), Some(&"ada"));
}

/// Sorting waits for every lookup, so delays do not change the order.
#[tokio::test]
async fn test_sorted_result_ignores_delays() {
    let store = DelayedStore::new(people(), &[("p5", 80), ("p3", 40)]);
    let engine = engine_over(store, &["age"]).await;
    let filter = Filter::all().and(Predicate::exists("age", true));
    let options = QueryOptions::new().with_sort(SortSpec::asc("age"));

    let docs = engine.query_all(&filter, &options).await.unwrap();
    assert_eq!(names(&docs), vec!["ed", "ada", "cy"]);
}

/// A satisfied probe emits in index order despite delays.
#[tokio::test]
async fn test_probe_preserves_index_order() {
    let store = DelayedStore::new(people(), &[("p5", 80)]);
    let engine = engine_over(store, &["age"]).await;
    let options = QueryOptions::new().with_sort(SortSpec::asc("age")).with_limit(3);

    let docs = engine.query_all(&Filter::all(), &options).await.unwrap();
    assert_eq!(names(&docs), vec!["ed", "ada", "cy"]);
}

/// Ties at the limit boundary do not depend on lookup latency.
#[tokio::test]
async fn test_sorted_limit_ties_ignore_delays() {
    let documents = || {
        MemoryStore::from_documents(vec![
            ("t1", json!({"name": "a", "age": 1, "city": "x"})),
            ("t2", json!({"name": "b", "age": 2, "city": "x"})),
            ("t3", json!({"name": "c", "city": "x"})),
            ("t4", json!({"name": "d", "city": "x"})),
        ])
    };
    let filter = Filter::all().filter_eq("city", json!("x"));
    let options = QueryOptions::new().with_sort(SortSpec::asc("age")).with_limit(3);

    let mut outcomes = Vec::new();
    for slow in ["t3", "t4"] {
        let store = DelayedStore::new(documents(), &[(slow, 60)]);
        let engine = engine_over(store, &["age", "city"]).await;
        let docs = engine.query_all(&filter, &options).await.unwrap();
        outcomes.push(names(&docs).into_iter().map(str::to_string).collect::<Vec<_>>());
    }

    assert_eq!(outcomes[0], vec!["a", "b", "c"]);
    assert_eq!(outcomes[0], outcomes[1]);
}

/// Window of one still drains every lookup, in index order.
#[tokio::test]
async fn test_single_lookup_window() {
    let store = DelayedStore::new(people(), &[("p2", 20), ("p4", 10)]);
    let index = FieldIndexEngine::new(["city"]);
    index.rebuild_from_store(&store).await.unwrap();
    let config = QueryConfig::default().with_resolver_concurrency(1);
    let engine = QueryEngine::with_config(Arc::new(store), Arc::new(index), config);

    let docs = engine.query_all(&everyone(), &QueryOptions::new()).await.unwrap();
    // oslo before rome, ids ascending within a city
    assert_eq!(names(&docs), vec!["ada", "cy", "ed", "bo", "di"]);
}

/// Documents deleted after indexing are skipped silently.
#[tokio::test]
async fn test_vanished_documents_skipped() {
    let store = people();
    let index = FieldIndexEngine::new(["city"]);
    index.rebuild_from_store(&store).await.unwrap();
    store.delete("p1").unwrap();

    let engine = QueryEngine::new(Arc::new(store), Arc::new(index));
    let filter = Filter::all().filter_eq("city", json!("oslo"));

    let mut docs = engine.query_all(&filter, &QueryOptions::new()).await.unwrap();
    docs.sort_by_key(|d| d["name"].as_str().map(str::to_string));

    assert_eq!(names(&docs), vec!["cy", "ed"]);
    assert_eq!(engine.metrics().snapshot().lookups_dropped, 1);
}

// =============================================================================
// Faults
// =============================================================================

/// Store that scans fine but fails one point lookup
struct FailingLookup {
    inner: MemoryStore,
    failing: &'static str,
}

impl DocumentStore for FailingLookup {
    fn get(&self, id: &str) -> BoxFuture<'static, StoreResult<Option<Document>>> {
        if id == self.failing {
            let fault = StoreError::Unavailable(format!("lookup of {} timed out", id));
            return Box::pin(async move { Err(fault) });
        }
        self.inner.get(id)
    }

    fn scan(&self, options: ScanOptions) -> ScanStream {
        self.inner.scan(options)
    }
}

/// A lookup fault is delivered once as the final item.
#[tokio::test]
async fn test_lookup_fault_surfaces_once() {
    let store = FailingLookup {
        inner: people(),
        failing: "p3",
    };
    let index = FieldIndexEngine::new(["city"]);
    index.rebuild_from_store(&store).await.unwrap();
    let engine = QueryEngine::new(Arc::new(store), Arc::new(index));
    let filter = Filter::all().filter_eq("city", json!("oslo"));

    let items: Vec<ExecutorResult<Document>> =
        engine.query(&filter, &QueryOptions::new()).collect().await;

    let faults: Vec<_> = items.iter().filter_map(|i| i.as_ref().err()).collect();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].code(), ExecutorErrorCode::AeroQueryStoreFault);
    assert!(items.last().map_or(false, |i| i.is_err()));
    assert_eq!(engine.metrics().snapshot().store_faults, 1);
}

/// Store whose scan breaks after the first entry
struct BrokenScan;

impl DocumentStore for BrokenScan {
    fn get(&self, _id: &str) -> BoxFuture<'static, StoreResult<Option<Document>>> {
        Box::pin(async { Ok(None) })
    }

    fn scan(&self, _options: ScanOptions) -> ScanStream {
        stream::iter(vec![
            Ok(ScanEntry {
                key: "k1".into(),
                value: Some(json!({"name": "first"})),
            }),
            Err(StoreError::corrupted("k2", "truncated record")),
            Ok(ScanEntry {
                key: "k3".into(),
                value: Some(json!({"name": "never"})),
            }),
        ])
        .boxed()
    }
}

/// Corruption during a scan is fatal and ends the stream.
#[tokio::test]
async fn test_scan_corruption_is_fatal() {
    let engine = QueryEngine::new(Arc::new(BrokenScan), Arc::new(FieldIndexEngine::no_indexes()));

    let items: Vec<ExecutorResult<Document>> =
        engine.query(&Filter::all(), &QueryOptions::new()).collect().await;

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap()["name"], json!("first"));
    let fault = items[1].as_ref().unwrap_err();
    assert!(fault.is_fatal());
    assert_eq!(fault.key(), Some("k2"));
}

// =============================================================================
// Cancellation
// =============================================================================

/// Dropping after the first result stops further lookups.
#[tokio::test]
async fn test_drop_stops_lookups() {
    let store = DelayedStore::new(people(), &[("p2", 200), ("p3", 200), ("p4", 200), ("p5", 200)]);
    let started = Arc::clone(&store.started);
    let index = FieldIndexEngine::new(["city"]);
    index.rebuild_from_store(&store).await.unwrap();
    let config = QueryConfig::default().with_resolver_concurrency(2);
    let engine = QueryEngine::with_config(Arc::new(store), Arc::new(index), config);

    let mut results = engine.query(&everyone(), &QueryOptions::new());
    let first = results.next().await;
    assert_eq!(first.unwrap().unwrap()["name"], json!("ada"));
    drop(results);

    assert!(started.load(Ordering::SeqCst) <= 3);
    assert_eq!(engine.metrics().snapshot().documents_returned, 1);
}

/// A limit the index applies bounds the lookups issued.
#[tokio::test]
async fn test_index_limit_bounds_lookups() {
    let store = DelayedStore::new(people(), &[]);
    let started = Arc::clone(&store.started);
    let engine = engine_over(store, &["city"]).await;

    let docs = engine
        .query_all(&everyone(), &QueryOptions::new().with_limit(2))
        .await
        .unwrap();

    assert_eq!(docs.len(), 2);
    assert_eq!(started.load(Ordering::SeqCst), 2);
}
