//! Query engine
//!
//! Builds and runs the streaming pipeline for one query:
//!
//! 1. Select a candidate source (probe, direct index, or full scan)
//! 2. Deduplicate index references
//! 3. Resolve identifiers to documents with concurrent lookups
//! 4. Re-check every document against the original filter
//! 5. Sort, if the path still owes a sort
//! 6. Limit, if the path still owes a limit
//!
//! The pipeline is lazy: nothing touches the store until the returned
//! stream is polled. Dropping the stream drops every stage and every
//! outstanding lookup.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future;
use futures_util::stream::{self, BoxStream, Stream, StreamExt, TryStreamExt};
use uuid::Uuid;

use crate::config::QueryConfig;
use crate::document::Document;
use crate::index::IndexEngine;
use crate::observability::{Logger, MetricsRegistry, ObservationScope};
use crate::planner::{
    CandidatePlan, CandidateSelector, CandidateSource, Filter, QueryExplain, QueryOptions,
    QueryPath,
};
use crate::store::{DocumentStore, DocumentStream};

use super::dedup::Deduplicator;
use super::errors::{ExecutorError, ExecutorResult};
use super::filters::PredicateFilter;
use super::limiter::ResultLimiter;
use super::resolver::ValueResolver;
use super::sorter::ResultSorter;

/// Result stream of a query
pub type QueryStream = BoxStream<'static, ExecutorResult<Document>>;

/// Streaming query engine over a document store and an index engine.
///
/// Both collaborators are injected once and shared read-only by every
/// query, so one engine can serve concurrent queries.
pub struct QueryEngine<S: ?Sized, E: ?Sized> {
    store: Arc<S>,
    index: Arc<E>,
    config: QueryConfig,
    metrics: Arc<MetricsRegistry>,
}

impl<S, E> QueryEngine<S, E>
where
    S: DocumentStore + ?Sized + 'static,
    E: IndexEngine + ?Sized + 'static,
{
    /// Creates an engine with default configuration
    pub fn new(store: Arc<S>, index: Arc<E>) -> Self {
        Self::with_config(store, index, QueryConfig::default())
    }

    /// Creates an engine with explicit configuration
    pub fn with_config(store: Arc<S>, index: Arc<E>, config: QueryConfig) -> Self {
        Self {
            store,
            index,
            config,
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Query counters shared by every query of this engine
    pub fn metrics(&self) -> Arc<MetricsRegistry> {
        Arc::clone(&self.metrics)
    }

    /// Runs a query and returns its result stream.
    ///
    /// A store or index fault is emitted once as an `Err` item, after which
    /// the stream ends. Lookups that find nothing are skipped silently.
    pub fn query(&self, filter: &Filter, options: &QueryOptions) -> QueryStream {
        let query_id = Uuid::new_v4().to_string();
        let scope = ObservationScope::with_fields("QUERY", &[("query_id", &query_id)]);
        self.metrics.increment_queries_executed();

        let store = Arc::clone(&self.store);
        let index = Arc::clone(&self.index);
        let metrics = Arc::clone(&self.metrics);
        let window = self.config.resolver_concurrency;
        let filter = filter.clone();
        let options = options.clone();

        let pipeline = stream::once(async move {
            let selected = CandidateSelector::new(store.as_ref(), index.as_ref())
                .select(&filter, &options)
                .await;

            match selected {
                Ok(plan) => {
                    record_path(&metrics, plan.path, &query_id);
                    assemble(plan, store, index, filter, metrics, window)
                }
                Err(fault) => stream::once(future::ready(Err(fault))).boxed(),
            }
        })
        .flatten()
        .map_err(ExecutorError::from);

        let fused = fuse_on_error(pipeline.boxed());
        TracedQuery::new(fused, scope, Arc::clone(&self.metrics)).boxed()
    }

    /// Runs a query and collects every result
    pub async fn query_all(
        &self,
        filter: &Filter,
        options: &QueryOptions,
    ) -> ExecutorResult<Vec<Document>> {
        self.query(filter, options).try_collect().await
    }

    /// Reports the path `query` would take without resolving documents.
    ///
    /// A bounded sorted query still runs the sort-limit probe against the
    /// index, since the path depends on what it returns.
    pub async fn explain(
        &self,
        filter: &Filter,
        options: &QueryOptions,
    ) -> ExecutorResult<QueryExplain> {
        let plan = CandidateSelector::new(self.store.as_ref(), self.index.as_ref())
            .select(filter, options)
            .await?;
        Ok(plan.explain(options))
    }
}

fn record_path(metrics: &MetricsRegistry, path: QueryPath, query_id: &str) {
    match path {
        QueryPath::IndexDirect => metrics.increment_index_paths(),
        QueryPath::FullScan => metrics.increment_full_scans(),
        QueryPath::ProbeSatisfied => metrics.increment_probe_hits(),
        QueryPath::ProbeFallbackIndex => {
            metrics.increment_probe_fallbacks();
            metrics.increment_index_paths();
        }
        QueryPath::ProbeFallbackScan => {
            metrics.increment_probe_fallbacks();
            metrics.increment_full_scans();
        }
    }
    Logger::trace(
        "QUERY_PATH",
        &[("path", path.as_str()), ("query_id", query_id)],
    );
}

/// Chains the stages a plan still needs
fn assemble<S, E>(
    plan: CandidatePlan,
    store: Arc<S>,
    index: Arc<E>,
    filter: Filter,
    metrics: Arc<MetricsRegistry>,
    window: usize,
) -> DocumentStream
where
    S: DocumentStore + ?Sized + 'static,
    E: IndexEngine + ?Sized + 'static,
{
    let documents = match plan.source {
        CandidateSource::References(references) => {
            let ids = Deduplicator::apply(references);
            let resolver = ValueResolver::new(ids, store, metrics).with_max_in_flight(window);
            if plan.preserve_order {
                resolver.preserving_order().boxed()
            } else {
                resolver.boxed()
            }
        }
        CandidateSource::Documents(documents) => documents,
    };

    let filtered = PredicateFilter::new(index, filter).apply(documents);

    let sorted = match plan.sort {
        Some(spec) => ResultSorter::new(spec).apply(filtered),
        None => filtered,
    };

    match plan.post_limit {
        Some(limit) => ResultLimiter::new(limit).apply(sorted),
        None => sorted,
    }
}

/// Ends the stream after its first error
fn fuse_on_error<T, E>(
    items: BoxStream<'static, Result<T, E>>,
) -> BoxStream<'static, Result<T, E>>
where
    T: Send + 'static,
    E: Send + 'static,
{
    items
        .scan(false, |failed, item| {
            if *failed {
                return future::ready(None);
            }
            *failed = item.is_err();
            future::ready(Some(item))
        })
        .boxed()
}

/// Closes the query's observation scope when the stream finishes.
///
/// Returned documents are counted once: at the end, at the first fault, or
/// when the stream is dropped early.
struct TracedQuery {
    inner: QueryStream,
    scope: Option<ObservationScope>,
    metrics: Arc<MetricsRegistry>,
    returned: u64,
}

impl TracedQuery {
    fn new(inner: QueryStream, scope: ObservationScope, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            inner,
            scope: Some(scope),
            metrics,
            returned: 0,
        }
    }
}

impl Stream for TracedQuery {
    type Item = ExecutorResult<Document>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let polled = this.inner.poll_next_unpin(cx);

        match &polled {
            Poll::Ready(Some(Ok(_))) => this.returned += 1,
            Poll::Ready(Some(Err(err))) => {
                this.metrics.increment_store_faults();
                this.metrics.add_documents_returned(this.returned);
                if let Some(scope) = this.scope.take() {
                    if err.is_fatal() {
                        scope.fail_fatal(&err.to_string());
                    } else {
                        scope.fail(&err.to_string());
                    }
                }
            }
            Poll::Ready(None) => {
                if let Some(scope) = this.scope.take() {
                    this.metrics.add_documents_returned(this.returned);
                    scope.complete_with_fields(&[("returned", &this.returned.to_string())]);
                }
            }
            Poll::Pending => {}
        }

        polled
    }
}

impl Drop for TracedQuery {
    fn drop(&mut self) {
        // Scope still open: cancelled before the end. Dropping it logs
        // QUERY_INCOMPLETE.
        if self.scope.take().is_some() {
            self.metrics.add_documents_returned(self.returned);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::errors::ExecutorErrorCode;
    use crate::index::{FieldIndexEngine, IndexQuery, IndexReference};
    use crate::planner::{Predicate, SortSpec};
    use crate::store::{MemoryStore, ScanOptions, ScanStream, StoreError, StoreResult};
    use futures_util::future::BoxFuture;
    use serde_json::{json, Value};

    fn people() -> MemoryStore {
        MemoryStore::from_documents(vec![
            ("u1", json!({"name": "a", "age": 10})),
            ("u2", json!({"name": "b", "age": null})),
            ("u3", json!({"name": "c", "age": 30})),
            ("u4", json!({"name": "d"})),
            ("u5", json!({"name": "e", "age": 5})),
        ])
    }

    async fn engine(
        fields: &[&str],
    ) -> QueryEngine<MemoryStore, FieldIndexEngine> {
        let store = people();
        let index = FieldIndexEngine::new(fields.iter().copied());
        index.rebuild_from_store(&store).await.unwrap();
        QueryEngine::new(Arc::new(store), Arc::new(index))
    }

    fn names(docs: &[Document]) -> Vec<&str> {
        docs.iter().filter_map(|d| d["name"].as_str()).collect()
    }

    fn sorted_limited(field: &str, limit: usize) -> QueryOptions {
        QueryOptions::new().with_sort(SortSpec::asc(field)).with_limit(limit)
    }

    #[tokio::test]
    async fn test_sort_limit_probe_satisfied() {
        let engine = engine(&["age"]).await;
        let docs = engine.query_all(&Filter::all(), &sorted_limited("age", 3)).await.unwrap();

        assert_eq!(names(&docs), vec!["e", "a", "c"]);
        let snapshot = engine.metrics().snapshot();
        assert_eq!(snapshot.probe_hits, 1);
        assert_eq!(snapshot.documents_returned, 3);
    }

    #[tokio::test]
    async fn test_sort_limit_without_index_matches() {
        let engine = engine(&[]).await;
        let docs = engine.query_all(&Filter::all(), &sorted_limited("age", 3)).await.unwrap();

        assert_eq!(names(&docs), vec!["e", "a", "c"]);
        let snapshot = engine.metrics().snapshot();
        assert_eq!(snapshot.probe_fallbacks, 1);
        assert_eq!(snapshot.full_scans, 1);
    }

    #[tokio::test]
    async fn test_probe_fallback_enforces_limit_after_sort() {
        let engine = engine(&["age"]).await;
        let docs = engine.query_all(&Filter::all(), &sorted_limited("age", 4)).await.unwrap();

        // Three defined ages, then the first undefined in key order
        assert_eq!(names(&docs), vec!["e", "a", "c", "b"]);
    }

    #[tokio::test]
    async fn test_unsorted_unbounded_returns_matching_set() {
        let engine = engine(&["age"]).await;
        let filter = Filter::all().and(Predicate::gte("age", json!(6)));

        let mut docs = engine.query_all(&filter, &QueryOptions::new()).await.unwrap();
        docs.sort_by_key(|d| d["name"].as_str().map(str::to_string));

        assert_eq!(names(&docs), vec!["a", "c"]);
        assert_eq!(engine.metrics().snapshot().index_paths, 1);
    }

    #[tokio::test]
    async fn test_zero_matches_ends_cleanly() {
        let engine = engine(&["age"]).await;
        let filter = Filter::all().filter_eq("age", json!(99));

        let docs = engine.query_all(&filter, &QueryOptions::new()).await.unwrap();
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn test_explain_paths() {
        let engine = engine(&["age"]).await;

        let explain = engine.explain(&Filter::all(), &sorted_limited("age", 2)).await.unwrap();
        assert_eq!(explain.path, QueryPath::ProbeSatisfied);
        assert!(!explain.streaming_sort);

        let explain = engine.explain(&Filter::all(), &QueryOptions::new().with_limit(2)).await.unwrap();
        assert_eq!(explain.path, QueryPath::FullScan);
        assert_eq!(explain.post_limit, Some(2));

        // Explain does not count as execution
        assert_eq!(engine.metrics().snapshot().queries_executed, 0);
    }

    /// Index engine that returns the same document twice, then faults
    struct Flaky {
        fault: bool,
    }

    impl IndexEngine for Flaky {
        fn query(&self, _filter: &Filter, _options: &ScanOptions) -> IndexQuery {
            let mut items: Vec<StoreResult<IndexReference>> = vec![
                Ok(IndexReference::new(vec!["k".into(), "1".into(), "u1".into()])),
                Ok(IndexReference::new(vec!["k".into(), "2".into(), "u1".into()])),
            ];
            if self.fault {
                items.push(Err(StoreError::IndexFault("cursor lost".into())));
                items.push(Ok(IndexReference::for_document("u3")));
            }
            IndexQuery::Candidates {
                references: stream::iter(items).boxed(),
                limit_applied: false,
            }
        }

        fn matches(&self, document: &Document, filter: &Filter) -> bool {
            crate::index::FilterMatcher::matches(document, filter)
        }
    }

    #[tokio::test]
    async fn test_duplicate_references_resolve_once() {
        let engine = QueryEngine::new(Arc::new(people()), Arc::new(Flaky { fault: false }));
        let docs = engine.query_all(&Filter::all(), &QueryOptions::new()).await.unwrap();
        assert_eq!(names(&docs), vec!["a"]);
    }

    #[tokio::test]
    async fn test_index_fault_surfaces_once() {
        let engine = QueryEngine::new(Arc::new(people()), Arc::new(Flaky { fault: true }));
        let items: Vec<ExecutorResult<Document>> =
            engine.query(&Filter::all(), &QueryOptions::new()).collect().await;

        let errors: Vec<&ExecutorError> = items.iter().filter_map(|i| i.as_ref().err()).collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code(), ExecutorErrorCode::AeroQueryIndexFault);
        assert!(items.last().map_or(false, |i| i.is_err()));
        assert_eq!(engine.metrics().snapshot().store_faults, 1);
    }

    /// Index engine that serves every query but never applies the limit
    struct Unbounded;

    impl IndexEngine for Unbounded {
        fn query(&self, _filter: &Filter, _options: &ScanOptions) -> IndexQuery {
            let references: Vec<StoreResult<IndexReference>> = ["u1", "u2", "u3", "u4", "u5"]
                .into_iter()
                .map(|id| Ok(IndexReference::for_document(id)))
                .collect();
            IndexQuery::Candidates {
                references: stream::iter(references).boxed(),
                limit_applied: false,
            }
        }

        fn matches(&self, document: &Document, filter: &Filter) -> bool {
            crate::index::FilterMatcher::matches(document, filter)
        }
    }

    #[tokio::test]
    async fn test_limit_enforced_when_engine_ignores_it() {
        let engine = QueryEngine::new(Arc::new(people()), Arc::new(Unbounded));
        let options = QueryOptions::new().with_limit(2);

        let explain = engine.explain(&Filter::all(), &options).await.unwrap();
        assert_eq!(explain.path, QueryPath::IndexDirect);
        assert_eq!(explain.post_limit, Some(2));

        let docs = engine.query_all(&Filter::all(), &options).await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(engine.metrics().snapshot().documents_returned, 2);
    }

    /// Store whose lookups are corrupted
    struct Corrupt;

    impl DocumentStore for Corrupt {
        fn get(&self, id: &str) -> BoxFuture<'static, StoreResult<Option<Value>>> {
            let id = id.to_string();
            Box::pin(async move { Err(StoreError::corrupted(id, "bad checksum")) })
        }

        fn scan(&self, _options: ScanOptions) -> ScanStream {
            stream::iter(vec![
                Err(StoreError::Unavailable("closed".into())),
                Err(StoreError::Unavailable("closed".into())),
            ])
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_corruption_is_fatal() {
        let engine = QueryEngine::new(Arc::new(Corrupt), Arc::new(Flaky { fault: false }));
        let items: Vec<ExecutorResult<Document>> =
            engine.query(&Filter::all(), &QueryOptions::new()).collect().await;

        assert_eq!(items.len(), 1);
        let err = items[0].as_ref().unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.key(), Some("u1"));
    }

    #[tokio::test]
    async fn test_scan_fault_surfaces_once() {
        let engine = QueryEngine::new(Arc::new(Corrupt), Arc::new(FieldIndexEngine::no_indexes()));
        let items: Vec<ExecutorResult<Document>> =
            engine.query(&Filter::all(), &QueryOptions::new()).collect().await;

        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].as_ref().unwrap_err().code(),
            ExecutorErrorCode::AeroQueryStoreFault
        );
    }

    #[tokio::test]
    async fn test_sort_fault_surfaces_once() {
        let engine = QueryEngine::new(Arc::new(Corrupt), Arc::new(FieldIndexEngine::no_indexes()));
        let options = QueryOptions::new().with_sort(SortSpec::asc("age"));
        let items: Vec<ExecutorResult<Document>> = engine.query(&Filter::all(), &options).collect().await;

        assert_eq!(items.len(), 1);
        assert!(items[0].is_err());
    }

    #[tokio::test]
    async fn test_dropping_stream_is_clean() {
        let engine = engine(&[]).await;
        let mut results = engine.query(&Filter::all(), &QueryOptions::new());
        let first = results.next().await;
        assert!(matches!(first, Some(Ok(_))));
        drop(results);

        assert_eq!(engine.metrics().snapshot().documents_returned, 1);
    }
}
