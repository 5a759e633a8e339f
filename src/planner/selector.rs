//! Candidate source selection
//!
//! Decides per query where candidates come from and what the executor
//! still owes afterwards.
//!
//! # Paths
//!
//! 1. Sort and bounded limit: run the sort-limit probe. A satisfied probe
//!    needs no sort and no post-limit. Otherwise take the general path with
//!    the limit withheld and enforce it after filtering and sorting.
//! 2. General path: ask the index engine with `{limit, reverse}`. If it
//!    declines, scan the whole store in key order, skipping tombstones.
//!
//! When the executor still owes a sort, index references are resolved in
//! index order so ties come out the same on every run.
//!
//! A full scan never receives the limit: documents are filtered after the
//! scan, so capping the scan would drop matches.

use futures_util::future;
use futures_util::stream::{self, StreamExt, TryStreamExt};

use crate::index::{IndexEngine, IndexQuery, ReferenceStream};
use crate::store::{DocumentStore, DocumentStream, ScanOptions, StoreResult};

use super::ast::{Filter, QueryOptions, SortSpec};
use super::explain::{QueryExplain, QueryPath};
use super::probe::{ProbeOutcome, SortLimitProbe};

/// Candidate stream feeding the executor
pub enum CandidateSource {
    /// Index references; dedup and resolution follow
    References(ReferenceStream),
    /// Documents from a store scan; no resolution needed
    Documents(DocumentStream),
}

/// Chosen candidate source plus executor obligations
pub struct CandidatePlan {
    pub source: CandidateSource,
    pub path: QueryPath,
    /// Sort the executor applies after filtering, if any
    pub sort: Option<SortSpec>,
    /// Limit the executor applies after filtering and sorting, if any
    pub post_limit: Option<usize>,
    /// Resolve references in candidate order
    pub preserve_order: bool,
}

impl CandidatePlan {
    /// Whether a streaming sort follows
    pub fn needs_streaming_sort(&self) -> bool {
        self.sort.is_some()
    }

    /// Whether a result limiter follows
    pub fn needs_post_limit(&self) -> bool {
        self.post_limit.is_some()
    }

    /// Explain output for this plan
    pub fn explain(&self, options: &QueryOptions) -> QueryExplain {
        QueryExplain::new(
            self.path,
            options,
            self.needs_streaming_sort(),
            self.post_limit,
            self.preserve_order,
        )
    }
}

/// Selects the candidate source for a query
pub struct CandidateSelector<'a, S: ?Sized, E: ?Sized> {
    store: &'a S,
    index: &'a E,
}

impl<'a, S, E> CandidateSelector<'a, S, E>
where
    S: DocumentStore + ?Sized,
    E: IndexEngine + ?Sized,
{
    pub fn new(store: &'a S, index: &'a E) -> Self {
        Self { store, index }
    }

    /// Chooses a path for `(filter, options)`.
    ///
    /// Only the probe touches data here. A fault while probing is returned.
    pub async fn select(
        &self,
        filter: &Filter,
        options: &QueryOptions,
    ) -> StoreResult<CandidatePlan> {
        let (sort, limit) = match (&options.sort, options.limit) {
            (Some(sort), Some(limit)) => (sort, limit),
            _ => return Ok(self.general(filter, options.sort.clone(), options.limit)),
        };

        match SortLimitProbe::new(self.index).run(filter, sort, limit).await? {
            ProbeOutcome::Satisfied(references) => Ok(CandidatePlan {
                source: CandidateSource::References(
                    stream::iter(references.into_iter().map(Ok)).boxed(),
                ),
                path: QueryPath::ProbeSatisfied,
                sort: None,
                post_limit: None,
                preserve_order: true,
            }),
            ProbeOutcome::Insufficient { .. } | ProbeOutcome::NotApplicable => {
                let mut plan = self.general(filter, Some(sort.clone()), None);
                plan.path = plan.path.as_probe_fallback();
                plan.post_limit = Some(limit);
                Ok(plan)
            }
        }
    }

    /// Index stream if the engine serves the filter, full scan otherwise
    fn general(&self, filter: &Filter, sort: Option<SortSpec>, limit: Option<usize>) -> CandidatePlan {
        let reverse = sort.as_ref().map_or(false, SortSpec::is_reverse);
        let scan = ScanOptions::unbounded().with_limit(limit).reversed(reverse);

        match self.index.query(filter, &scan) {
            IndexQuery::Candidates {
                references,
                limit_applied,
            } => {
                // A sort breaks ties by arrival, so arrival must follow the
                // index rather than lookup latency.
                let preserve_order = sort.is_some();
                CandidatePlan {
                    source: CandidateSource::References(references),
                    path: QueryPath::IndexDirect,
                    sort,
                    post_limit: if limit_applied { None } else { limit },
                    preserve_order,
                }
            }
            IndexQuery::NotApplicable => CandidatePlan {
                source: CandidateSource::Documents(self.full_scan()),
                path: QueryPath::FullScan,
                sort,
                post_limit: limit,
                preserve_order: false,
            },
        }
    }

    /// Every live document in key order
    fn full_scan(&self) -> DocumentStream {
        self.store
            .scan(ScanOptions::unbounded())
            .try_filter_map(|entry| future::ready(Ok(entry.value)))
            .boxed()
    }
}
