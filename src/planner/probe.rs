//! Sort-limit probe
//!
//! A query with both a sort and a limit can often be answered by walking
//! the sort attribute's index and stopping after `limit` references. The
//! probe asks the engine for exactly that, restricted to documents that
//! define the sort attribute, and materializes at most `limit` references.
//!
//! If exactly `limit` references come back, they are the answer: documents
//! lacking the attribute always sort after those that have it, so none of
//! them could displace a probed reference. Fewer means the probe cannot
//! tell whether such documents belong in the result, and the caller falls
//! back to the general path.
//!
//! The count check ignores references the executor may later drop
//! (duplicates, vanished documents, imprecise engine matches). That is an
//! accepted approximation.

use futures_util::stream::{StreamExt, TryStreamExt};

use crate::index::{IndexEngine, IndexQuery, IndexReference};
use crate::store::{ScanOptions, StoreResult};

use super::ast::{Filter, SortSpec};

/// Result of probing the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Exactly `limit` references, in sort order
    Satisfied(Vec<IndexReference>),
    /// Fewer than `limit` references came back
    Insufficient { found: usize },
    /// No index could serve the augmented filter in sort order
    NotApplicable,
}

/// Probes the index for a sorted, limited query
pub struct SortLimitProbe<'a, E: ?Sized> {
    index: &'a E,
}

impl<'a, E> SortLimitProbe<'a, E>
where
    E: IndexEngine + ?Sized,
{
    pub fn new(index: &'a E) -> Self {
        Self { index }
    }

    /// Scan options for the probe query
    pub fn scan_options(sort: &SortSpec, limit: usize) -> ScanOptions {
        ScanOptions::unbounded()
            .with_limit(Some(limit))
            .reversed(sort.is_reverse())
            .ordered_by(sort.field.as_str())
    }

    /// Runs the probe.
    ///
    /// The filter is augmented with an existence clause on the sort
    /// attribute. Faults while materializing are returned as errors.
    pub async fn run(
        &self,
        filter: &Filter,
        sort: &SortSpec,
        limit: usize,
    ) -> StoreResult<ProbeOutcome> {
        let augmented = filter.and_exists(&sort.field);
        let options = Self::scan_options(sort, limit);

        let references = match self.index.query(&augmented, &options) {
            IndexQuery::Candidates { references, .. } => references,
            IndexQuery::NotApplicable => return Ok(ProbeOutcome::NotApplicable),
        };

        let materialized: Vec<IndexReference> = references.take(limit).try_collect().await?;

        if materialized.len() == limit {
            Ok(ProbeOutcome::Satisfied(materialized))
        } else {
            Ok(ProbeOutcome::Insufficient {
                found: materialized.len(),
            })
        }
    }
}
