//! Predicate filtering for query execution
//!
//! Every resolved candidate is checked against the query's original filter
//! using the index engine's match primitive, whichever path produced it.
//! Order is preserved.

use std::sync::Arc;

use futures_util::future;
use futures_util::stream::{StreamExt, TryStreamExt};

use crate::document::Document;
use crate::index::IndexEngine;
use crate::planner::Filter;
use crate::store::DocumentStream;

/// Re-validates documents against a filter
pub struct PredicateFilter<E: ?Sized> {
    index: Arc<E>,
    filter: Filter,
}

impl<E> PredicateFilter<E>
where
    E: IndexEngine + ?Sized + 'static,
{
    pub fn new(index: Arc<E>, filter: Filter) -> Self {
        Self { index, filter }
    }

    /// Checks one document
    pub fn matches(&self, document: &Document) -> bool {
        self.index.matches(document, &self.filter)
    }

    /// Drops non-matching documents. Faults pass through.
    pub fn apply(self, documents: DocumentStream) -> DocumentStream {
        documents
            .try_filter(move |document| future::ready(self.matches(document)))
            .boxed()
    }
}
