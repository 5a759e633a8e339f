//! Streaming sort
//!
//! Buffers the whole filtered stream, then emits it ordered by a single
//! attribute.
//!
//! Ordering rules:
//! - The attribute is read by dotted path; a missing intermediate, a missing
//!   leaf or a null leaf is undefined.
//! - Two numbers compare numerically, reversed for descending.
//! - Undefined values sort after defined ones in both directions.
//! - Defined non-numeric values are not compared with each other. They sort
//!   after numbers and before undefined values, keeping input order.
//!
//! The sort is stable, so ties keep the order they arrived in.

use std::cmp::Ordering;

use futures_util::future;
use futures_util::stream::{self, StreamExt, TryStreamExt};

use crate::document::{value_at_path, Document};
use crate::planner::{SortDirection, SortSpec};
use crate::store::{DocumentStream, StoreError};

/// Sorts documents by one attribute
pub struct ResultSorter {
    spec: SortSpec,
}

/// Sort key class; lower sorts first regardless of direction
#[derive(Debug, Clone, Copy, PartialEq)]
enum SortKey {
    Number(f64),
    Other,
    Undefined,
}

impl SortKey {
    fn of(document: &Document, field: &str) -> Self {
        match value_at_path(document, field) {
            None => SortKey::Undefined,
            Some(value) => value.as_f64().map_or(SortKey::Other, SortKey::Number),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SortKey::Number(_) => 0,
            SortKey::Other => 1,
            SortKey::Undefined => 2,
        }
    }
}

impl ResultSorter {
    pub fn new(spec: SortSpec) -> Self {
        Self { spec }
    }

    /// Compares two documents under the configured attribute and direction
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let a_key = SortKey::of(a, &self.spec.field);
        let b_key = SortKey::of(b, &self.spec.field);

        match (a_key, b_key) {
            (SortKey::Number(x), SortKey::Number(y)) => {
                let ordering = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
                match self.spec.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            }
            (a_key, b_key) => a_key.rank().cmp(&b_key.rank()),
        }
    }

    /// Sorts documents in place. Stable.
    pub fn sort(&self, documents: &mut [Document]) {
        documents.sort_by(|a, b| self.compare(a, b));
    }

    /// Buffers `documents`, sorts them and streams them back.
    ///
    /// A fault while buffering is emitted alone; nothing buffered is
    /// released.
    pub fn apply(self, documents: DocumentStream) -> DocumentStream {
        stream::once(async move {
            match documents.try_collect::<Vec<Document>>().await {
                Ok(mut buffered) => {
                    self.sort(&mut buffered);
                    stream::iter(buffered.into_iter().map(Ok::<Document, StoreError>)).left_stream()
                }
                Err(fault) => stream::once(future::ready(Err(fault))).right_stream(),
            }
        })
        .flatten()
        .boxed()
    }
}
