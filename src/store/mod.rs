//! Ordered document store boundary
//!
//! The executor consumes two primitives from the store:
//!
//! - `get(id)` - point lookup, `None` when the document does not exist
//! - `scan(options)` - ordered iteration over `(key, value)` entries
//!
//! Deleted documents may remain visible to a scan as tombstones (entries
//! whose value is `None`). Consumers skip them.

mod errors;
mod memory;

pub use errors::{StoreError, StoreResult};
pub use memory::MemoryStore;

use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;

use crate::document::Document;

/// Options for an ordered scan.
///
/// Shared by the store scan and the index engine query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Maximum number of entries, `None` for unbounded
    pub limit: Option<usize>,
    /// Iterate in descending key order
    pub reverse: bool,
    /// Attribute the results must be ordered by.
    ///
    /// Only index engines interpret this. An engine that cannot produce
    /// references in this order must decline the query.
    pub order_by: Option<String>,
}

impl ScanOptions {
    /// Unbounded ascending scan
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Sets the limit
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the direction
    pub fn reversed(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    /// Requires results ordered by an attribute
    pub fn ordered_by(mut self, attribute: impl Into<String>) -> Self {
        self.order_by = Some(attribute.into());
        self
    }
}

/// A single scanned entry. `value` is `None` for a tombstone.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanEntry {
    pub key: String,
    pub value: Option<Document>,
}

/// Stream of scanned entries in key order
pub type ScanStream = BoxStream<'static, StoreResult<ScanEntry>>;

/// Stream of resolved documents
pub type DocumentStream = BoxStream<'static, StoreResult<Document>>;

/// Read access to an ordered key-value store of documents.
///
/// Shared read-only across concurrent queries.
pub trait DocumentStore: Send + Sync {
    /// Point lookup by document identifier
    fn get(&self, id: &str) -> BoxFuture<'static, StoreResult<Option<Document>>>;

    /// Ordered iteration over all entries, tombstones included
    fn scan(&self, options: ScanOptions) -> ScanStream;
}
