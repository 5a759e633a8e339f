//! Pluggable index engine boundary
//!
//! An engine maps a filter to an ordered stream of index references when it
//! can, or declines. It also owns the matching primitive the executor uses to
//! re-validate every candidate, since engines are allowed to be imprecise.

use std::fmt;

use futures_util::stream::BoxStream;

use crate::document::Document;
use crate::planner::Filter;
use crate::store::{ScanOptions, StoreResult};

/// A reference to a document through an index.
///
/// The key is an ordered sequence of segments; the last segment is the
/// document identifier. Several references may name the same document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexReference {
    key: Vec<String>,
}

impl IndexReference {
    pub fn new(key: Vec<String>) -> Self {
        Self { key }
    }

    /// Reference consisting of the document id alone
    pub fn for_document(id: impl Into<String>) -> Self {
        Self::new(vec![id.into()])
    }

    /// Key segments
    pub fn key(&self) -> &[String] {
        &self.key
    }

    /// The document identifier (last key segment)
    pub fn document_id(&self) -> Option<&str> {
        self.key.last().map(String::as_str)
    }
}

/// Stream of index references in index order
pub type ReferenceStream = BoxStream<'static, StoreResult<IndexReference>>;

/// Outcome of asking an engine to serve a filter
pub enum IndexQuery {
    /// The engine serves the filter from an index
    Candidates {
        references: ReferenceStream,
        /// Whether `ScanOptions::limit` was applied to `references`
        limit_applied: bool,
    },
    /// No index can serve this filter
    NotApplicable,
}

impl fmt::Debug for IndexQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexQuery::Candidates { limit_applied, .. } => f
                .debug_struct("Candidates")
                .field("limit_applied", limit_applied)
                .finish_non_exhaustive(),
            IndexQuery::NotApplicable => write!(f, "NotApplicable"),
        }
    }
}

/// Secondary index capability injected into the query engine.
///
/// Contract for `query`:
/// - References are yielded in index order, reversed when `options.reverse`.
/// - When `options.order_by` is set, references must be ordered by that
///   attribute (per `reverse`), otherwise the engine must decline.
/// - `limit_applied` is true only if the references name at most
///   `options.limit` distinct documents and no matching document beyond
///   them was skipped. Repeated references to one document may appear.
pub trait IndexEngine: Send + Sync {
    /// Serve a filter from an index, or decline
    fn query(&self, filter: &Filter, options: &ScanOptions) -> IndexQuery;

    /// Evaluate a filter against a resolved document
    fn matches(&self, document: &Document, filter: &Filter) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_is_last_segment() {
        let reference = IndexReference::new(vec!["age".into(), "n:40".into(), "user_7".into()]);
        assert_eq!(reference.document_id(), Some("user_7"));
        assert_eq!(reference.key().len(), 3);
    }

    #[test]
    fn test_empty_reference_has_no_document() {
        let reference = IndexReference::new(Vec::new());
        assert_eq!(reference.document_id(), None);
    }

    #[test]
    fn test_document_reference() {
        assert_eq!(IndexReference::for_document("a").document_id(), Some("a"));
    }

    #[test]
    fn test_not_applicable_debug() {
        assert_eq!(format!("{:?}", IndexQuery::NotApplicable), "NotApplicable");
    }
}
