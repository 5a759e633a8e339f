//! Reference deduplication
//!
//! An index can reach one document through several keys (multi-key array
//! values, overlapping ranges). The deduplicator turns a reference stream
//! into a stream of document identifiers, each emitted once, in first-seen
//! order. The seen-set lives for a single query.

use std::collections::HashSet;

use futures_util::future;
use futures_util::stream::{BoxStream, StreamExt, TryStreamExt};

use crate::index::ReferenceStream;
use crate::store::StoreResult;

/// Stream of document identifiers
pub type IdStream = BoxStream<'static, StoreResult<String>>;

/// Removes repeated document identifiers from a reference stream
pub struct Deduplicator;

impl Deduplicator {
    /// Maps references to unique document identifiers.
    ///
    /// References without a document identifier are dropped. Faults pass
    /// through unchanged.
    pub fn apply(references: ReferenceStream) -> IdStream {
        let mut seen: HashSet<String> = HashSet::new();

        references
            .try_filter_map(move |reference| {
                let id = reference
                    .document_id()
                    .filter(|id| seen.insert(id.to_string()))
                    .map(str::to_string);
                future::ready(Ok(id))
            })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexReference;
    use crate::store::StoreError;
    use futures_util::stream;

    fn refs(keys: &[&[&str]]) -> ReferenceStream {
        let items: Vec<StoreResult<IndexReference>> = keys
            .iter()
            .map(|k| Ok(IndexReference::new(k.iter().map(|s| s.to_string()).collect())))
            .collect();
        stream::iter(items).boxed()
    }

    #[tokio::test]
    async fn test_first_seen_order() {
        let ids: Vec<String> = Deduplicator::apply(refs(&[
            &["tags", "s:a", "d2"],
            &["tags", "s:a", "d1"],
            &["tags", "s:b", "d2"],
            &["tags", "s:c", "d3"],
            &["tags", "s:c", "d1"],
        ]))
        .try_collect()
        .await
        .unwrap();

        assert_eq!(ids, vec!["d2", "d1", "d3"]);
    }

    #[tokio::test]
    async fn test_empty_reference_dropped() {
        let ids: Vec<String> = Deduplicator::apply(refs(&[&[], &["x"]]))
            .try_collect()
            .await
            .unwrap();

        assert_eq!(ids, vec!["x"]);
    }

    #[tokio::test]
    async fn test_fault_passes_through() {
        let items = vec![
            Ok(IndexReference::for_document("a")),
            Err(StoreError::IndexFault("cursor lost".into())),
        ];
        let out: Vec<StoreResult<String>> =
            Deduplicator::apply(stream::iter(items).boxed()).collect().await;

        assert_eq!(out.len(), 2);
        assert_eq!(out[0], Ok("a".to_string()));
        assert!(out[1].is_err());
    }

    #[tokio::test]
    async fn test_empty_stream() {
        let ids: Vec<String> = Deduplicator::apply(refs(&[])).try_collect().await.unwrap();
        assert!(ids.is_empty());
    }
}
