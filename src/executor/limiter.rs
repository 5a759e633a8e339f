//! Result limiting
//!
//! Passes through at most `limit` items in input order, then ends without
//! polling upstream again. Excess input is discarded when the stream is
//! dropped.

use futures_util::stream::StreamExt;

use crate::store::DocumentStream;

/// Caps the number of emitted results
pub struct ResultLimiter {
    limit: usize,
}

impl ResultLimiter {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn apply(self, documents: DocumentStream) -> DocumentStream {
        documents.take(self.limit).boxed()
    }
}
