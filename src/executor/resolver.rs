//! Value resolution
//!
//! Turns a stream of document identifiers into a stream of documents by
//! issuing point lookups against the store, several at a time.
//!
//! # Completion
//!
//! The resolver keeps two pieces of state: whether upstream has ended, and
//! the set of lookups still in flight. It ends only when both upstream is
//! done AND the in-flight set is empty. A lookup that finds nothing is
//! dropped silently. The first fault ends the stream.
//!
//! # Ordering
//!
//! By default documents are emitted in lookup completion order, which need
//! not match input order. `preserving_order` switches to input order for
//! paths where no sort follows.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use futures_util::stream::{FuturesOrdered, FuturesUnordered, Stream, StreamExt};

use crate::document::Document;
use crate::observability::MetricsRegistry;
use crate::store::{DocumentStore, StoreResult};

use super::dedup::IdStream;

/// Default bound on lookups in flight
pub const DEFAULT_MAX_IN_FLIGHT: usize = 64;

type Lookup = BoxFuture<'static, StoreResult<Option<Document>>>;

/// Outstanding lookups
enum InFlight {
    Ordered(FuturesOrdered<Lookup>),
    Unordered(FuturesUnordered<Lookup>),
}

impl InFlight {
    fn push(&mut self, lookup: Lookup) {
        match self {
            InFlight::Ordered(queue) => queue.push_back(lookup),
            InFlight::Unordered(set) => set.push(lookup),
        }
    }

    fn len(&self) -> usize {
        match self {
            InFlight::Ordered(queue) => queue.len(),
            InFlight::Unordered(set) => set.len(),
        }
    }

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<StoreResult<Option<Document>>>> {
        match self {
            InFlight::Ordered(queue) => queue.poll_next_unpin(cx),
            InFlight::Unordered(set) => set.poll_next_unpin(cx),
        }
    }
}

/// Concurrent point-lookup stage
pub struct ValueResolver<S: ?Sized> {
    upstream: IdStream,
    upstream_done: bool,
    store: Arc<S>,
    in_flight: InFlight,
    max_in_flight: usize,
    metrics: Arc<MetricsRegistry>,
    failed: bool,
}

impl<S> ValueResolver<S>
where
    S: DocumentStore + ?Sized,
{
    /// Creates a resolver emitting in completion order
    pub fn new(upstream: IdStream, store: Arc<S>, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            upstream,
            upstream_done: false,
            store,
            in_flight: InFlight::Unordered(FuturesUnordered::new()),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            metrics,
            failed: false,
        }
    }

    /// Bounds the number of lookups in flight (at least one)
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    /// Emits documents in input order
    pub fn preserving_order(mut self) -> Self {
        if self.in_flight.len() == 0 {
            self.in_flight = InFlight::Ordered(FuturesOrdered::new());
        }
        self
    }

    /// Number of lookups currently outstanding
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Starts lookups until the window is full or upstream has nothing ready
    fn fill(&mut self, cx: &mut Context<'_>) -> Option<StoreResult<Document>> {
        while !self.upstream_done && self.in_flight.len() < self.max_in_flight {
            match self.upstream.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(id))) => {
                    let lookup = self.store.get(&id);
                    self.in_flight.push(lookup);
                }
                Poll::Ready(Some(Err(fault))) => return Some(Err(fault)),
                Poll::Ready(None) => self.upstream_done = true,
                Poll::Pending => break,
            }
        }
        None
    }
}

impl<S> Stream for ValueResolver<S>
where
    S: DocumentStore + ?Sized,
{
    type Item = StoreResult<Document>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.failed {
            return Poll::Ready(None);
        }

        loop {
            if let Some(fault) = this.fill(cx) {
                this.failed = true;
                return Poll::Ready(Some(fault));
            }

            match this.in_flight.poll_next(cx) {
                Poll::Ready(Some(Ok(Some(document)))) => return Poll::Ready(Some(Ok(document))),
                Poll::Ready(Some(Ok(None))) => {
                    this.metrics.increment_lookups_dropped();
                }
                Poll::Ready(Some(Err(fault))) => {
                    this.failed = true;
                    return Poll::Ready(Some(Err(fault)));
                }
                // Nothing outstanding: done only once upstream has ended.
                // Otherwise upstream returned Pending in `fill` and will wake us.
                Poll::Ready(None) if this.upstream_done => return Poll::Ready(None),
                Poll::Ready(None) => return Poll::Pending,
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
