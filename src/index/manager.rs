//! Field index engine
//!
//! Maintains in-memory BTree indexes over a fixed set of fields and serves
//! filters from them.
//!
//! # API
//!
//! - `rebuild_from_store(store)` - Rebuild all indexes from a store scan
//! - `apply_write(id, body)` - Update indexes after a store write
//! - `apply_delete(id)` - Update indexes after a delete
//! - `query(filter, options)` - Ordered references, or decline
//!
//! Array values are indexed once per distinct scalar element, so a document
//! may be referenced more than once by a single query.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;
use std::sync::RwLock;

use futures_util::future;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use serde_json::Value;

use crate::document::{value_at_path, Document};
use crate::observability::Logger;
use crate::planner::{Filter, FilterOp, Predicate};
use crate::store::{DocumentStore, ScanEntry, ScanOptions, StoreError, StoreResult};

use super::btree::{IndexKey, IndexTree};
use super::engine::{IndexEngine, IndexQuery, IndexReference};
use super::matcher::FilterMatcher;

/// How a query walks the driving index
#[derive(Debug, Clone, PartialEq)]
enum Driver {
    /// Single key
    Eq(IndexKey),
    /// Key range
    Range {
        lower: Bound<IndexKey>,
        upper: Bound<IndexKey>,
    },
    /// Every key (documents defining the field)
    Full,
}

impl Driver {
    /// Lower is preferred
    fn priority(&self) -> u8 {
        match self {
            Driver::Eq(_) => 0,
            Driver::Range { .. } => 1,
            Driver::Full => 2,
        }
    }

    fn for_predicate(predicate: &Predicate) -> Option<Self> {
        let driver = match &predicate.op {
            FilterOp::Eq(v) => Driver::Eq(IndexKey::from_json(v)?),
            FilterOp::Gt(v) => Driver::Range {
                lower: Bound::Excluded(IndexKey::from_json(v)?),
                upper: Bound::Unbounded,
            },
            FilterOp::Gte(v) => Driver::Range {
                lower: Bound::Included(IndexKey::from_json(v)?),
                upper: Bound::Unbounded,
            },
            FilterOp::Lt(v) => Driver::Range {
                lower: Bound::Unbounded,
                upper: Bound::Excluded(IndexKey::from_json(v)?),
            },
            FilterOp::Lte(v) => Driver::Range {
                lower: Bound::Unbounded,
                upper: Bound::Included(IndexKey::from_json(v)?),
            },
            FilterOp::Exists(true) => Driver::Full,
            FilterOp::Exists(false) | FilterOp::Ne(_) | FilterOp::In(_) => return None,
        };
        Some(driver)
    }
}

#[derive(Debug, Default)]
struct IndexState {
    /// Secondary indexes (field path -> tree)
    field_indexes: BTreeMap<String, IndexTree>,
    /// Indexed bodies, for residual predicate checks
    bodies: HashMap<String, Document>,
}

impl IndexState {
    fn index_document(&mut self, id: &str, body: &Value) {
        for (field, tree) in self.field_indexes.iter_mut() {
            if let Some(value) = value_at_path(body, field) {
                for key in IndexKey::keys_for(value) {
                    tree.insert(key, id);
                }
            }
        }
        self.bodies.insert(id.to_string(), body.clone());
    }

    fn unindex_document(&mut self, id: &str) {
        let Some(body) = self.bodies.remove(id) else {
            return;
        };
        for (field, tree) in self.field_indexes.iter_mut() {
            if let Some(value) = value_at_path(&body, field) {
                for key in IndexKey::keys_for(value) {
                    tree.remove(&key, id);
                }
            }
        }
    }

    /// Picks the predicate whose index drives the walk.
    ///
    /// With `order_by`, only a predicate on that field that implies the field
    /// is defined qualifies; otherwise the walk would miss documents or come
    /// out in the wrong order. Without it, equality beats ranges beats
    /// existence, ties broken lexicographically by field.
    fn choose_driver<'f>(
        &self,
        filter: &'f Filter,
        options: &ScanOptions,
    ) -> Option<(&'f str, Driver)> {
        let candidates = filter
            .predicates
            .iter()
            .filter(|p| self.field_indexes.contains_key(&p.field))
            .filter(|p| match &options.order_by {
                Some(order_field) => &p.field == order_field && p.op.implies_exists(),
                None => true,
            })
            .filter_map(|p| Driver::for_predicate(p).map(|d| (p.field.as_str(), d)));

        candidates.min_by(|(fa, da), (fb, db)| {
            da.priority().cmp(&db.priority()).then_with(|| fa.cmp(fb))
        })
    }
}

/// Reference index engine over BTree field indexes
#[derive(Debug, Default)]
pub struct FieldIndexEngine {
    state: RwLock<IndexState>,
}

impl FieldIndexEngine {
    /// Creates an engine indexing the given fields (dotted paths)
    pub fn new(fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let field_indexes = fields
            .into_iter()
            .map(|f| (f.into(), IndexTree::new()))
            .collect();
        Self {
            state: RwLock::new(IndexState {
                field_indexes,
                bodies: HashMap::new(),
            }),
        }
    }

    /// Engine with no indexes; declines every query
    pub fn no_indexes() -> Self {
        Self::default()
    }

    /// Rebuild all indexes from a full store scan.
    ///
    /// Tombstones are skipped. Returns the number of indexed documents.
    pub async fn rebuild_from_store<S>(&self, store: &S) -> StoreResult<usize>
    where
        S: DocumentStore + ?Sized,
    {
        let live: Vec<ScanEntry> = store
            .scan(ScanOptions::unbounded())
            .try_filter(|entry| future::ready(entry.value.is_some()))
            .try_collect()
            .await?;

        let mut state = self.write_state()?;
        state.bodies.clear();
        for tree in state.field_indexes.values_mut() {
            tree.clear();
        }
        for entry in &live {
            if let Some(body) = &entry.value {
                state.index_document(&entry.key, body);
            }
        }

        Logger::trace(
            "INDEX_REBUILD_COMPLETE",
            &[("documents", &live.len().to_string())],
        );
        Ok(live.len())
    }

    /// Apply a write (insert or update) to indexes.
    ///
    /// Called after the store write.
    pub fn apply_write(&self, id: &str, body: &Value) -> StoreResult<()> {
        let mut state = self.write_state()?;
        state.unindex_document(id);
        state.index_document(id, body);
        Ok(())
    }

    /// Apply a delete to indexes.
    ///
    /// Called after the store delete.
    pub fn apply_delete(&self, id: &str) -> StoreResult<()> {
        self.write_state()?.unindex_document(id);
        Ok(())
    }

    fn write_state(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, IndexState>> {
        self.state
            .write()
            .map_err(|_| StoreError::IndexFault("index lock poisoned".to_string()))
    }
}

impl IndexEngine for FieldIndexEngine {
    fn query(&self, filter: &Filter, options: &ScanOptions) -> IndexQuery {
        let state = match self.state.read() {
            Ok(state) => state,
            Err(_) => {
                let fault = StoreError::IndexFault("index lock poisoned".to_string());
                return IndexQuery::Candidates {
                    references: stream::once(future::ready(Err(fault))).boxed(),
                    limit_applied: false,
                };
            }
        };

        let Some((field, driver)) = state.choose_driver(filter, options) else {
            return IndexQuery::NotApplicable;
        };
        let Some(tree) = state.field_indexes.get(field) else {
            return IndexQuery::NotApplicable;
        };

        let pairs = match &driver {
            Driver::Eq(key) => tree.walk(Bound::Included(key), Bound::Included(key), options.reverse),
            Driver::Range { lower, upper } => {
                tree.walk(lower.as_ref(), upper.as_ref(), options.reverse)
            }
            Driver::Full => tree.walk(Bound::Unbounded, Bound::Unbounded, options.reverse),
        };

        // The limit counts distinct documents; repeats of an already
        // referenced document are still emitted for the deduplicator.
        let limit = options.limit.unwrap_or(usize::MAX);
        let mut referenced: HashSet<&str> = HashSet::new();
        let mut references = Vec::new();
        for (key, id) in pairs {
            let repeat = referenced.contains(id);
            if !repeat && referenced.len() >= limit {
                break;
            }
            let Some(body) = state.bodies.get(id) else {
                continue;
            };
            if !FilterMatcher::matches(body, filter) {
                continue;
            }
            referenced.insert(id);
            references.push(IndexReference::new(vec![
                field.to_string(),
                key.encode(),
                id.to_string(),
            ]));
        }

        IndexQuery::Candidates {
            references: stream::iter(references.into_iter().map(Ok)).boxed(),
            limit_applied: options.limit.is_some(),
        }
    }

    fn matches(&self, document: &Document, filter: &Filter) -> bool {
        FilterMatcher::matches(document, filter)
    }
}
