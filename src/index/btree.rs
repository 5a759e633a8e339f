//! BTreeMap-based index structures
//!
//! Indexes use `BTreeMap<IndexKey, BTreeSet<DocumentId>>` for deterministic
//! ordering. Within one key, document ids are always ascending.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

/// Index key representing a serialized field value.
///
/// Ordering is deterministic: Bool < Number < String. All numbers share one
/// variant so integers and floats interleave by numeric value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexKey {
    /// Boolean value (false < true)
    Bool(bool),
    /// Numeric value (f64 bits remapped for total ordering)
    Number(u64),
    /// String value
    String(String),
}

impl IndexKey {
    /// Create a key from a boolean
    pub fn from_bool(v: bool) -> Self {
        IndexKey::Bool(v)
    }

    /// Create a key from a number
    ///
    /// Uses bit representation for total ordering.
    pub fn from_number(v: f64) -> Self {
        // -0.0 and 0.0 compare equal in JSON space
        let v = if v == 0.0 { 0.0 } else { v };
        let bits = v.to_bits();
        let ordered = if (bits >> 63) == 1 {
            !bits // Negative: flip all bits
        } else {
            bits ^ (1 << 63) // Positive: flip sign bit
        };
        IndexKey::Number(ordered)
    }

    /// Create a key from a string
    pub fn from_string(v: impl Into<String>) -> Self {
        IndexKey::String(v.into())
    }

    /// Create a key from a scalar JSON value.
    ///
    /// Null, arrays and objects have no key.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(IndexKey::from_bool(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(IndexKey::from_number),
            serde_json::Value::String(s) => Some(IndexKey::from_string(s)),
            _ => None,
        }
    }

    /// Keys for a field value: one per scalar, one per scalar array element
    pub fn keys_for(value: &serde_json::Value) -> Vec<Self> {
        match value {
            serde_json::Value::Array(items) => {
                let mut keys: Vec<Self> = items.iter().filter_map(Self::from_json).collect();
                keys.sort();
                keys.dedup();
                keys
            }
            other => Self::from_json(other).into_iter().collect(),
        }
    }

    /// Encodes the key as a reference segment
    pub fn encode(&self) -> String {
        match self {
            IndexKey::Bool(b) => format!("b:{}", b),
            IndexKey::Number(bits) => format!("n:{:016x}", bits),
            IndexKey::String(s) => format!("s:{}", s),
        }
    }
}

/// A single field index using BTreeMap for deterministic ordering.
#[derive(Debug, Default)]
pub struct IndexTree {
    /// Maps key values to document ids
    tree: BTreeMap<IndexKey, BTreeSet<String>>,
}

impl IndexTree {
    /// Creates a new empty index tree
    pub fn new() -> Self {
        Self {
            tree: BTreeMap::new(),
        }
    }

    /// Insert a document id for a key
    pub fn insert(&mut self, key: IndexKey, id: &str) {
        self.tree.entry(key).or_default().insert(id.to_string());
    }

    /// Remove a document id for a key.
    ///
    /// If the key has no more ids, removes the key entirely.
    pub fn remove(&mut self, key: &IndexKey, id: &str) {
        if let Some(ids) = self.tree.get_mut(key) {
            ids.remove(id);
            if ids.is_empty() {
                self.tree.remove(key);
            }
        }
    }

    /// Walks `(key, id)` pairs within bounds.
    ///
    /// Keys are visited ascending, or descending when `reverse` is set. Ids
    /// under one key are always visited ascending so ties keep a stable order
    /// in both directions.
    pub fn walk(
        &self,
        lower: Bound<&IndexKey>,
        upper: Bound<&IndexKey>,
        reverse: bool,
    ) -> Vec<(&IndexKey, &str)> {
        if bounds_are_empty(lower, upper) {
            return Vec::new();
        }

        let range = self.tree.range((lower, upper));
        let keys: Box<dyn Iterator<Item = (&IndexKey, &BTreeSet<String>)>> = if reverse {
            Box::new(range.rev())
        } else {
            Box::new(range)
        };

        keys.flat_map(|(key, ids)| ids.iter().map(move |id| (key, id.as_str())))
            .collect()
    }

    /// Clear all entries
    pub fn clear(&mut self) {
        self.tree.clear();
    }
}

/// `BTreeMap::range` panics on inverted bounds, so detect them first
fn bounds_are_empty(lower: Bound<&IndexKey>, upper: Bound<&IndexKey>) -> bool {
    match (lower, upper) {
        (Bound::Included(lo), Bound::Included(hi)) => lo > hi,
        (Bound::Included(lo), Bound::Excluded(hi))
        | (Bound::Excluded(lo), Bound::Included(hi))
        | (Bound::Excluded(lo), Bound::Excluded(hi)) => lo >= hi,
        _ => false,
    }
}
