//! Index subsystem for aeroquery
//!
//! Defines the pluggable index engine boundary and a reference engine built
//! on in-memory BTree field indexes.
//!
//! # Design Principles
//!
//! - Derived state: Indexes mirror the store, never the source of truth
//! - Deterministic: BTreeMap iteration order, ids ascending within a key
//! - Advisory: The executor re-validates every candidate with `matches`

mod btree;
mod engine;
mod manager;
mod matcher;

pub use btree::{IndexKey, IndexTree};
pub use engine::{IndexEngine, IndexQuery, IndexReference, ReferenceStream};
pub use manager::FieldIndexEngine;
pub use matcher::FilterMatcher;
