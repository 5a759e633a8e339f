//! aeroquery - streaming query planning and execution over an ordered
//! document store with pluggable secondary indexes
//!
//! A query flows through a candidate source (sort-limit probe, direct
//! index, or full scan), then deduplication, concurrent point lookups,
//! predicate re-checking, an optional buffered sort, and an optional limit.

pub mod cli;
pub mod config;
pub mod document;
pub mod executor;
pub mod index;
pub mod observability;
pub mod planner;
pub mod store;
