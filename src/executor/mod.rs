//! Query executor
//!
//! Turns a filter plus sort/limit options into a lazy stream of documents.
//!
//! # Pipeline (strict order)
//!
//! 1. Candidate source chosen by the planner
//! 2. Deduplicate index references
//! 3. Resolve identifiers with concurrent point lookups
//! 4. Filter every document against the original predicate
//! 5. Sort (if the path still needs it)
//! 6. Limit (if the path could not push it down)
//!
//! # Invariants
//!
//! - A document identifier reaches the resolver at most once
//! - The filter runs exactly once per candidate, on every path
//! - A limit is enforced exactly once
//! - The stream ends only after upstream ends and every lookup has settled

mod dedup;
mod errors;
mod executor;
mod filters;
mod limiter;
mod resolver;
mod sorter;

pub use dedup::{Deduplicator, IdStream};
pub use errors::{ExecutorError, ExecutorErrorCode, ExecutorResult, Severity};
pub use executor::{QueryEngine, QueryStream};
pub use filters::PredicateFilter;
pub use limiter::ResultLimiter;
pub use resolver::{ValueResolver, DEFAULT_MAX_IN_FLIGHT};
pub use sorter::ResultSorter;
