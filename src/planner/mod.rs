//! Query planner
//!
//! Decides where a query's candidates come from.
//!
//! # Candidate Source Priority
//!
//! 1. Sort with a bounded limit: sort-limit probe over the sort attribute's
//!    index, restricted to documents defining it
//! 2. Index stream, if the engine serves the filter
//! 3. Full ordered scan of the store
//!
//! A probe that returns fewer than `limit` references falls back to 2 or 3
//! with the limit enforced after sorting.

mod ast;
mod errors;
mod explain;
mod probe;
mod selector;

pub use ast::{Filter, FilterOp, Predicate, QueryOptions, SortDirection, SortSpec};
pub use errors::{PlannerError, PlannerResult};
pub use explain::{QueryExplain, QueryPath};
pub use probe::{ProbeOutcome, SortLimitProbe};
pub use selector::{CandidatePlan, CandidateSelector, CandidateSource};
