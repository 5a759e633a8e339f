//! Explain output
//!
//! Describes the path a query takes and the obligations left to the
//! executor, without resolving any documents. Deterministic and
//! serializable.

use std::fmt;

use serde::Serialize;

use super::ast::{QueryOptions, SortSpec};

/// Where candidates come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryPath {
    /// Index stream used as-is
    IndexDirect,
    /// Index declined; ordered full scan of the store
    FullScan,
    /// Sort-limit probe returned exactly `limit` references
    ProbeSatisfied,
    /// Probe under-delivered; general path served by the index
    ProbeFallbackIndex,
    /// Probe under-delivered; general path fell back to a full scan
    ProbeFallbackScan,
}

impl QueryPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryPath::IndexDirect => "INDEX_DIRECT",
            QueryPath::FullScan => "FULL_SCAN",
            QueryPath::ProbeSatisfied => "PROBE_SATISFIED",
            QueryPath::ProbeFallbackIndex => "PROBE_FALLBACK_INDEX",
            QueryPath::ProbeFallbackScan => "PROBE_FALLBACK_SCAN",
        }
    }

    /// Returns true if documents come from a store scan
    pub fn is_full_scan(&self) -> bool {
        matches!(self, QueryPath::FullScan | QueryPath::ProbeFallbackScan)
    }

    /// The fallback path matching a general path
    pub fn as_probe_fallback(&self) -> Self {
        if self.is_full_scan() {
            QueryPath::ProbeFallbackScan
        } else {
            QueryPath::ProbeFallbackIndex
        }
    }
}

impl fmt::Display for QueryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Explain output for one query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryExplain {
    /// Chosen candidate path
    pub path: QueryPath,
    /// Requested sort
    pub sort: Option<SortSpec>,
    /// Requested limit
    pub limit: Option<usize>,
    /// Whether the executor buffers and sorts
    pub streaming_sort: bool,
    /// Limit the executor enforces after filtering, if any
    pub post_limit: Option<usize>,
    /// Whether lookups are emitted in candidate order
    pub preserve_order: bool,
}

impl QueryExplain {
    pub fn new(
        path: QueryPath,
        options: &QueryOptions,
        streaming_sort: bool,
        post_limit: Option<usize>,
        preserve_order: bool,
    ) -> Self {
        Self {
            path,
            sort: options.sort.clone(),
            limit: options.limit,
            streaming_sort,
            post_limit,
            preserve_order,
        }
    }
}

impl fmt::Display for QueryExplain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== EXPLAIN ===")?;
        writeln!(f, "Path: {}", self.path)?;
        if let Some(sort) = &self.sort {
            writeln!(f, "Sort: {} {}", sort.field, sort.direction.as_str())?;
        }
        match self.limit {
            Some(limit) => writeln!(f, "Limit: {}", limit)?,
            None => writeln!(f, "Limit: unbounded")?,
        }
        writeln!(
            f,
            "Streaming Sort: {}",
            if self.streaming_sort { "yes" } else { "no" }
        )?;
        if let Some(post_limit) = self.post_limit {
            writeln!(f, "Post Limit: {}", post_limit)?;
        }
        Ok(())
    }
}
