//! Observability subsystem
//!
//! This module provides:
//! - Structured logging (JSON, to stderr)
//! - Query counters
//! - Lifecycle scopes around each query
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on execution
//! 3. No background threads
//! 4. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use aeroquery::observability::{Logger, MetricsRegistry, ObservationScope};
//!
//! Logger::info("QUERY_PATH", &[("path", "full_scan")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_queries_executed();
//!
//! let scope = ObservationScope::new("QUERY");
//! // ... do work ...
//! scope.complete();
//! ```

mod logger;
mod metrics;
mod scope;

pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::ObservationScope;
