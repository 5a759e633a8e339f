//! ObservationScope for automatic begin/complete logging
//!
//! - Logs BEGIN event on creation
//! - Logs COMPLETE or FAILED when closed explicitly
//! - Logs INCOMPLETE on drop if never closed
//!
//! Scopes own their fields so they can travel inside a stream across
//! await points and threads.

use std::time::Instant;

use super::logger::Logger;

/// A scope that automatically logs begin and complete events
///
/// # Usage
///
/// ```ignore
/// let scope = ObservationScope::with_fields("QUERY", &[("query_id", &id)]);
/// // ... do work ...
/// scope.complete(); // logs QUERY_COMPLETE
/// // if never closed, logs QUERY_INCOMPLETE on drop
/// ```
pub struct ObservationScope {
    name: &'static str,
    closed: bool,
    fields: Vec<(&'static str, String)>,
    started: Instant,
}

impl ObservationScope {
    /// Create a new observation scope
    ///
    /// Logs `{name}_BEGIN` immediately.
    pub fn new(name: &'static str) -> Self {
        Self::with_fields(name, &[])
    }

    /// Create a new observation scope with fields repeated on every event
    pub fn with_fields(name: &'static str, fields: &[(&'static str, &str)]) -> Self {
        Logger::info(&format!("{}_BEGIN", name), fields);

        Self {
            name,
            closed: false,
            fields: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            started: Instant::now(),
        }
    }

    /// Mark the scope as successfully completed
    ///
    /// Logs `{name}_COMPLETE` at INFO level.
    pub fn complete(self) {
        self.complete_with_fields(&[]);
    }

    /// Mark the scope as successfully completed with additional fields
    pub fn complete_with_fields(mut self, extra_fields: &[(&str, &str)]) {
        self.closed = true;
        let elapsed = self.elapsed_ms();
        let mut all_fields = self.field_refs();
        all_fields.push(("elapsed_ms", elapsed.as_str()));
        all_fields.extend(extra_fields.iter().copied());

        Logger::info(&format!("{}_COMPLETE", self.name), &all_fields);
    }

    /// Mark the scope as failed with a reason
    ///
    /// Logs `{name}_FAILED` at ERROR level.
    pub fn fail(mut self, reason: &str) {
        self.closed = true;
        let mut all_fields = self.field_refs();
        all_fields.push(("reason", reason));

        Logger::error(&format!("{}_FAILED", self.name), &all_fields);
    }

    /// Mark the scope as failed with FATAL severity
    pub fn fail_fatal(mut self, reason: &str) {
        self.closed = true;
        let mut all_fields = self.field_refs();
        all_fields.push(("reason", reason));

        Logger::fatal(&format!("{}_FAILED", self.name), &all_fields);
    }

    /// Check if the scope has been closed
    pub fn is_completed(&self) -> bool {
        self.closed
    }

    fn elapsed_ms(&self) -> String {
        self.started.elapsed().as_millis().to_string()
    }

    fn field_refs(&self) -> Vec<(&str, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect()
    }
}

impl Drop for ObservationScope {
    fn drop(&mut self) {
        if !self.closed {
            let mut all_fields = self.field_refs();
            all_fields.push(("reason", "scope dropped without completion"));
            Logger::info(&format!("{}_INCOMPLETE", self.name), &all_fields);
        }
    }
}
