//! Document representation and dotted-path attribute access

use serde_json::Value;

/// A stored document body
pub type Document = Value;

/// Resolves a dotted attribute path (`"address.city"`) inside a document.
///
/// Returns `None` when an intermediate value is missing or not an object,
/// or when the leaf is absent or `null`. Both cases count as "undefined"
/// for matching and ordering.
pub fn value_at_path<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = document;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
        if current.is_null() {
            return None;
        }
    }
    Some(current)
}
