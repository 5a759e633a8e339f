//! Predicate matching against documents
//!
//! Strict semantics, no type coercion:
//! - All predicates must hold (AND)
//! - Undefined (missing or null) values never satisfy a comparison
//! - Numbers compare numerically across integer and float representations
//! - Strings compare lexicographically; mixed types never match a range
//! - An array value matches when any element matches (multi-key semantics)

use std::cmp::Ordering;

use serde_json::Value;

use crate::document::value_at_path;
use crate::planner::{Filter, FilterOp, Predicate};

/// Evaluates filters against documents
pub struct FilterMatcher;

impl FilterMatcher {
    /// Checks if a document matches all predicates of the filter
    pub fn matches(document: &Value, filter: &Filter) -> bool {
        filter
            .predicates
            .iter()
            .all(|pred| Self::matches_predicate(document, pred))
    }

    /// Checks if a document matches a single predicate
    pub fn matches_predicate(document: &Value, predicate: &Predicate) -> bool {
        let field_value = value_at_path(document, &predicate.field);

        match &predicate.op {
            FilterOp::Exists(required) => field_value.is_some() == *required,
            FilterOp::Ne(unwanted) => match field_value {
                None => true,
                Some(actual) => !Self::any_element(actual, |v| Self::equal(v, unwanted)),
            },
            op => match field_value {
                None => false,
                Some(actual) => Self::any_element(actual, |v| Self::compare_op(v, op)),
            },
        }
    }

    /// Applies `test` to the value, or to each element when it is an array.
    ///
    /// A whole-array comparison is tried first so `{"tags": ["a", "b"]}`
    /// can be matched by an equal array.
    fn any_element(actual: &Value, test: impl Fn(&Value) -> bool) -> bool {
        if test(actual) {
            return true;
        }
        match actual {
            Value::Array(items) => items.iter().any(|item| !item.is_null() && test(item)),
            _ => false,
        }
    }

    fn compare_op(actual: &Value, op: &FilterOp) -> bool {
        match op {
            FilterOp::Eq(expected) => Self::equal(actual, expected),
            FilterOp::In(candidates) => candidates.iter().any(|c| Self::equal(actual, c)),
            FilterOp::Gte(bound) => Self::ordered(actual, bound, |o| o != Ordering::Less),
            FilterOp::Gt(bound) => Self::ordered(actual, bound, |o| o == Ordering::Greater),
            FilterOp::Lte(bound) => Self::ordered(actual, bound, |o| o != Ordering::Greater),
            FilterOp::Lt(bound) => Self::ordered(actual, bound, |o| o == Ordering::Less),
            FilterOp::Ne(_) | FilterOp::Exists(_) => false,
        }
    }

    /// Equality with numbers compared by value, so `10` equals `10.0`
    fn equal(actual: &Value, expected: &Value) -> bool {
        match (actual, expected) {
            (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
                (Some(af), Some(bf)) => af == bf,
                _ => a == b,
            },
            _ => actual == expected,
        }
    }

    /// Range comparison: numbers with numbers, strings with strings
    fn ordered(actual: &Value, bound: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
        let ordering = match (actual, bound) {
            (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
                (Some(af), Some(bf)) => af.partial_cmp(&bf),
                _ => None,
            },
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => None,
        };
        ordering.map_or(false, accept)
    }
}
