//! Query AST structures
//!
//! A query is a conjunctive `Filter` plus `QueryOptions` (single-attribute
//! sort and an optional limit). Filters can be built with constructors or
//! decoded from a Mongo-style JSON object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::{PlannerError, PlannerResult};

/// Filter operation types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterOp {
    /// Equality: field = value
    Eq(Value),
    /// Inequality: field != value (absent fields match)
    Ne(Value),
    /// Greater than or equal: field >= value
    Gte(Value),
    /// Greater than: field > value
    Gt(Value),
    /// Less than or equal: field <= value
    Lte(Value),
    /// Less than: field < value
    Lt(Value),
    /// Membership: field equals one of the values
    In(Vec<Value>),
    /// Presence of a defined, non-null value
    Exists(bool),
}

impl FilterOp {
    /// Returns true if a document satisfying this op must define the field
    pub fn implies_exists(&self) -> bool {
        match self {
            FilterOp::Eq(v) => !v.is_null(),
            FilterOp::Gte(_) | FilterOp::Gt(_) | FilterOp::Lte(_) | FilterOp::Lt(_) => true,
            FilterOp::Exists(required) => *required,
            FilterOp::Ne(_) | FilterOp::In(_) => false,
        }
    }

    fn from_operator(op: &str, operand: &Value) -> PlannerResult<Self> {
        let parsed = match op {
            "$eq" => FilterOp::Eq(operand.clone()),
            "$ne" => FilterOp::Ne(operand.clone()),
            "$gt" => FilterOp::Gt(operand.clone()),
            "$gte" => FilterOp::Gte(operand.clone()),
            "$lt" => FilterOp::Lt(operand.clone()),
            "$lte" => FilterOp::Lte(operand.clone()),
            "$in" => match operand {
                Value::Array(values) => FilterOp::In(values.clone()),
                _ => return Err(PlannerError::InvalidOperand(op.to_string())),
            },
            "$exists" => match operand {
                Value::Bool(b) => FilterOp::Exists(*b),
                _ => return Err(PlannerError::InvalidOperand(op.to_string())),
            },
            other => return Err(PlannerError::UnknownOperator(other.to_string())),
        };
        Ok(parsed)
    }
}

/// A single predicate (dotted field path + operation)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    /// Field path, segments separated by '.'
    pub field: String,
    /// Filter operation
    pub op: FilterOp,
}

impl Predicate {
    pub fn new(field: impl Into<String>, op: FilterOp) -> Self {
        Self {
            field: field.into(),
            op,
        }
    }

    /// Create an equality predicate
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOp::Eq(value))
    }

    /// Create an inequality predicate
    pub fn ne(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOp::Ne(value))
    }

    /// Create a range predicate (gte)
    pub fn gte(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOp::Gte(value))
    }

    /// Create a range predicate (gt)
    pub fn gt(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOp::Gt(value))
    }

    /// Create a range predicate (lte)
    pub fn lte(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOp::Lte(value))
    }

    /// Create a range predicate (lt)
    pub fn lt(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOp::Lt(value))
    }

    /// Create a membership predicate
    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::new(field, FilterOp::In(values))
    }

    /// Create a presence predicate
    pub fn exists(field: impl Into<String>, required: bool) -> Self {
        Self::new(field, FilterOp::Exists(required))
    }
}

/// Conjunctive filter: a document matches when every predicate holds.
///
/// An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub predicates: Vec<Predicate>,
}

impl Filter {
    /// Filter matching every document
    pub fn all() -> Self {
        Self::default()
    }

    /// Adds a predicate
    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Adds an equality predicate
    pub fn filter_eq(self, field: impl Into<String>, value: Value) -> Self {
        self.and(Predicate::eq(field, value))
    }

    /// Returns a copy that additionally requires `field` to be defined
    pub fn and_exists(&self, field: &str) -> Self {
        self.clone().and(Predicate::exists(field, true))
    }

    /// Decodes a Mongo-style filter object.
    ///
    /// `{"age": {"$gte": 18}, "name": "Alice"}` becomes
    /// `age gte 18 AND name eq "Alice"`. A value that is an object whose keys
    /// all start with `$` is read as operators; anything else is equality.
    pub fn from_json(value: &Value) -> PlannerResult<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| PlannerError::InvalidFilter("filter must be a JSON object".into()))?;

        let mut filter = Filter::all();
        for (field, condition) in object {
            if field.is_empty() || field.starts_with('$') {
                return Err(PlannerError::InvalidFilter(format!(
                    "invalid field name '{}'",
                    field
                )));
            }
            match operator_map(condition) {
                Some(operators) => {
                    for (op, operand) in operators {
                        let op = FilterOp::from_operator(op, operand)?;
                        filter = filter.and(Predicate::new(field.clone(), op));
                    }
                }
                None => filter = filter.filter_eq(field.clone(), condition.clone()),
            }
        }
        Ok(filter)
    }
}

fn operator_map(condition: &Value) -> Option<&Map<String, Value>> {
    let map = condition.as_object()?;
    if !map.is_empty() && map.keys().all(|k| k.starts_with('$')) {
        Some(map)
    } else {
        None
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    /// Reads `1`, `-1`, `"asc"`, `"desc"` (and long forms).
    ///
    /// Anything else falls back to ascending.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Number(n) if n.as_f64().map_or(false, |f| f < 0.0) => SortDirection::Desc,
            Value::String(s) => match s.to_ascii_lowercase().as_str() {
                "desc" | "descending" => SortDirection::Desc,
                _ => SortDirection::Asc,
            },
            _ => SortDirection::Asc,
        }
    }
}

/// Sort specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    /// Field to sort by (dotted path)
    pub field: String,
    /// Sort direction
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }

    /// True when the index should be walked backwards
    pub fn is_reverse(&self) -> bool {
        self.direction == SortDirection::Desc
    }
}

/// Sort and limit constraints for a query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Single-attribute sort (optional)
    pub sort: Option<SortSpec>,
    /// Maximum number of results, `None` for unbounded
    pub limit: Option<usize>,
}

impl QueryOptions {
    /// No sort, unbounded
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sort specification
    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Sets the limit
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Normalizes loosely typed options.
    ///
    /// `{"sort": {"age": -1}, "limit": 10}`. A missing, negative,
    /// fractional or non-numeric limit means unbounded. Only the first sort
    /// attribute, in the order the caller wrote them, is used. Malformed
    /// input never fails.
    pub fn from_json(value: &Value) -> Self {
        let sort = value
            .get("sort")
            .and_then(Value::as_object)
            .and_then(|sort| sort.iter().next())
            .map(|(field, order)| SortSpec {
                field: field.clone(),
                direction: SortDirection::from_json(order),
            });

        let limit = value
            .get("limit")
            .and_then(Value::as_u64)
            .and_then(|l| usize::try_from(l).ok());

        Self { sort, limit }
    }
}
