//! Custom filters: range and negated-range predicates on top of equality.
//!
//! A filter dictionary maps keys to values:
//!
//! | Key                   | Value          | Predicate                      |
//! |-----------------------|----------------|--------------------------------|
//! | `field`               | scalar         | `field = ?` (`IS NULL` for null) |
//! | `field`               | `[a, b, ...]`  | `field IN (?, ?, ...)`         |
//! | `field_between`       | `[low, high]`  | `field BETWEEN ? AND ?`        |
//! | `field_not_between`   | `[low, high]`  | `(field < ? OR field > ?)`     |
//!
//! Any other key is rejected before SQL is built. Values are always bound
//! as parameters.
//!
//! # Example
//!
//! ```
//! use ts_sql::{FilterDict, FilterValidator, Sqlite, compile_filters};
//!
//! let validator = FilterValidator::new().allow_fields(&["age"]);
//! let filters = FilterDict::new()
//!     .with("age_not_between", vec![50, 60])
//!     .with("age", 30);
//!
//! let clause = compile_filters(&filters, &validator).unwrap();
//! let (sql, params, _) = clause.to_sql(&Sqlite, 1);
//! assert_eq!(sql, r#""age" = ?1 AND ("age" < ?2 OR "age" > ?3)"#);
//! assert_eq!(params.len(), 3);
//! ```

use crate::builder::{CompoundFilter, Filter, FilterExpr, Operator, Value, build_conditions};
use crate::dialect::Dialect;
use crate::validate::{FilterValidator, ValidationError};
use std::collections::BTreeMap;

/// Key suffix selecting an inclusive range predicate.
pub const BETWEEN_SUFFIX: &str = "_between";

/// Key suffix selecting an exclusion range predicate.
pub const NOT_BETWEEN_SUFFIX: &str = "_not_between";

/// Classification of a single filter key against the known fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind<'k> {
    /// `field` - equality (or membership for lists).
    Equality(&'k str),
    /// `field_between` - inclusive range.
    Between(&'k str),
    /// `field_not_between` - outside the inclusive range.
    NotBetween(&'k str),
    /// Anything else.
    Invalid,
}

/// Caller-supplied mapping of filter keys to values.
///
/// Keys are kept sorted, so the composed clause is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterDict {
    entries: BTreeMap<String, Value>,
}

impl FilterDict {
    /// Create an empty dictionary.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Add an entry, replacing any previous value for the key.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert an entry, returning the previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Value for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the dictionary has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for FilterDict {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Row-selection predicate of one parsed filter entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `field = value`, or `field IS NULL`.
    Equals(Value),
    /// `field IN (values)`.
    OneOf(Vec<Value>),
    /// `low <= field <= high`.
    Between { low: Value, high: Value },
    /// `field < low OR field > high`.
    NotBetween { low: Value, high: Value },
}

/// A validated filter entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomFilter {
    pub field: String,
    pub predicate: Predicate,
}

impl CustomFilter {
    /// Build the predicate fragment.
    ///
    /// The exclusion range is an OR group, which renders parenthesized and
    /// therefore binds as one unit when AND-joined with other fragments.
    #[must_use]
    pub fn to_expr(&self) -> FilterExpr {
        let field = &self.field;
        match &self.predicate {
            Predicate::Equals(value) => {
                FilterExpr::Simple(Filter::new(field, Operator::Eq, value.clone()))
            },
            Predicate::OneOf(values) => FilterExpr::Simple(Filter::new(
                field,
                Operator::In,
                Value::Array(values.clone()),
            )),
            Predicate::Between { low, high } => FilterExpr::Simple(Filter::new(
                field,
                Operator::Between,
                Value::Array(vec![low.clone(), high.clone()]),
            )),
            Predicate::NotBetween { low, high } => FilterExpr::Compound(CompoundFilter::or(vec![
                FilterExpr::Simple(Filter::new(field, Operator::Lt, low.clone())),
                FilterExpr::Simple(Filter::new(field, Operator::Gt, high.clone())),
            ])),
        }
    }
}

/// Parse and validate a filter dictionary.
///
/// Fails on the first key that is not recognized or whose value has the
/// wrong shape; nothing is built in that case.
pub fn parse_filters(
    dict: &FilterDict,
    validator: &FilterValidator,
) -> Result<Vec<CustomFilter>, ValidationError> {
    dict.iter()
        .map(|(key, value)| parse_entry(key, value, validator))
        .collect()
}

fn parse_entry(
    key: &str,
    value: &Value,
    validator: &FilterValidator,
) -> Result<CustomFilter, ValidationError> {
    let (field, predicate) = match validator.classify(key) {
        FilterKind::Equality(field) => (field, equality_predicate(key, value, validator)?),
        FilterKind::Between(field) => {
            let (low, high) = range_bounds(key, value)?;
            (field, Predicate::Between { low, high })
        },
        FilterKind::NotBetween(field) => {
            let (low, high) = range_bounds(key, value)?;
            (field, Predicate::NotBetween { low, high })
        },
        FilterKind::Invalid => {
            return Err(ValidationError::UnknownFilter {
                key: key.to_string(),
            });
        },
    };
    Ok(CustomFilter {
        field: field.to_string(),
        predicate,
    })
}

fn equality_predicate(
    key: &str,
    value: &Value,
    validator: &FilterValidator,
) -> Result<Predicate, ValidationError> {
    let Value::Array(values) = value else {
        return Ok(Predicate::Equals(value.clone()));
    };
    if values.is_empty() {
        return Err(ValidationError::MalformedValue {
            key: key.to_string(),
            reason: "list of values must not be empty",
        });
    }
    if !values.iter().all(Value::is_scalar) {
        return Err(ValidationError::MalformedValue {
            key: key.to_string(),
            reason: "list values must be scalars",
        });
    }
    validator.check_values(key, values)?;
    Ok(Predicate::OneOf(values.clone()))
}

fn range_bounds(key: &str, value: &Value) -> Result<(Value, Value), ValidationError> {
    match value {
        Value::Array(bounds) => match bounds.as_slice() {
            [low, high] if is_bound(low) && is_bound(high) => Ok((low.clone(), high.clone())),
            _ => Err(ValidationError::MalformedValue {
                key: key.to_string(),
                reason: "expected [low, high] with two non-null scalars",
            }),
        },
        _ => Err(ValidationError::MalformedValue {
            key: key.to_string(),
            reason: "expected [low, high]",
        }),
    }
}

const fn is_bound(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Array(_))
}

/// Conjunction of predicate groups, ready to restrict a SELECT or DELETE.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clause {
    groups: Vec<FilterExpr>,
}

impl Clause {
    /// Compose parsed filters into one AND-joined clause.
    #[must_use]
    pub fn compose(filters: &[CustomFilter]) -> Self {
        Self {
            groups: filters.iter().map(CustomFilter::to_expr).collect(),
        }
    }

    /// The AND-joined groups, in key order.
    #[must_use]
    pub fn groups(&self) -> &[FilterExpr] {
        &self.groups
    }

    /// Whether the clause restricts nothing (no WHERE needed).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Render the clause body (without `WHERE`), numbering parameters from
    /// `start_idx`. Returns the SQL, the bound values and the next index.
    #[must_use]
    pub fn to_sql<D: Dialect>(&self, dialect: &D, start_idx: usize) -> (String, Vec<Value>, usize) {
        build_conditions(dialect, &self.groups, start_idx)
    }
}

/// Parse, validate and compose a filter dictionary in one step.
pub fn compile_filters(
    dict: &FilterDict,
    validator: &FilterValidator,
) -> Result<Clause, ValidationError> {
    let filters = parse_filters(dict, validator)?;
    Ok(Clause::compose(&filters))
}
