//! Security validation layer for custom filters and SQL identifiers.
//!
//! This module provides validation for:
//! - Filter keys (field whitelisting through [`FilterValidator`])
//! - Filter values (shape and size limits)
//! - SQL identifiers (column names) and table names to prevent injection
//!
//! # Example
//!
//! ```
//! use ts_sql::{FilterKind, FilterValidator};
//!
//! let validator = FilterValidator::new().allow_fields(&["age", "station"]);
//!
//! assert_eq!(validator.classify("age_between"), FilterKind::Between("age"));
//! assert_eq!(validator.classify("insecure_filter"), FilterKind::Invalid);
//! ```

use crate::Value;
use crate::filter::FilterKind;
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════
// SQL IDENTIFIER VALIDATION
// ═══════════════════════════════════════════════════════════════════════════

/// Maximum length for SQL identifiers (`PostgreSQL` limit is 63).
const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Maximum length for resource table names.
const MAX_TABLE_NAME_LENGTH: usize = 64;

/// Default maximum number of values in a list-valued filter.
pub const DEFAULT_MAX_FILTER_VALUES: usize = 1000;

/// Validate that a string is a safe SQL identifier.
///
/// A valid SQL identifier:
/// - Starts with a letter (a-z, A-Z) or underscore
/// - Contains only letters, digits (0-9), and underscores
/// - Is not empty and not longer than 63 characters
///
/// # Examples
///
/// ```
/// use ts_sql::is_valid_sql_identifier;
///
/// assert!(is_valid_sql_identifier("age"));
/// assert!(is_valid_sql_identifier("_id"));
///
/// assert!(!is_valid_sql_identifier(""));
/// assert!(!is_valid_sql_identifier("123abc"));
/// assert!(!is_valid_sql_identifier("age; DROP"));
/// ```
#[inline]
#[must_use]
pub fn is_valid_sql_identifier(s: &str) -> bool {
    if s.is_empty() || s.len() > MAX_IDENTIFIER_LENGTH {
        return false;
    }

    let mut chars = s.chars();

    // First character must be letter or underscore
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {},
        _ => return false,
    }

    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Assert that a string is a valid SQL identifier.
///
/// # Panics
///
/// Panics with a descriptive error if the identifier is invalid.
/// This is intended for programmer errors (invalid column names in code),
/// not for user input validation.
#[inline]
pub fn assert_valid_sql_identifier(s: &str, context: &str) {
    assert!(
        is_valid_sql_identifier(s),
        "Invalid SQL {context} name '{s}': must start with letter/underscore, \
             contain only ASCII alphanumeric/underscore, and be 1-63 chars"
    );
}

/// Validate a resource table name.
///
/// Resource ids are UUID-like, so hyphens are allowed in addition to ASCII
/// alphanumerics and underscores. Table names are always emitted quoted.
///
/// ```
/// use ts_sql::is_valid_table_name;
///
/// assert!(is_valid_table_name("0b6a7c1e-2f4d-4a7e-9d55-6c1f0e3a9b21"));
/// assert!(!is_valid_table_name("res\"; DROP TABLE x; --"));
/// ```
#[inline]
#[must_use]
pub fn is_valid_table_name(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= MAX_TABLE_NAME_LENGTH
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Assert that a string is a valid resource table name.
///
/// # Panics
///
/// Panics if the name is invalid.
#[inline]
pub fn assert_valid_table_name(s: &str) {
    assert!(
        is_valid_table_name(s),
        "Invalid table name '{s}': must contain only ASCII alphanumeric, '_' or '-' \
             and be 1-64 chars"
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// FILTER VALIDATION
// ═══════════════════════════════════════════════════════════════════════════

/// Validation configuration for user-provided filters.
///
/// Two layers:
/// 1. Field whitelist - a key must name a known field, optionally with a
///    range suffix. An empty whitelist rejects every key.
/// 2. Value limits - list-valued filters are capped at `max_values`.
#[derive(Debug, Clone)]
pub struct FilterValidator {
    /// Known field names of the resource.
    pub allowed_fields: Vec<String>,
    /// Maximum number of values in a list-valued filter.
    pub max_values: usize,
}

impl FilterValidator {
    /// Create a validator that knows no fields yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            allowed_fields: Vec::new(),
            max_values: DEFAULT_MAX_FILTER_VALUES,
        }
    }

    /// Set allowed fields (whitelist).
    #[must_use]
    pub fn allow_fields(mut self, fields: &[&str]) -> Self {
        self.allowed_fields = fields.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Set the maximum number of values in a list-valued filter.
    #[must_use]
    pub const fn max_values(mut self, max: usize) -> Self {
        self.max_values = max;
        self
    }

    /// Whether `field` is a known field.
    #[must_use]
    pub fn is_known(&self, field: &str) -> bool {
        self.allowed_fields.iter().any(|f| f == field)
    }

    /// Classify a filter key.
    ///
    /// An exact field name always wins, so a field literally named
    /// `x_between` is filtered by equality. `_not_between` is tried before
    /// `_between` since it also ends with the shorter suffix.
    #[must_use]
    pub fn classify<'k>(&self, key: &'k str) -> FilterKind<'k> {
        if self.is_known(key) {
            return FilterKind::Equality(key);
        }
        match (
            key.strip_suffix(crate::filter::NOT_BETWEEN_SUFFIX),
            key.strip_suffix(crate::filter::BETWEEN_SUFFIX),
        ) {
            (Some(field), _) if self.is_known(field) => FilterKind::NotBetween(field),
            (_, Some(field)) if self.is_known(field) => FilterKind::Between(field),
            _ => FilterKind::Invalid,
        }
    }

    /// Check the size of a list-valued filter.
    pub fn check_values(&self, key: &str, values: &[Value]) -> Result<(), ValidationError> {
        if values.len() > self.max_values {
            return Err(ValidationError::TooManyValues {
                key: key.to_string(),
                max: self.max_values,
                actual: values.len(),
            });
        }
        Ok(())
    }
}

impl Default for FilterValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Validation error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Filter key is neither a known field nor a known field with a range suffix.
    UnknownFilter { key: String },
    /// Filter value has the wrong shape for its key.
    MalformedValue { key: String, reason: &'static str },
    /// List-valued filter exceeds the configured maximum.
    TooManyValues {
        key: String,
        max: usize,
        actual: usize,
    },
    /// Field is not in the allowed list.
    FieldNotAllowed { field: String, allowed: Vec<String> },
    /// Name cannot be used as a table or column identifier.
    InvalidIdentifier { kind: &'static str, name: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownFilter { key } => write!(f, "Filter '{key}' is not allowed"),
            Self::MalformedValue { key, reason } => {
                write!(f, "Invalid value for '{key}': {reason}")
            },
            Self::TooManyValues { key, max, actual } => {
                write!(f, "Filter '{key}' has {actual} values (max {max})")
            },
            Self::FieldNotAllowed { field, allowed } => {
                write!(
                    f,
                    "Field '{}' is not allowed. Allowed fields: {}",
                    field,
                    allowed.join(", ")
                )
            },
            Self::InvalidIdentifier { kind, name } => {
                write!(f, "Invalid {kind} name '{name}'")
            },
        }
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validator_default_knows_nothing() {
        let validator = FilterValidator::new();
        assert!(validator.allowed_fields.is_empty());
        assert_eq!(validator.max_values, DEFAULT_MAX_FILTER_VALUES);
        assert_eq!(validator.classify("age"), FilterKind::Invalid);
    }

    #[test]
    fn test_classify_suffixes() {
        let validator = FilterValidator::new().allow_fields(&["age", "station"]);

        assert_eq!(validator.classify("age"), FilterKind::Equality("age"));
        assert_eq!(validator.classify("age_between"), FilterKind::Between("age"));
        assert_eq!(
            validator.classify("age_not_between"),
            FilterKind::NotBetween("age")
        );
        assert_eq!(validator.classify("insecure_filter"), FilterKind::Invalid);
        assert_eq!(validator.classify("height_between"), FilterKind::Invalid);
        assert_eq!(validator.classify("_between"), FilterKind::Invalid);
        assert_eq!(validator.classify("age_between_between"), FilterKind::Invalid);
    }

    #[test]
    fn test_classify_exact_field_wins() {
        let validator = FilterValidator::new().allow_fields(&["span_between", "span"]);
        assert_eq!(
            validator.classify("span_between"),
            FilterKind::Equality("span_between")
        );
        assert_eq!(
            validator.classify("span_between_between"),
            FilterKind::Between("span_between")
        );
    }

    #[test]
    fn test_classify_not_suffix_needs_known_remainder() {
        // Only the "_between" split names a known field here
        let validator = FilterValidator::new().allow_fields(&["age_not"]);
        assert_eq!(
            validator.classify("age_not_between"),
            FilterKind::Between("age_not")
        );

        let validator = FilterValidator::new().allow_fields(&["age"]);
        assert_eq!(
            validator.classify("age_not_between"),
            FilterKind::NotBetween("age")
        );
    }

    #[test]
    fn test_check_values_limit() {
        let validator = FilterValidator::new().max_values(2);
        let values = vec![Value::Int(1), Value::Int(2), Value::Int(3)];

        match validator.check_values("age", &values).unwrap_err() {
            ValidationError::TooManyValues { key, max, actual } => {
                assert_eq!(key, "age");
                assert_eq!(max, 2);
                assert_eq!(actual, 3);
            },
            other => panic!("Expected TooManyValues, got {other:?}"),
        }
        assert!(validator.check_values("age", &values[..2]).is_ok());
    }

    #[test]
    fn test_table_names() {
        assert!(is_valid_table_name("abc-123_def"));
        assert!(!is_valid_table_name(""));
        assert!(!is_valid_table_name("a b"));
        assert!(!is_valid_table_name(&"a".repeat(65)));
    }

    #[test]
    #[should_panic(expected = "Invalid table name")]
    fn test_assert_table_name_panics() {
        assert_valid_table_name("x\"; DROP TABLE y; --");
    }

    #[test]
    fn test_error_display() {
        let err = ValidationError::UnknownFilter {
            key: "insecure_filter".into(),
        };
        assert_eq!(err.to_string(), "Filter 'insecure_filter' is not allowed");

        let err = ValidationError::MalformedValue {
            key: "age_between".into(),
            reason: "expected [low, high]",
        };
        assert_eq!(
            err.to_string(),
            "Invalid value for 'age_between': expected [low, high]"
        );
    }
}
