//! Records and the mapping between datastore values and SQLite values.

use miniserde::json::{Object, Value as JsonValue};
use rusqlite::ToSql;
use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use ts_sql::{FieldType, ValidationError, Value, value_from_json, value_to_json};

/// One row of a resource: column name to value, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    values: Vec<(String, Value)>,
}

impl Record {
    /// Create an empty record.
    #[must_use]
    pub const fn new() -> Self {
        Self { values: Vec::new() }
    }

    /// Add a column, replacing a previous value of the same column.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    /// Set a column, replacing a previous value of the same column.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.values.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.values.push((column, value)),
        }
    }

    /// Value of a column.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values
            .iter()
            .find_map(|(c, v)| (c == column).then_some(v))
    }

    /// Datastore-assigned row id, for records read back from a resource.
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        match self.get(crate::constants::ROW_ID) {
            Some(Value::Int(id)) => Some(*id),
            _ => None,
        }
    }

    /// Iterate over columns in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(c, v)| (c.as_str(), v))
    }

    /// Column names in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(c, _)| c.as_str())
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the record has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Build a record from a JSON object.
    pub fn from_json(value: &JsonValue) -> Result<Self, ValidationError> {
        let JsonValue::Object(object) = value else {
            return Err(ValidationError::MalformedValue {
                key: "records".to_string(),
                reason: "each record must be an object",
            });
        };
        let mut record = Self::new();
        for (column, item) in object.iter() {
            record.insert(column.clone(), value_from_json(column, item)?);
        }
        Ok(record)
    }

    /// Convert to a JSON object.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        let mut object = Object::new();
        for (column, value) in self.iter() {
            object.insert(column.to_string(), value_to_json(value));
        }
        JsonValue::Object(object)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (column, value) in iter {
            record.insert(column, value);
        }
        record
    }
}

/// Bind adapter for [`Value`] parameters.
///
/// Arrays only appear as parameters in the Postgres dialect and cannot be
/// bound to a SQLite statement.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SqlParam<'a>(pub &'a Value);

impl ToSql for SqlParam<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self.0 {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Value::Int(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Float(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Value::String(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Array(_) => {
                return Err(rusqlite::Error::ToSqlConversionFailure(
                    "array parameters cannot be bound in SQLite".into(),
                ));
            },
        })
    }
}

/// Read a stored value back as the field's type.
///
/// Booleans are stored as integers and floats may come back integral, so
/// the declared type decides the variant.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn value_from_sql(raw: ValueRef<'_>, ty: FieldType) -> Value {
    match (raw, ty) {
        (ValueRef::Null, _) => Value::Null,
        (ValueRef::Integer(i), FieldType::Bool) => Value::Bool(i != 0),
        (ValueRef::Integer(i), FieldType::Float) => Value::Float(i as f64),
        (ValueRef::Integer(i), _) => Value::Int(i),
        (ValueRef::Real(f), _) => Value::Float(f),
        (ValueRef::Text(bytes) | ValueRef::Blob(bytes), _) => {
            Value::String(String::from_utf8_lossy(bytes).into_owned())
        },
    }
}
