//! JSON conversions for filter dictionaries and parameter values.
//!
//! Filter dictionaries arrive as JSON objects (`{"age_between": [25, 35]}`);
//! this module maps them onto [`FilterDict`] and [`Value`] and back.

use crate::builder::Value;
use crate::filter::FilterDict;
use crate::validate::ValidationError;
use miniserde::json::{self, Array, Number, Object, Value as JsonValue};

/// Convert a JSON value. Objects are not valid parameter values.
///
/// `key` names the entry being converted, for the error message.
pub fn value_from_json(key: &str, value: &JsonValue) -> Result<Value, ValidationError> {
    Ok(match value {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => number_from_json(n),
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| value_from_json(key, item))
                .collect::<Result<_, _>>()?,
        ),
        JsonValue::Object(_) => {
            return Err(ValidationError::MalformedValue {
                key: key.to_string(),
                reason: "objects are not supported",
            });
        },
    })
}

#[allow(clippy::cast_precision_loss)]
fn number_from_json(n: &Number) -> Value {
    match *n {
        Number::I64(i) => Value::Int(i),
        Number::U64(u) => i64::try_from(u).map_or(Value::Float(u as f64), Value::Int),
        Number::F64(f) => Value::Float(f),
    }
}

/// Convert a value to JSON.
#[must_use]
pub fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Int(i) => JsonValue::Number(Number::I64(*i)),
        Value::Float(f) => JsonValue::Number(Number::F64(*f)),
        Value::String(s) => JsonValue::String(s.clone()),
        Value::Array(items) => {
            let mut array = Array::new();
            array.extend(items.iter().map(value_to_json));
            JsonValue::Array(array)
        },
    }
}

impl FilterDict {
    /// Build a dictionary from a JSON object.
    pub fn from_json(value: &JsonValue) -> Result<Self, ValidationError> {
        let JsonValue::Object(object) = value else {
            return Err(ValidationError::MalformedValue {
                key: "filters".to_string(),
                reason: "expected an object",
            });
        };
        let mut dict = Self::new();
        for (key, item) in object.iter() {
            dict.insert(key.clone(), value_from_json(key, item)?);
        }
        Ok(dict)
    }

    /// Parse a dictionary from JSON text.
    pub fn from_json_str(s: &str) -> Result<Self, ValidationError> {
        let value: JsonValue = json::from_str(s).map_err(|_| ValidationError::MalformedValue {
            key: "filters".to_string(),
            reason: "invalid JSON",
        })?;
        Self::from_json(&value)
    }

    /// Convert back to a JSON object, e.g. to echo it in a response.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        let mut object = Object::new();
        for (key, value) in self.iter() {
            object.insert(key.to_string(), value_to_json(value));
        }
        JsonValue::Object(object)
    }
}
