//! Shared test utilities and fixtures.
//!
//! This module provides common helpers for integration tests.

use miniserde::json::{self, Value as JsonValue};
use ts_datastore::{CreateParams, Datastore, FieldType, Record, SearchParams};
use ts_sql::Value;

/// Resource id used by the fixtures.
#[allow(dead_code)]
pub const RESOURCE_ID: &str = "6f1d3c2e-8b7a-4e59-a1f0-2d4c6b8e9a07";

/// Ages stored by [`datastore_with_ages`].
#[allow(dead_code)]
pub const AGES: [i64; 3] = [20, 30, 40];

/// In-memory datastore holding one resource with an `age` row per value.
#[allow(dead_code)]
pub fn datastore_with_ages(ages: &[i64]) -> Datastore {
    let mut store = Datastore::in_memory().unwrap();
    let records = ages.iter().map(|a| Record::new().with("age", *a)).collect();
    store
        .create(
            &CreateParams::new(RESOURCE_ID)
                .field("age", FieldType::Int)
                .records(records),
        )
        .unwrap();
    store
}

/// The standard fixture: ages 20, 30 and 40.
#[allow(dead_code)]
pub fn datastore() -> Datastore {
    datastore_with_ages(&AGES)
}

/// Ages currently stored in the fixture resource, in row order.
#[allow(dead_code)]
pub fn stored_ages(store: &Datastore) -> Vec<i64> {
    let result = store.search(&SearchParams::new(RESOURCE_ID)).unwrap();
    result
        .records
        .iter()
        .map(|r| match r.get("age") {
            Some(Value::Int(age)) => *age,
            other => panic!("unexpected age {other:?}"),
        })
        .collect()
}

/// Parse a JSON data dictionary.
#[allow(dead_code)]
pub fn data(s: &str) -> JsonValue {
    json::from_str(s).unwrap()
}

/// Look up a key of a JSON object.
#[allow(dead_code)]
pub fn field<'a>(value: &'a JsonValue, key: &str) -> &'a JsonValue {
    match value {
        JsonValue::Object(object) => object
            .get(key)
            .unwrap_or_else(|| panic!("missing key {key}")),
        _ => panic!("expected an object, got {}", json::to_string(value)),
    }
}
