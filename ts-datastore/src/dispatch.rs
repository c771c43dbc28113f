//! Name-based action dispatch over JSON data dictionaries.
//!
//! ```
//! use miniserde::json;
//! use ts_datastore::{Datastore, call_action};
//!
//! let mut store = Datastore::in_memory().unwrap();
//! let data = json::from_str(r#"{"resource_id": "r1", "records": [{"age": 30}]}"#).unwrap();
//! call_action(&mut store, "datastore_ts_create", &data).unwrap();
//!
//! let data = json::from_str(r#"{"resource_id": "r1", "filters": {"age_between": [25, 35]}}"#).unwrap();
//! let result = call_action(&mut store, "datastore_ts_search", &data).unwrap();
//! assert!(json::to_string(&result).contains(r#""total":1"#));
//! ```

use miniserde::json::{Number, Object, Value as JsonValue};
use tracing::debug;
use ts_sql::{FieldType, FilterDict};

use crate::actions::{CreateParams, DeleteParams, SearchParams};
use crate::constants::{DATASTORE_CREATE, DATASTORE_DELETE, DATASTORE_SEARCH};
use crate::error::{DatastoreError, Result};
use crate::records::Record;
use crate::store::{Datastore, FieldInfo};

/// Run the action registered under `name` with a JSON data dictionary.
pub fn call_action(store: &mut Datastore, name: &str, data: &JsonValue) -> Result<JsonValue> {
    let data = Params::new(data)?;
    debug!(action = name, "Calling action");
    match name {
        DATASTORE_CREATE => {
            data.only(&["resource_id", "records", "fields", "force", "read_only"])?;
            let mut params = CreateParams::new(data.required_str("resource_id")?)
                .force(data.bool("force")?.unwrap_or(false))
                .read_only(data.bool("read_only")?.unwrap_or(false));
            if let Some(items) = data.array("records")? {
                params.records = items
                    .iter()
                    .map(Record::from_json)
                    .collect::<std::result::Result<_, _>>()?;
            }
            if let Some(items) = data.array("fields")? {
                params.fields = items
                    .iter()
                    .map(field_from_json)
                    .collect::<Result<_>>()?;
            }
            Ok(store.create(&params)?.to_json())
        },
        DATASTORE_SEARCH => {
            data.only(&[
                "resource_id",
                "filters",
                "fields",
                "sort",
                "limit",
                "offset",
                "include_total",
            ])?;
            let mut params = SearchParams::new(data.required_str("resource_id")?);
            params.filters = data.filters()?;
            if let Some(items) = data.array("fields")? {
                params.fields = Some(
                    items
                        .iter()
                        .map(|item| match item {
                            JsonValue::String(s) => Ok(s.clone()),
                            _ => Err(DatastoreError::invalid_parameter(
                                "fields",
                                "expected a list of column names",
                            )),
                        })
                        .collect::<Result<_>>()?,
                );
            }
            params.sort = data.str("sort")?.map(str::to_string);
            params.limit = data.u32("limit")?;
            params.offset = data.u32("offset")?.unwrap_or(0);
            params.include_total = data.bool("include_total")?.unwrap_or(true);
            Ok(store.search(&params)?.to_json())
        },
        DATASTORE_DELETE => {
            data.only(&["resource_id", "filters", "force"])?;
            let mut params = DeleteParams::new(data.required_str("resource_id")?)
                .force(data.bool("force")?.unwrap_or(false));
            params.filters = data.filters()?;
            Ok(store.delete(&params)?.to_json())
        },
        _ => Err(DatastoreError::UnknownAction(name.to_string())),
    }
}

/// Typed access to the entries of a data dictionary. `null` counts as absent.
struct Params<'a> {
    object: &'a Object,
}

impl<'a> Params<'a> {
    fn new(data: &'a JsonValue) -> Result<Self> {
        match data {
            JsonValue::Object(object) => Ok(Self { object }),
            _ => Err(DatastoreError::invalid_parameter(
                "data",
                "expected a JSON object",
            )),
        }
    }

    fn get(&self, name: &str) -> Option<&'a JsonValue> {
        match self.object.get(name) {
            None | Some(JsonValue::Null) => None,
            Some(value) => Some(value),
        }
    }

    fn only(&self, known: &[&str]) -> Result<()> {
        match self.object.keys().find(|k| !known.contains(&k.as_str())) {
            Some(key) => Err(DatastoreError::invalid_parameter(key, "unknown parameter")),
            None => Ok(()),
        }
    }

    fn str(&self, name: &str) -> Result<Option<&'a str>> {
        match self.get(name) {
            None => Ok(None),
            Some(JsonValue::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(DatastoreError::invalid_parameter(name, "expected a string")),
        }
    }

    fn required_str(&self, name: &str) -> Result<&'a str> {
        self.str(name)?
            .ok_or_else(|| DatastoreError::invalid_parameter(name, "missing value"))
    }

    fn bool(&self, name: &str) -> Result<Option<bool>> {
        match self.get(name) {
            None => Ok(None),
            Some(JsonValue::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(DatastoreError::invalid_parameter(name, "expected a boolean")),
        }
    }

    fn u32(&self, name: &str) -> Result<Option<u32>> {
        let invalid = || DatastoreError::invalid_parameter(name, "expected a non-negative integer");
        match self.get(name) {
            None => Ok(None),
            Some(JsonValue::Number(Number::U64(n))) => {
                u32::try_from(*n).map(Some).map_err(|_| invalid())
            },
            Some(JsonValue::Number(Number::I64(n))) => {
                u32::try_from(*n).map(Some).map_err(|_| invalid())
            },
            Some(_) => Err(invalid()),
        }
    }

    fn array(&self, name: &str) -> Result<Option<&'a [JsonValue]>> {
        match self.get(name) {
            None => Ok(None),
            Some(JsonValue::Array(items)) => Ok(Some(items.as_slice())),
            Some(_) => Err(DatastoreError::invalid_parameter(name, "expected a list")),
        }
    }

    fn filters(&self) -> Result<Option<FilterDict>> {
        self.get("filters")
            .map(|value| FilterDict::from_json(value).map_err(DatastoreError::from))
            .transpose()
    }
}

fn field_from_json(value: &JsonValue) -> Result<FieldInfo> {
    let invalid = || {
        DatastoreError::invalid_parameter("fields", r#"expected {"id": <name>, "type": <type>}"#)
    };
    let JsonValue::Object(object) = value else {
        return Err(invalid());
    };
    let (Some(JsonValue::String(id)), Some(JsonValue::String(type_name))) =
        (object.get("id"), object.get("type"))
    else {
        return Err(invalid());
    };
    let ty = FieldType::parse(type_name).ok_or_else(|| {
        DatastoreError::invalid_parameter("fields", format!("unknown field type '{type_name}'"))
    })?;
    Ok(FieldInfo::new(id.clone(), ty))
}

#[cfg(test)]
mod tests {
    use super::*;
    use miniserde::json;

    fn data(s: &str) -> JsonValue {
        json::from_str(s).unwrap()
    }

    #[test]
    fn test_unknown_action() {
        let mut store = Datastore::in_memory().unwrap();
        let err = call_action(&mut store, "datastore_ts_upsert", &data("{}")).unwrap_err();
        assert!(matches!(err, DatastoreError::UnknownAction(ref n) if n == "datastore_ts_upsert"));
    }

    #[test]
    fn test_data_must_be_object() {
        let mut store = Datastore::in_memory().unwrap();
        let err = call_action(&mut store, DATASTORE_SEARCH, &data("[]")).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_missing_resource_id() {
        let mut store = Datastore::in_memory().unwrap();
        let err = call_action(&mut store, DATASTORE_SEARCH, &data("{}")).unwrap_err();
        assert_eq!(err.to_string(), "Invalid parameter 'resource_id': missing value");
    }

    #[test]
    fn test_unknown_parameter() {
        let mut store = Datastore::in_memory().unwrap();
        let err = call_action(
            &mut store,
            DATASTORE_DELETE,
            &data(r#"{"resource_id": "r1", "filter": {}}"#),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid parameter 'filter': unknown parameter");
    }

    #[test]
    fn test_negative_limit() {
        let mut store = Datastore::in_memory().unwrap();
        let err = call_action(
            &mut store,
            DATASTORE_SEARCH,
            &data(r#"{"resource_id": "r1", "limit": -1}"#),
        )
        .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_field_from_json() {
        let field = field_from_json(&data(r#"{"id": "age", "type": "int4"}"#)).unwrap();
        assert_eq!(field, FieldInfo::new("age", FieldType::Int));

        assert!(field_from_json(&data(r#"{"id": "age", "type": "blob"}"#)).is_err());
        assert!(field_from_json(&data(r#"{"id": "age"}"#)).is_err());
        assert!(field_from_json(&data(r#""age""#)).is_err());
    }

    #[test]
    fn test_create_then_search_json() {
        let mut store = Datastore::in_memory().unwrap();
        let created = call_action(
            &mut store,
            DATASTORE_CREATE,
            &data(
                r#"{"resource_id": "r1",
                    "fields": [{"id": "age", "type": "int"}],
                    "records": [{"age": 20}, {"age": 30}, {"age": 40}]}"#,
            ),
        )
        .unwrap();
        assert_eq!(
            json::to_string(&created),
            r#"{"fields":[{"id":"age","type":"int"}],"records_inserted":3,"resource_id":"r1"}"#
        );

        let found = call_action(
            &mut store,
            DATASTORE_SEARCH,
            &data(r#"{"resource_id": "r1", "filters": {"age_between": [25, 35]}}"#),
        )
        .unwrap();
        assert_eq!(
            json::to_string(&found),
            concat!(
                r#"{"fields":[{"id":"_id","type":"int"},{"id":"age","type":"int"}],"#,
                r#""filters":{"age_between":[25,35]},"limit":100,"offset":0,"#,
                r#""records":[{"_id":2,"age":30}],"resource_id":"r1","total":1}"#
            )
        );
    }
}
