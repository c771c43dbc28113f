//! Custom filters through the search and delete actions.
//!
//! Every test starts from a resource holding three rows with ages 20, 30
//! and 40.

mod common;

use common::{RESOURCE_ID, data, datastore, field, stored_ages};
use miniserde::json::{self, Value as JsonValue};
use ts_datastore::{
    DATASTORE_DELETE, DATASTORE_SEARCH, DatastoreError, DeleteParams, SearchParams, call_action,
};
use ts_sql::{FilterDict, ValidationError, Value};

fn search_data(filters: &str) -> JsonValue {
    data(&format!(
        r#"{{"resource_id": "{RESOURCE_ID}", "filters": {filters}}}"#
    ))
}

fn delete_data(filters: &str) -> JsonValue {
    data(&format!(
        r#"{{"resource_id": "{RESOURCE_ID}", "force": true, "filters": {filters}}}"#
    ))
}

fn found_ages(result: &JsonValue) -> Vec<String> {
    match field(result, "records") {
        JsonValue::Array(records) => records
            .iter()
            .map(|r| json::to_string(field(r, "age")))
            .collect(),
        other => panic!("records is not a list: {}", json::to_string(other)),
    }
}

// =============================================================================
// SEARCH
// =============================================================================

mod search_tests {
    use super::*;

    #[test]
    fn test_between_matches_inclusive_range() {
        let mut store = datastore();
        let result = call_action(
            &mut store,
            DATASTORE_SEARCH,
            &search_data(r#"{"age_between": [25, 35]}"#),
        )
        .unwrap();

        assert_eq!(json::to_string(field(&result, "total")), "1");
        assert_eq!(found_ages(&result), ["30"]);
    }

    #[test]
    fn test_between_bounds_are_inclusive() {
        let store = datastore();
        let filters = FilterDict::new().with("age_between", vec![20, 30]);
        let result = store
            .search(&SearchParams::new(RESOURCE_ID).filters(filters))
            .unwrap();

        assert_eq!(result.total, Some(2));
    }

    #[test]
    fn test_filters_are_echoed_unchanged() {
        let mut store = datastore();
        let filters = r#"{"age_between": [25, 35]}"#;
        let result = call_action(&mut store, DATASTORE_SEARCH, &search_data(filters)).unwrap();

        assert_eq!(
            json::to_string(field(&result, "filters")),
            r#"{"age_between":[25,35]}"#
        );
    }

    #[test]
    fn test_caller_dict_is_not_mutated() {
        let store = datastore();
        let filters = FilterDict::new()
            .with("age_not_between", vec![50, 60])
            .with("age", 30);
        let before = filters.clone();
        let params = SearchParams::new(RESOURCE_ID).filters(filters.clone());

        let result = store.search(&params).unwrap();

        assert_eq!(filters, before);
        assert_eq!(params.filters.as_ref(), Some(&before));
        assert_eq!(result.filters, before);
    }

    #[test]
    fn test_not_between_groups_with_equality() {
        let mut store = datastore();
        let result = call_action(
            &mut store,
            DATASTORE_SEARCH,
            &search_data(r#"{"age_not_between": [50, 60], "age": 30}"#),
        )
        .unwrap();

        // Without grouping, `age < 50 OR (age > 60 AND age = 30)` would match
        // every row.
        assert_eq!(json::to_string(field(&result, "total")), "1");
        assert_eq!(found_ages(&result), ["30"]);
    }

    #[test]
    fn test_search_response_snapshot() {
        let mut store = datastore();
        let result = call_action(
            &mut store,
            DATASTORE_SEARCH,
            &search_data(r#"{"age_not_between": [50, 60], "age": 30}"#),
        )
        .unwrap();

        insta::assert_snapshot!(
            json::to_string(&result),
            @r#"{"fields":[{"id":"_id","type":"int"},{"id":"age","type":"int"}],"filters":{"age":30,"age_not_between":[50,60]},"limit":100,"offset":0,"records":[{"_id":2,"age":30}],"resource_id":"6f1d3c2e-8b7a-4e59-a1f0-2d4c6b8e9a07","total":1}"#
        );
    }

    #[test]
    fn test_not_between_excludes_range() {
        let store = datastore();
        let filters = FilterDict::new().with("age_not_between", vec![25, 35]);
        let result = store
            .search(&SearchParams::new(RESOURCE_ID).filters(filters))
            .unwrap();

        let ages: Vec<_> = result.records.iter().filter_map(|r| r.get("age")).collect();
        assert_eq!(ages, [&Value::Int(20), &Value::Int(40)]);
    }

    #[test]
    fn test_equality_list_matches_any() {
        let store = datastore();
        let filters = FilterDict::new().with("age", vec![20, 40, 99]);
        let result = store
            .search(&SearchParams::new(RESOURCE_ID).filters(filters))
            .unwrap();

        assert_eq!(result.total, Some(2));
    }

    #[test]
    fn test_insecure_filter_is_rejected() {
        let mut store = datastore();
        let err = call_action(
            &mut store,
            DATASTORE_SEARCH,
            &search_data(r#"{"insecure_filter": "1); DROP TABLE x; --"}"#),
        )
        .unwrap_err();

        assert!(err.is_validation());
        assert!(matches!(
            err,
            DatastoreError::Validation(ValidationError::UnknownFilter { ref key }) if key == "insecure_filter"
        ));
        assert_eq!(stored_ages(&store), [20, 30, 40]);
    }

    #[test]
    fn test_range_suffix_on_unknown_field_is_rejected() {
        let store = datastore();
        let filters = FilterDict::new().with("height_between", vec![1, 2]);
        let err = store
            .search(&SearchParams::new(RESOURCE_ID).filters(filters))
            .unwrap_err();

        assert!(err.is_validation());
    }

    #[test]
    fn test_malformed_range_is_rejected() {
        let mut store = datastore();
        for filters in [
            r#"{"age_between": [25]}"#,
            r#"{"age_between": 25}"#,
            r#"{"age_not_between": [25, 30, 35]}"#,
            r#"{"age_between": [null, 30]}"#,
            r#"{"age": {"gt": 5}}"#,
        ] {
            let err = call_action(&mut store, DATASTORE_SEARCH, &search_data(filters)).unwrap_err();
            assert!(err.is_validation(), "{filters}: {err}");
        }
    }

    #[test]
    fn test_empty_filters_match_everything() {
        let mut store = datastore();
        let result = call_action(&mut store, DATASTORE_SEARCH, &search_data("{}")).unwrap();

        assert_eq!(json::to_string(field(&result, "total")), "3");
        assert_eq!(json::to_string(field(&result, "filters")), "{}");
    }
}

// =============================================================================
// DELETE
// =============================================================================

mod delete_tests {
    use super::*;

    #[test]
    fn test_delete_between() {
        let mut store = datastore();
        let result = call_action(
            &mut store,
            DATASTORE_DELETE,
            &delete_data(r#"{"age_between": [25, 35]}"#),
        )
        .unwrap();

        assert_eq!(json::to_string(field(&result, "deleted")), "1");
        assert_eq!(stored_ages(&store), [20, 40]);
    }

    #[test]
    fn test_delete_not_between_with_equality() {
        let mut store = datastore();
        call_action(
            &mut store,
            DATASTORE_DELETE,
            &delete_data(r#"{"age_not_between": [50, 60], "age": 30}"#),
        )
        .unwrap();

        assert_eq!(stored_ages(&store), [20, 40]);
    }

    #[test]
    fn test_delete_insecure_filter_leaves_rows() {
        let mut store = datastore();
        let err = call_action(
            &mut store,
            DATASTORE_DELETE,
            &delete_data(r#"{"insecure_filter": "1"}"#),
        )
        .unwrap_err();

        assert!(err.is_validation());
        assert_eq!(stored_ages(&store), [20, 30, 40]);
    }

    #[test]
    fn test_delete_with_valid_and_insecure_keys_deletes_nothing() {
        let mut store = datastore();
        let err = call_action(
            &mut store,
            DATASTORE_DELETE,
            &delete_data(r#"{"age": 20, "insecure_filter": "1); DROP TABLE x; --"}"#),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            DatastoreError::Validation(ValidationError::UnknownFilter { ref key }) if key == "insecure_filter"
        ));
        assert_eq!(stored_ages(&store), [20, 30, 40]);
    }

    #[test]
    fn test_delete_echoes_filters() {
        let mut store = datastore();
        let filters = FilterDict::new().with("age", 20);
        let result = store
            .delete(&DeleteParams::new(RESOURCE_ID).filters(filters.clone()))
            .unwrap();

        assert_eq!(result.deleted, 1);
        assert_eq!(result.filters, Some(filters));
        assert_eq!(stored_ages(&store), [30, 40]);
    }

    #[test]
    fn test_delete_with_empty_filters_keeps_table() {
        let mut store = datastore();
        let result = store
            .delete(&DeleteParams::new(RESOURCE_ID).filters(FilterDict::new()))
            .unwrap();

        assert_eq!(result.deleted, 3);
        assert!(store.resource(RESOURCE_ID).is_some());
        assert!(stored_ages(&store).is_empty());
    }
}
