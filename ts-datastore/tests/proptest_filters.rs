//! Property tests: range filters executed by SQLite agree with the same
//! predicates evaluated in Rust.

mod common;

use common::{RESOURCE_ID, datastore_with_ages, stored_ages};
use proptest::prelude::*;
use ts_datastore::{DeleteParams, FilterDict, SearchParams};

fn count(store: &ts_datastore::Datastore, filters: FilterDict) -> u64 {
    store
        .search(&SearchParams::new(RESOURCE_ID).filters(filters))
        .unwrap()
        .total
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// `_between` and `_not_between` partition the rows
    #[test]
    fn between_and_not_between_partition(
        ages in prop::collection::vec(-100i64..100, 0..20),
        low in -120i64..120,
        high in -120i64..120,
    ) {
        let store = datastore_with_ages(&ages);

        let inside = count(&store, FilterDict::new().with("age_between", vec![low, high]));
        let outside = count(&store, FilterDict::new().with("age_not_between", vec![low, high]));

        let expected = ages.iter().filter(|a| low <= **a && **a <= high).count() as u64;
        prop_assert_eq!(inside, expected);
        prop_assert_eq!(inside + outside, ages.len() as u64);
    }

    /// Equality ANDed with `_not_between` keeps only the equal rows outside the range
    #[test]
    fn not_between_with_equality(
        ages in prop::collection::vec(0i64..10, 1..20),
        target in 0i64..10,
        low in 0i64..10,
        high in 0i64..10,
    ) {
        let store = datastore_with_ages(&ages);
        let filters = FilterDict::new()
            .with("age", target)
            .with("age_not_between", vec![low, high]);

        let outside = target < low || target > high;
        let expected = if outside {
            ages.iter().filter(|a| **a == target).count() as u64
        } else {
            0
        };
        prop_assert_eq!(count(&store, filters), expected);
    }

    /// Deleting a range leaves exactly the rows outside it
    #[test]
    fn delete_between_leaves_complement(
        ages in prop::collection::vec(-50i64..50, 0..20),
        low in -60i64..60,
        high in -60i64..60,
    ) {
        let mut store = datastore_with_ages(&ages);
        store
            .delete(
                &DeleteParams::new(RESOURCE_ID)
                    .filters(FilterDict::new().with("age_between", vec![low, high])),
            )
            .unwrap();

        let expected: Vec<i64> = ages.iter().copied().filter(|a| *a < low || *a > high).collect();
        prop_assert_eq!(stored_ages(&store), expected);
    }
}
