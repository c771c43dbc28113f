//! SQL generation for datastore custom filters.
//!
//! `ts-sql` turns a caller-supplied filter dictionary into a parameterized,
//! correctly grouped WHERE clause and provides the small set of statement
//! builders the datastore needs (SELECT, COUNT, DELETE, INSERT, DDL).
//!
//! ```
//! use ts_sql::{FilterDict, FilterValidator, compile_filters, sqlite};
//!
//! let validator = FilterValidator::new().allow_fields(&["_id", "age"]);
//! let filters = FilterDict::new().with("age_between", vec![25, 35]);
//! let clause = compile_filters(&filters, &validator).unwrap();
//!
//! let query = sqlite("readings").clause(&clause).build();
//! assert_eq!(
//!     query.sql,
//!     r#"SELECT * FROM "readings" WHERE "age" BETWEEN ?1 AND ?2"#
//! );
//! ```

mod builder;
mod ddl;
mod dialect;
mod filter;
mod json;
mod validate;

pub use builder::{
    CompoundFilter, DeleteBuilder, Filter, FilterExpr, InsertBuilder, Operator, QueryBuilder,
    QueryResult, SortDir, SortField, Value, delete, delete_sqlite, insert, insert_sqlite, postgres,
    sqlite,
};
pub use ddl::{CreateTableBuilder, FieldType, add_column, drop_table};
pub use dialect::{Dialect, Postgres, Sqlite};
pub use filter::{
    BETWEEN_SUFFIX, Clause, CustomFilter, FilterDict, FilterKind, NOT_BETWEEN_SUFFIX, Predicate,
    compile_filters, parse_filters,
};
pub use json::{value_from_json, value_to_json};
pub use validate::{
    DEFAULT_MAX_FILTER_VALUES, FilterValidator, ValidationError, assert_valid_sql_identifier,
    assert_valid_table_name, is_valid_sql_identifier, is_valid_table_name,
};
