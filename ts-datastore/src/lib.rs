//! Timeseries datastore actions over SQLite.
//!
//! Three actions operate on resource tables:
//!
//! | Action                 | Effect                                              |
//! |------------------------|-----------------------------------------------------|
//! | `datastore_ts_create`  | create the table, add new fields, insert records    |
//! | `datastore_ts_search`  | select rows matching custom filters                 |
//! | `datastore_ts_delete`  | delete matching rows, or the whole resource         |
//!
//! Search and delete take custom filters (`age`, `age_between`,
//! `age_not_between`) compiled by [`ts_sql`]. Keys that do not name a field
//! of the resource are rejected before any SQL runs.
//!
//! # Example
//!
//! ```
//! use ts_datastore::{CreateParams, Datastore, Record, SearchParams};
//! use ts_sql::FilterDict;
//!
//! let mut store = Datastore::in_memory().unwrap();
//! store
//!     .create(&CreateParams::new("r1").records(vec![
//!         Record::new().with("age", 20),
//!         Record::new().with("age", 30),
//!         Record::new().with("age", 40),
//!     ]))
//!     .unwrap();
//!
//! let filters = FilterDict::new().with("age_not_between", vec![50, 60]).with("age", 30);
//! let result = store.search(&SearchParams::new("r1").filters(filters)).unwrap();
//! assert_eq!(result.total, Some(1));
//! ```

pub mod actions;
pub mod cli;
pub mod config;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod records;
pub mod store;

pub use actions::{
    CreateParams, CreateResult, DeleteParams, DeleteResult, SearchParams, SearchResult,
};
pub use config::{ConfigError, DatastoreConfig};
pub use constants::{DATASTORE_CREATE, DATASTORE_DELETE, DATASTORE_SEARCH};
pub use dispatch::call_action;
pub use error::{DatastoreError, Result};
pub use records::Record;
pub use store::{Datastore, FieldInfo, Resource};
pub use ts_sql::{FieldType, FilterDict};
