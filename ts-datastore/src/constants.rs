//! Centralized constants for the ts-datastore crate.
//!
//! Limits, defaults and the names under which the actions are exposed.

// ============================================================================
// ACTION NAMES
// ============================================================================

/// Ingest records into a resource table.
pub const DATASTORE_CREATE: &str = "datastore_ts_create";

/// Search a resource table with optional custom filters.
pub const DATASTORE_SEARCH: &str = "datastore_ts_search";

/// Delete rows (or the whole table) of a resource.
pub const DATASTORE_DELETE: &str = "datastore_ts_delete";

/// All action names, in registration order.
pub const ACTIONS: &[&str] = &[DATASTORE_CREATE, DATASTORE_SEARCH, DATASTORE_DELETE];

// ============================================================================
// SEARCH LIMITS
// ============================================================================

/// Rows returned by a search that gives no limit.
pub const DEFAULT_LIMIT: u32 = 100;

/// Upper bound on the rows a single search may return.
pub const MAX_LIMIT: u32 = 32_000;

// ============================================================================
// STORAGE
// ============================================================================

/// Database path that opens a private in-memory database.
pub const IN_MEMORY_DATABASE: &str = ":memory:";

/// Name of the datastore-assigned row id column.
pub const ROW_ID: &str = "_id";

/// Registry of resources and their read-only flag.
pub(crate) const RESOURCES_TABLE: &str = "_ts_resources";

/// Registry of resource fields and their types, in column order.
pub(crate) const FIELDS_TABLE: &str = "_ts_fields";

// ============================================================================
// ENVIRONMENT
// ============================================================================

/// Config file path for the CLI.
pub const ENV_CONFIG: &str = "TS_DATASTORE_CONFIG";

/// Database path for the CLI, overriding the config file.
pub const ENV_DATABASE: &str = "TS_DATASTORE_DATABASE";
