//! Resource registry and the SQLite connection behind the actions.
//!
//! Every resource is one table named after the resource id. Its fields and
//! the read-only flag are kept in two registry tables, so a datastore
//! opened on an existing database file knows its resources again.

use std::collections::BTreeMap;

use rusqlite::Connection;
use rusqlite::types::Type;
use tracing::debug;
use ts_sql::{
    Dialect, FieldType, FilterValidator, Sqlite, ValidationError, is_valid_sql_identifier,
    is_valid_table_name,
};

use crate::config::DatastoreConfig;
use crate::constants::{FIELDS_TABLE, RESOURCES_TABLE, ROW_ID};
use crate::error::Result;

/// A typed column of a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// Column name.
    pub id: String,
    /// Storage type.
    pub ty: FieldType,
}

impl FieldInfo {
    /// Create a field description.
    pub fn new(id: impl Into<String>, ty: FieldType) -> Self {
        Self { id: id.into(), ty }
    }
}

/// A registered resource table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Resource id, also the table name.
    pub id: String,
    /// Refuse create and delete unless forced.
    pub read_only: bool,
    /// User fields in column order, without `_id`.
    pub fields: Vec<FieldInfo>,
}

impl Resource {
    pub(crate) fn new(id: impl Into<String>, read_only: bool) -> Self {
        Self {
            id: id.into(),
            read_only,
            fields: Vec::new(),
        }
    }

    /// Field with the given name.
    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.id == name)
    }

    /// Type of a column, including `_id`.
    pub fn column_type(&self, name: &str) -> Option<FieldType> {
        if name == ROW_ID {
            return Some(FieldType::Int);
        }
        self.field(name).map(|f| f.ty)
    }

    /// All selectable columns: `_id` followed by the user fields.
    pub fn columns(&self) -> Vec<&str> {
        std::iter::once(ROW_ID)
            .chain(self.fields.iter().map(|f| f.id.as_str()))
            .collect()
    }

    /// Filter validator that knows exactly this resource's columns.
    pub fn validator(&self, max_values: usize) -> FilterValidator {
        FilterValidator::new()
            .allow_fields(&self.columns())
            .max_values(max_values)
    }
}

/// An open datastore: one SQLite database holding resource tables.
#[derive(Debug)]
pub struct Datastore {
    pub(crate) conn: Connection,
    pub(crate) config: DatastoreConfig,
    pub(crate) resources: BTreeMap<String, Resource>,
}

impl Datastore {
    /// Open the database named by the configuration.
    pub fn open(config: DatastoreConfig) -> Result<Self> {
        config.validate()?;
        let conn = if config.is_in_memory() {
            Connection::open_in_memory()?
        } else {
            Connection::open(&config.database)?
        };
        Self::with_connection(conn, config)
    }

    /// Open a private in-memory datastore with default settings.
    pub fn in_memory() -> Result<Self> {
        Self::open(DatastoreConfig::default())
    }

    /// Use an already opened connection.
    pub fn with_connection(conn: Connection, config: DatastoreConfig) -> Result<Self> {
        conn.execute_batch(&registry_schema())?;
        let resources = load_registry(&conn)?;
        debug!(
            database = %config.database,
            resources = resources.len(),
            "Opened datastore"
        );
        Ok(Self {
            conn,
            config,
            resources,
        })
    }

    /// Active configuration.
    pub const fn config(&self) -> &DatastoreConfig {
        &self.config
    }

    /// Registered resource with the given id.
    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.resources.get(id)
    }

    /// All registered resources, ordered by id.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    /// Change the read-only flag of a resource.
    pub fn set_read_only(&mut self, id: &str, read_only: bool) -> Result<()> {
        let Some(resource) = self.resources.get_mut(id) else {
            return Err(crate::DatastoreError::ResourceNotFound(id.to_string()));
        };
        self.conn.execute(
            &format!(
                "UPDATE {} SET read_only = ?1 WHERE id = ?2",
                Sqlite.quote_ident(RESOURCES_TABLE)
            ),
            rusqlite::params![read_only, id],
        )?;
        resource.read_only = read_only;
        Ok(())
    }

    pub(crate) fn require(&self, id: &str) -> Result<&Resource> {
        self.resources
            .get(id)
            .ok_or_else(|| crate::DatastoreError::ResourceNotFound(id.to_string()))
    }
}

/// Check a caller-supplied resource id.
///
/// Ids starting with `_` are reserved for the registry tables.
pub(crate) fn check_resource_id(id: &str) -> std::result::Result<(), ValidationError> {
    if is_valid_table_name(id) && !id.starts_with('_') {
        Ok(())
    } else {
        Err(ValidationError::InvalidIdentifier {
            kind: "resource",
            name: id.to_string(),
        })
    }
}

/// Check a caller-supplied field name.
///
/// Names starting with `_` are reserved for datastore columns such as `_id`.
pub(crate) fn check_field_name(name: &str) -> std::result::Result<(), ValidationError> {
    if is_valid_sql_identifier(name) && !name.starts_with('_') {
        Ok(())
    } else {
        Err(ValidationError::InvalidIdentifier {
            kind: "field",
            name: name.to_string(),
        })
    }
}

fn registry_schema() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {resources} (
             id TEXT PRIMARY KEY,
             read_only INTEGER NOT NULL DEFAULT 0
         );
         CREATE TABLE IF NOT EXISTS {fields} (
             resource_id TEXT NOT NULL,
             position INTEGER NOT NULL,
             name TEXT NOT NULL,
             type TEXT NOT NULL,
             PRIMARY KEY (resource_id, name)
         );",
        resources = Sqlite.quote_ident(RESOURCES_TABLE),
        fields = Sqlite.quote_ident(FIELDS_TABLE),
    )
}

fn load_registry(conn: &Connection) -> Result<BTreeMap<String, Resource>> {
    let mut resources = BTreeMap::new();

    let mut stmt = conn.prepare(&format!(
        "SELECT id, read_only FROM {}",
        Sqlite.quote_ident(RESOURCES_TABLE)
    ))?;
    let rows = stmt.query_map([], |row| {
        Ok(Resource::new(row.get::<_, String>(0)?, row.get(1)?))
    })?;
    for resource in rows {
        let resource = resource?;
        resources.insert(resource.id.clone(), resource);
    }

    let mut stmt = conn.prepare(&format!(
        "SELECT resource_id, name, type FROM {} ORDER BY resource_id, position",
        Sqlite.quote_ident(FIELDS_TABLE)
    ))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let resource_id: String = row.get(0)?;
        let name: String = row.get(1)?;
        let type_name: String = row.get(2)?;
        let ty = FieldType::parse(&type_name).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                Type::Text,
                format!("unknown field type '{type_name}'").into(),
            )
        })?;
        if let Some(resource) = resources.get_mut(&resource_id) {
            resource.fields.push(FieldInfo::new(name, ty));
        }
    }

    Ok(resources)
}

/// Record a new resource in the registry.
pub(crate) fn register_resource(conn: &Connection, resource: &Resource) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO {} (id, read_only) VALUES (?1, ?2)",
            Sqlite.quote_ident(RESOURCES_TABLE)
        ),
        rusqlite::params![resource.id, resource.read_only],
    )?;
    Ok(())
}

/// Record a field of a resource at the given column position.
pub(crate) fn register_field(
    conn: &Connection,
    resource_id: &str,
    position: usize,
    field: &FieldInfo,
) -> Result<()> {
    let position = i64::try_from(position).unwrap_or(i64::MAX);
    conn.execute(
        &format!(
            "INSERT INTO {} (resource_id, position, name, type) VALUES (?1, ?2, ?3, ?4)",
            Sqlite.quote_ident(FIELDS_TABLE)
        ),
        rusqlite::params![resource_id, position, field.id, field.ty.as_str()],
    )?;
    Ok(())
}

/// Remove a resource and its fields from the registry.
pub(crate) fn unregister_resource(conn: &Connection, resource_id: &str) -> Result<()> {
    conn.execute(
        &format!(
            "DELETE FROM {} WHERE resource_id = ?1",
            Sqlite.quote_ident(FIELDS_TABLE)
        ),
        [resource_id],
    )?;
    conn.execute(
        &format!(
            "DELETE FROM {} WHERE id = ?1",
            Sqlite.quote_ident(RESOURCES_TABLE)
        ),
        [resource_id],
    )?;
    Ok(())
}
