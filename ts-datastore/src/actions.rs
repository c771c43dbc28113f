//! The datastore actions: create, search and delete.
//!
//! Search and delete accept a [`FilterDict`]. The dictionary is compiled
//! against the resource's columns before any statement is prepared, so an
//! unknown key such as `insecure_filter` fails with
//! [`DatastoreError::Validation`] and leaves the table untouched.

use miniserde::json::{Array, Number, Object, Value as JsonValue};
use rusqlite::params_from_iter;
use tracing::{debug, info, warn};
use ts_sql::{
    Clause, FieldType, FilterDict, QueryResult, SortDir, SortField, Sqlite, ValidationError,
    Value, compile_filters, delete_sqlite, drop_table, insert_sqlite, sqlite,
};

use crate::constants::ROW_ID;
use crate::error::{DatastoreError, Result};
use crate::records::{Record, SqlParam, value_from_sql};
use crate::store::{
    Datastore, FieldInfo, Resource, check_field_name, check_resource_id, register_field,
    register_resource, unregister_resource,
};

// ═══════════════════════════════════════════════════════════════════════════
// PARAMETERS AND RESULTS
// ═══════════════════════════════════════════════════════════════════════════

/// Parameters of `datastore_ts_create`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateParams {
    pub resource_id: String,
    pub records: Vec<Record>,
    /// Explicitly typed fields; other record columns have their type inferred.
    pub fields: Vec<FieldInfo>,
    pub force: bool,
    /// Only applied when the resource is created by this call.
    pub read_only: bool,
}

impl CreateParams {
    /// Create parameters for a resource.
    pub fn new(resource_id: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            ..Self::default()
        }
    }

    /// Records to insert.
    #[must_use]
    pub fn records(mut self, records: Vec<Record>) -> Self {
        self.records = records;
        self
    }

    /// Declare a field with an explicit type.
    #[must_use]
    pub fn field(mut self, id: impl Into<String>, ty: FieldType) -> Self {
        self.fields.push(FieldInfo::new(id, ty));
        self
    }

    /// Bypass the read-only guard.
    #[must_use]
    pub const fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Mark a newly created resource read-only.
    #[must_use]
    pub const fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}

/// Result of `datastore_ts_create`.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateResult {
    pub resource_id: String,
    /// All fields of the resource after the call.
    pub fields: Vec<FieldInfo>,
    pub records_inserted: usize,
}

/// Parameters of `datastore_ts_search`.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub resource_id: String,
    pub filters: Option<FilterDict>,
    /// Columns to return; all columns when `None`.
    pub fields: Option<Vec<String>>,
    /// Sort string such as `"age desc, _id"`; `_id` ascending when `None`.
    pub sort: Option<String>,
    pub limit: Option<u32>,
    pub offset: u32,
    pub include_total: bool,
}

impl SearchParams {
    /// Search every row of a resource.
    pub fn new(resource_id: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            filters: None,
            fields: None,
            sort: None,
            limit: None,
            offset: 0,
            include_total: true,
        }
    }

    /// Restrict the search with custom filters.
    #[must_use]
    pub fn filters(mut self, filters: FilterDict) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Return only these columns.
    #[must_use]
    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = Some(fields.iter().map(|f| (*f).to_string()).collect());
        self
    }

    /// Order the rows.
    #[must_use]
    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Page through the rows.
    #[must_use]
    pub const fn page(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = offset;
        self
    }

    /// Skip the COUNT query.
    #[must_use]
    pub const fn include_total(mut self, include_total: bool) -> Self {
        self.include_total = include_total;
        self
    }
}

/// Result of `datastore_ts_search`.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub resource_id: String,
    /// Number of matching rows, ignoring limit and offset.
    pub total: Option<u64>,
    pub records: Vec<Record>,
    /// The caller's filters, unchanged.
    pub filters: FilterDict,
    /// Returned columns, `_id` included.
    pub fields: Vec<FieldInfo>,
    pub limit: u32,
    pub offset: u32,
}

/// Parameters of `datastore_ts_delete`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteParams {
    pub resource_id: String,
    /// `None` removes the whole resource; a dictionary (even empty) deletes
    /// matching rows only.
    pub filters: Option<FilterDict>,
    pub force: bool,
}

impl DeleteParams {
    /// Remove a whole resource.
    pub fn new(resource_id: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            ..Self::default()
        }
    }

    /// Delete only the rows matching these filters.
    #[must_use]
    pub fn filters(mut self, filters: FilterDict) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Bypass the read-only guard.
    #[must_use]
    pub const fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

/// Result of `datastore_ts_delete`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteResult {
    pub resource_id: String,
    /// Rows removed.
    pub deleted: usize,
    /// The caller's filters, unchanged; `None` when the resource was dropped.
    pub filters: Option<FilterDict>,
}

// ═══════════════════════════════════════════════════════════════════════════
// ACTIONS
// ═══════════════════════════════════════════════════════════════════════════

impl Datastore {
    /// Insert records, creating the resource or adding columns as needed.
    ///
    /// All records are checked before anything is written, and the whole
    /// call runs in one transaction.
    pub fn create(&mut self, params: &CreateParams) -> Result<CreateResult> {
        check_resource_id(&params.resource_id)?;
        let existing = self.resources.get(&params.resource_id);
        match existing {
            Some(resource) => guard_read_only(resource, params.force)?,
            // Table names are case-insensitive too
            None if self
                .resources
                .keys()
                .any(|id| id.eq_ignore_ascii_case(&params.resource_id)) =>
            {
                return Err(ValidationError::MalformedValue {
                    key: params.resource_id.clone(),
                    reason: "duplicates an existing resource id",
                }
                .into());
            },
            None => {},
        }
        let existing_fields = existing.map_or(&[][..], |r| r.fields.as_slice());
        let new_fields = plan_fields(existing_fields, &params.fields, &params.records)?;

        let mut resource = existing
            .cloned()
            .unwrap_or_else(|| Resource::new(&params.resource_id, params.read_only));
        let is_new = existing.is_none();
        let first_position = resource.fields.len();
        resource.fields.extend(new_fields.iter().cloned());
        check_records(&resource, &params.records)?;

        let tx = self.conn.transaction()?;
        if is_new {
            let mut table = ts_sql::CreateTableBuilder::new(Sqlite, &resource.id);
            for field in &resource.fields {
                table = table.column(&field.id, field.ty);
            }
            let sql = table.build();
            debug!(sql = %sql, "Creating resource table");
            tx.execute(&sql, [])?;
            register_resource(&tx, &resource)?;
        } else {
            for field in &new_fields {
                let sql = ts_sql::add_column(Sqlite, &resource.id, &field.id, field.ty);
                debug!(sql = %sql, "Adding field");
                tx.execute(&sql, [])?;
            }
        }
        for (offset, field) in new_fields.iter().enumerate() {
            register_field(&tx, &resource.id, first_position + offset, field)?;
        }
        for record in &params.records {
            let columns: Vec<&str> = record.columns().collect();
            let values: Vec<Value> = record.iter().map(|(_, v)| v.clone()).collect();
            let query = insert_sqlite(&resource.id).columns(&columns).values(values).build();
            execute(&tx, &query)?;
        }
        tx.commit()?;

        if is_new {
            info!(
                resource_id = %resource.id,
                fields = resource.fields.len(),
                read_only = resource.read_only,
                "Created resource"
            );
        }
        info!(
            resource_id = %resource.id,
            records = params.records.len(),
            new_fields = new_fields.len(),
            "Inserted records"
        );

        let result = CreateResult {
            resource_id: resource.id.clone(),
            fields: resource.fields.clone(),
            records_inserted: params.records.len(),
        };
        self.resources.insert(resource.id.clone(), resource);
        Ok(result)
    }

    /// Search a resource.
    ///
    /// The filters are echoed back unchanged in the result.
    pub fn search(&self, params: &SearchParams) -> Result<SearchResult> {
        let resource = self.require(&params.resource_id)?;
        let filters = params.filters.clone().unwrap_or_default();
        let clause = self.compile(resource, &filters)?;

        let allowed = resource.columns();
        let columns: Vec<&str> = match &params.fields {
            Some(fields) => fields
                .iter()
                .map(|f| {
                    allowed
                        .iter()
                        .find(|c| **c == f.as_str())
                        .copied()
                        .ok_or_else(|| ValidationError::FieldNotAllowed {
                            field: f.clone(),
                            allowed: allowed.iter().map(|c| (*c).to_string()).collect(),
                        })
                })
                .collect::<std::result::Result<_, _>>()?,
            None => allowed.clone(),
        };
        let sorts = match &params.sort {
            Some(sort) => SortField::parse_sort_string(sort, &allowed)?,
            None => vec![SortField::new(ROW_ID, SortDir::Asc)],
        };
        let limit = params
            .limit
            .unwrap_or(self.config.default_limit)
            .min(self.config.max_limit);

        let total = if params.include_total {
            let query = sqlite(&resource.id).count().clause(&clause).build();
            debug!(sql = %query.sql, params = query.params.len(), "Counting rows");
            let count: i64 = self.conn.query_row(
                &query.sql,
                params_from_iter(query.params.iter().map(SqlParam)),
                |row| row.get(0),
            )?;
            Some(u64::try_from(count).unwrap_or_default())
        } else {
            None
        };

        let query = sqlite(&resource.id)
            .fields(&columns)
            .clause(&clause)
            .sorts(&sorts)
            .limit_offset(limit, params.offset)
            .build();
        debug!(sql = %query.sql, params = query.params.len(), "Searching rows");

        let fields: Vec<FieldInfo> = columns
            .iter()
            .map(|c| FieldInfo::new(*c, resource.column_type(c).unwrap_or(FieldType::Text)))
            .collect();
        let mut stmt = self.conn.prepare(&query.sql)?;
        let mut rows = stmt.query(params_from_iter(query.params.iter().map(SqlParam)))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Record::new();
            for (idx, field) in fields.iter().enumerate() {
                record.insert(field.id.clone(), value_from_sql(row.get_ref(idx)?, field.ty));
            }
            records.push(record);
        }

        Ok(SearchResult {
            resource_id: resource.id.clone(),
            total,
            records,
            filters,
            fields,
            limit,
            offset: params.offset,
        })
    }

    /// Delete matching rows, or the whole resource when no filters are given.
    pub fn delete(&mut self, params: &DeleteParams) -> Result<DeleteResult> {
        let resource = self.require(&params.resource_id)?;
        guard_read_only(resource, params.force)?;
        let resource_id = resource.id.clone();

        let Some(filters) = &params.filters else {
            let tx = self.conn.transaction()?;
            let count = sqlite(&resource_id).count().build();
            let rows: i64 = tx.query_row(&count.sql, [], |row| row.get(0))?;
            tx.execute(&drop_table(Sqlite, &resource_id), [])?;
            unregister_resource(&tx, &resource_id)?;
            tx.commit()?;
            self.resources.remove(&resource_id);
            info!(resource_id = %resource_id, rows, "Dropped resource");
            return Ok(DeleteResult {
                resource_id,
                deleted: usize::try_from(rows).unwrap_or_default(),
                filters: None,
            });
        };

        let clause = self.compile(resource, filters)?;
        let query = delete_sqlite(&resource_id).clause(&clause).build();
        debug!(sql = %query.sql, params = query.params.len(), "Deleting rows");
        let tx = self.conn.transaction()?;
        let deleted = execute(&tx, &query)?;
        tx.commit()?;
        info!(resource_id = %resource_id, deleted, "Deleted rows");

        Ok(DeleteResult {
            resource_id,
            deleted,
            filters: Some(filters.clone()),
        })
    }

    fn compile(&self, resource: &Resource, filters: &FilterDict) -> Result<Clause> {
        let validator = resource.validator(self.config.max_filter_values);
        compile_filters(filters, &validator).map_err(|err| {
            warn!(resource_id = %resource.id, error = %err, "Rejected filters");
            DatastoreError::from(err)
        })
    }
}

fn execute(conn: &rusqlite::Connection, query: &QueryResult) -> Result<usize> {
    let mut stmt = conn.prepare_cached(&query.sql)?;
    Ok(stmt.execute(params_from_iter(query.params.iter().map(SqlParam)))?)
}

fn guard_read_only(resource: &Resource, force: bool) -> Result<()> {
    if resource.read_only && !force {
        return Err(DatastoreError::ReadOnly(resource.id.clone()));
    }
    Ok(())
}

/// A field seen for the first time in this call.
struct PlannedField {
    id: String,
    ty: Option<FieldType>,
    declared: bool,
}

/// Work out the fields a create call adds to the resource.
///
/// Declared fields keep their type. Other columns take the type of their
/// first non-null value, widened from int to float when a later value is a
/// float; columns with only nulls become text.
fn plan_fields(
    existing: &[FieldInfo],
    declared: &[FieldInfo],
    records: &[Record],
) -> std::result::Result<Vec<FieldInfo>, ValidationError> {
    let mut planned: Vec<PlannedField> = Vec::new();

    for field in declared {
        check_field_name(&field.id)?;
        check_name_case(&field.id, existing, &planned)?;
        let current = existing
            .iter()
            .find(|f| f.id == field.id)
            .map(|f| f.ty)
            .or_else(|| planned.iter().find(|p| p.id == field.id).and_then(|p| p.ty));
        match current {
            Some(ty) if ty != field.ty => {
                return Err(ValidationError::MalformedValue {
                    key: field.id.clone(),
                    reason: "conflicts with the existing field type",
                });
            },
            Some(_) => {},
            None => planned.push(PlannedField {
                id: field.id.clone(),
                ty: Some(field.ty),
                declared: true,
            }),
        }
    }

    for record in records {
        for (column, value) in record.iter() {
            check_field_name(column)?;
            if !value.is_scalar() {
                return Err(ValidationError::MalformedValue {
                    key: column.to_string(),
                    reason: "record values must be scalars",
                });
            }
            check_name_case(column, existing, &planned)?;
            if existing.iter().any(|f| f.id == column) {
                continue;
            }
            let inferred = FieldType::infer(value);
            match planned.iter_mut().find(|p| p.id == column) {
                Some(field) if field.declared => {},
                Some(field) => {
                    field.ty = match (field.ty, inferred) {
                        (None, ty) => ty,
                        (Some(FieldType::Int), Some(FieldType::Float)) => Some(FieldType::Float),
                        (ty, _) => ty,
                    };
                },
                None => planned.push(PlannedField {
                    id: column.to_string(),
                    ty: inferred,
                    declared: false,
                }),
            }
        }
    }

    Ok(planned
        .into_iter()
        .map(|p| FieldInfo::new(p.id, p.ty.unwrap_or(FieldType::Text)))
        .collect())
}

/// Reject a name that differs only in case from a known field.
///
/// `SQLite` column names are case-insensitive, so `Age` and `age` would be
/// the same column.
fn check_name_case(
    name: &str,
    existing: &[FieldInfo],
    planned: &[PlannedField],
) -> std::result::Result<(), ValidationError> {
    let known = existing
        .iter()
        .map(|f| f.id.as_str())
        .chain(planned.iter().map(|p| p.id.as_str()));
    for other in known {
        if other != name && other.eq_ignore_ascii_case(name) {
            return Err(ValidationError::MalformedValue {
                key: name.to_string(),
                reason: "duplicates an existing field name",
            });
        }
    }
    Ok(())
}

fn check_records(resource: &Resource, records: &[Record]) -> std::result::Result<(), ValidationError> {
    for record in records {
        for (column, value) in record.iter() {
            let accepted = resource
                .field(column)
                .is_some_and(|field| field.ty.accepts(value));
            if !accepted {
                return Err(ValidationError::MalformedValue {
                    key: column.to_string(),
                    reason: "value does not match the field type",
                });
            }
        }
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
// JSON
// ═══════════════════════════════════════════════════════════════════════════

fn fields_to_json(fields: &[FieldInfo]) -> JsonValue {
    let mut array = Array::new();
    array.extend(fields.iter().map(|field| {
        let mut object = Object::new();
        object.insert("id".to_string(), JsonValue::String(field.id.clone()));
        object.insert(
            "type".to_string(),
            JsonValue::String(field.ty.as_str().to_string()),
        );
        JsonValue::Object(object)
    }));
    JsonValue::Array(array)
}

fn count_to_json(n: usize) -> JsonValue {
    JsonValue::Number(Number::U64(u64::try_from(n).unwrap_or(u64::MAX)))
}

impl CreateResult {
    /// JSON form returned by the action dispatcher.
    pub fn to_json(&self) -> JsonValue {
        let mut object = Object::new();
        object.insert(
            "resource_id".to_string(),
            JsonValue::String(self.resource_id.clone()),
        );
        object.insert("fields".to_string(), fields_to_json(&self.fields));
        object.insert(
            "records_inserted".to_string(),
            count_to_json(self.records_inserted),
        );
        JsonValue::Object(object)
    }
}

impl SearchResult {
    /// JSON form returned by the action dispatcher. `total` is omitted when
    /// it was not requested.
    pub fn to_json(&self) -> JsonValue {
        let mut object = Object::new();
        object.insert(
            "resource_id".to_string(),
            JsonValue::String(self.resource_id.clone()),
        );
        if let Some(total) = self.total {
            object.insert("total".to_string(), JsonValue::Number(Number::U64(total)));
        }
        let mut records = Array::new();
        records.extend(self.records.iter().map(Record::to_json));
        object.insert("records".to_string(), JsonValue::Array(records));
        object.insert("filters".to_string(), self.filters.to_json());
        object.insert("fields".to_string(), fields_to_json(&self.fields));
        object.insert(
            "limit".to_string(),
            JsonValue::Number(Number::U64(u64::from(self.limit))),
        );
        object.insert(
            "offset".to_string(),
            JsonValue::Number(Number::U64(u64::from(self.offset))),
        );
        JsonValue::Object(object)
    }
}

impl DeleteResult {
    /// JSON form returned by the action dispatcher. `filters` is omitted
    /// when the whole resource was removed.
    pub fn to_json(&self) -> JsonValue {
        let mut object = Object::new();
        object.insert(
            "resource_id".to_string(),
            JsonValue::String(self.resource_id.clone()),
        );
        object.insert("deleted".to_string(), count_to_json(self.deleted));
        if let Some(filters) = &self.filters {
            object.insert("filters".to_string(), filters.to_json());
        }
        JsonValue::Object(object)
    }
}
