//! Query builder for SQL generation with parameterization.

use crate::dialect::{Dialect, Postgres, Sqlite};
use crate::validate::{ValidationError, assert_valid_sql_identifier, assert_valid_table_name};

/// SQL comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Equal: `=`, or `IS NULL` for a null value
    Eq,
    /// Greater than: `>`
    Gt,
    /// Less than: `<`
    Lt,
    /// In array: `IN` or `= ANY`
    In,
    /// Between two values, both inclusive: `BETWEEN $1 AND $2`
    Between,
}

/// A filter expression that can be simple or compound.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// A simple field comparison.
    Simple(Filter),
    /// A parenthesized OR group.
    Compound(CompoundFilter),
}

/// Expressions joined with `OR`.
///
/// A group always renders inside parentheses, so it binds as one unit when
/// AND-joined with its siblings.
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundFilter {
    pub filters: Vec<FilterExpr>,
}

impl CompoundFilter {
    /// Create an OR compound filter.
    #[must_use]
    pub const fn or(filters: Vec<FilterExpr>) -> Self {
        Self { filters }
    }
}

/// SQL parameter values.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
}

impl Value {
    /// Whether this value is a single bindable parameter (anything but an array).
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        !matches!(self, Self::Array(_))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl<T: Into<Self>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::Array(v.into_iter().map(Into::into).collect())
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

/// Sort field with direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub field: String,
    pub dir: SortDir,
}

impl SortField {
    /// Create a new sort field.
    pub fn new(field: impl Into<String>, dir: SortDir) -> Self {
        Self {
            field: field.into(),
            dir,
        }
    }

    /// Parse a sort string like `"age desc, _id"` into sort fields.
    ///
    /// Each comma-separated part is a field name optionally followed by
    /// `asc` or `desc` (case-insensitive). Every field must appear in
    /// `allowed`; unlike filters there is no implicit allow-all.
    pub fn parse_sort_string(sort: &str, allowed: &[&str]) -> Result<Vec<Self>, ValidationError> {
        let mut result = Vec::new();

        for part in sort.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let mut words = part.split_whitespace();
            let field = words.next().unwrap_or_default();
            let dir = match words.next() {
                None => SortDir::Asc,
                Some(d) if d.eq_ignore_ascii_case("asc") => SortDir::Asc,
                Some(d) if d.eq_ignore_ascii_case("desc") => SortDir::Desc,
                Some(_) => {
                    return Err(ValidationError::MalformedValue {
                        key: "sort".to_string(),
                        reason: "direction must be 'asc' or 'desc'",
                    });
                },
            };
            if words.next().is_some() {
                return Err(ValidationError::MalformedValue {
                    key: "sort".to_string(),
                    reason: "expected '<field> [asc|desc]'",
                });
            }

            if !allowed.contains(&field) {
                return Err(ValidationError::FieldNotAllowed {
                    field: field.to_string(),
                    allowed: allowed.iter().map(|s| (*s).to_string()).collect(),
                });
            }

            result.push(Self::new(field, dir));
        }

        Ok(result)
    }
}

/// Filter condition.
///
/// `In` takes a non-empty array and `Between` an array of exactly two
/// bounds; the custom-filter parser rejects anything else before a filter is
/// built.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: Operator,
    pub value: Value,
}

impl Filter {
    /// Create a new filter condition.
    pub fn new(field: impl Into<String>, op: Operator, value: Value) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }
}

/// Query result with SQL string and parameters.
#[derive(Debug)]
#[must_use = "QueryResult must be used to execute the query"]
pub struct QueryResult {
    pub sql: String,
    pub params: Vec<Value>,
}

// ═══════════════════════════════════════════════════════════════════════════
// SHARED FILTER BUILDING FUNCTIONS
// ═══════════════════════════════════════════════════════════════════════════

/// Build a filter expression (simple or compound).
pub(crate) fn build_filter_expr_impl<D: Dialect>(
    dialect: &D,
    expr: &FilterExpr,
    start_idx: usize,
) -> (String, Vec<Value>, usize) {
    match expr {
        FilterExpr::Simple(filter) => build_condition_impl(dialect, filter, start_idx),
        FilterExpr::Compound(compound) => build_compound_filter_impl(dialect, compound, start_idx),
    }
}

/// Build an OR group.
fn build_compound_filter_impl<D: Dialect>(
    dialect: &D,
    compound: &CompoundFilter,
    start_idx: usize,
) -> (String, Vec<Value>, usize) {
    let mut idx = start_idx;
    let mut all_params = Vec::new();
    let mut conditions = Vec::new();

    for filter_expr in &compound.filters {
        let (condition, params, new_idx) = build_filter_expr_impl(dialect, filter_expr, idx);
        conditions.push(condition);
        all_params.extend(params);
        idx = new_idx;
    }

    (format!("({})", conditions.join(" OR ")), all_params, idx)
}

/// Build a single filter condition.
fn build_condition_impl<D: Dialect>(
    dialect: &D,
    filter: &Filter,
    start_idx: usize,
) -> (String, Vec<Value>, usize) {
    let field = dialect.quote_ident(&filter.field);
    let idx = start_idx;

    match (&filter.op, &filter.value) {
        (Operator::Eq, Value::Null) => (format!("{field} IS NULL"), vec![], idx),

        (Operator::In, Value::Array(values)) => {
            debug_assert!(!values.is_empty(), "IN requires at least one value");
            let (sql, params) = dialect.in_clause(&field, values, idx);
            let new_idx = idx + params.len();
            (sql, params, new_idx)
        },

        (Operator::Between, Value::Array(values)) => {
            debug_assert_eq!(values.len(), 2, "BETWEEN requires two bounds");
            let sql = format!(
                "{} BETWEEN {} AND {}",
                field,
                dialect.param(idx),
                dialect.param(idx + 1)
            );
            (sql, values.clone(), idx + 2)
        },

        // Standard comparisons
        (op, value) => {
            let op_str = match op {
                Operator::Gt => ">",
                Operator::Lt => "<",
                Operator::Eq | Operator::In | Operator::Between => "=",
            };
            let sql = format!("{} {} {}", field, op_str, dialect.param(idx));
            (sql, vec![value.clone()], idx + 1)
        },
    }
}

/// Render a list of conditions as one AND-joined WHERE body.
///
/// Each condition renders its own grouping, so an OR group inside the list
/// stays parenthesized against its neighbours.
pub(crate) fn build_conditions<D: Dialect>(
    dialect: &D,
    conditions: &[FilterExpr],
    start_idx: usize,
) -> (String, Vec<Value>, usize) {
    let mut idx = start_idx;
    let mut params = Vec::new();
    let mut parts = Vec::with_capacity(conditions.len());

    for expr in conditions {
        let (condition, new_params, new_idx) = build_filter_expr_impl(dialect, expr, idx);
        parts.push(condition);
        params.extend(new_params);
        idx = new_idx;
    }

    (parts.join(" AND "), params, idx)
}

/// SQL query builder with dialect support.
#[derive(Debug)]
pub struct QueryBuilder<D: Dialect> {
    dialect: D,
    table: String,
    fields: Vec<String>,
    count: bool,
    conditions: Vec<FilterExpr>,
    sorts: Vec<SortField>,
    limit: Option<u32>,
    offset: Option<u32>,
}

impl<D: Dialect> QueryBuilder<D> {
    /// Create a new query builder for the given table.
    ///
    /// # Panics
    ///
    /// Panics if the table name is not a valid table name.
    pub fn new(dialect: D, table: impl Into<String>) -> Self {
        let table = table.into();
        assert_valid_table_name(&table);
        Self {
            dialect,
            table,
            fields: Vec::new(),
            count: false,
            conditions: Vec::new(),
            sorts: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Set the fields to SELECT.
    ///
    /// # Panics
    ///
    /// Panics if any field name is not a valid SQL identifier.
    pub fn fields(mut self, fields: &[&str]) -> Self {
        for field in fields {
            assert_valid_sql_identifier(field, "field");
        }
        self.fields = fields.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Select `COUNT(*) AS count` instead of rows.
    pub fn count(mut self) -> Self {
        self.count = true;
        self
    }

    /// Restrict the query with a composed custom-filter clause.
    pub fn clause(mut self, clause: &crate::Clause) -> Self {
        self.conditions.extend(clause.groups().iter().cloned());
        self
    }

    /// Add sort fields.
    ///
    /// # Panics
    ///
    /// Panics if any field name is not a valid SQL identifier.
    pub fn sorts(mut self, sorts: &[SortField]) -> Self {
        for sort in sorts {
            assert_valid_sql_identifier(&sort.field, "sort field");
        }
        self.sorts.extend(sorts.iter().cloned());
        self
    }

    /// Set explicit limit and offset.
    pub fn limit_offset(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    /// Build the SQL query and parameters.
    pub fn build(self) -> QueryResult {
        let mut sql = String::new();
        let mut params = Vec::new();

        let select_str = if self.count {
            "COUNT(*) AS count".to_string()
        } else if self.fields.is_empty() {
            "*".to_string()
        } else {
            self.fields
                .iter()
                .map(|f| self.dialect.quote_ident(f))
                .collect::<Vec<_>>()
                .join(", ")
        };

        sql.push_str(&format!(
            "SELECT {} FROM {}",
            select_str,
            self.dialect.quote_ident(&self.table)
        ));

        if !self.conditions.is_empty() {
            let (where_sql, new_params, _) = build_conditions(&self.dialect, &self.conditions, 1);
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
            params.extend(new_params);
        }

        // A count has exactly one row, ordering and paging would only break it
        if !self.count {
            if !self.sorts.is_empty() {
                sql.push_str(" ORDER BY ");
                let sort_parts: Vec<String> = self
                    .sorts
                    .iter()
                    .map(|s| {
                        let dir = match s.dir {
                            SortDir::Asc => "ASC",
                            SortDir::Desc => "DESC",
                        };
                        format!("{} {}", self.dialect.quote_ident(&s.field), dir)
                    })
                    .collect();
                sql.push_str(&sort_parts.join(", "));
            }

            if let Some(limit) = self.limit {
                sql.push_str(&format!(" LIMIT {limit}"));
            }
            if let Some(offset) = self.offset {
                sql.push_str(&format!(" OFFSET {offset}"));
            }
        }

        QueryResult { sql, params }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// INSERT BUILDER
// ═══════════════════════════════════════════════════════════════════════════

/// Builder for INSERT queries.
#[derive(Debug)]
pub struct InsertBuilder<D: Dialect> {
    dialect: D,
    table: String,
    columns: Vec<String>,
    values: Vec<Vec<Value>>,
}

impl<D: Dialect> InsertBuilder<D> {
    /// Create a new insert builder.
    ///
    /// # Panics
    ///
    /// Panics if the table name is not a valid table name.
    pub fn new(dialect: D, table: impl Into<String>) -> Self {
        let table = table.into();
        assert_valid_table_name(&table);
        Self {
            dialect,
            table,
            columns: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Set the columns for insertion.
    ///
    /// # Panics
    ///
    /// Panics if any column name is not a valid SQL identifier.
    pub fn columns(mut self, columns: &[&str]) -> Self {
        for col in columns {
            assert_valid_sql_identifier(col, "column");
        }
        self.columns = columns.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Add a row of values.
    pub fn values(mut self, values: Vec<Value>) -> Self {
        self.values.push(values);
        self
    }

    /// Build the INSERT query.
    ///
    /// Without columns this inserts a row of defaults, which still assigns
    /// the row id.
    pub fn build(self) -> QueryResult {
        let mut sql = String::new();
        let mut params = Vec::new();
        let mut param_idx = 1usize;

        let table = self.dialect.quote_ident(&self.table);
        if self.columns.is_empty() {
            sql.push_str(&format!("INSERT INTO {table} DEFAULT VALUES"));
            return QueryResult { sql, params };
        }

        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| self.dialect.quote_ident(c))
            .collect();
        sql.push_str(&format!("INSERT INTO {} ({})", table, columns.join(", ")));

        let mut value_groups = Vec::new();
        for row in &self.values {
            let placeholders: Vec<String> = row
                .iter()
                .map(|v| {
                    let p = self.dialect.param(param_idx);
                    params.push(v.clone());
                    param_idx += 1;
                    p
                })
                .collect();
            value_groups.push(format!("({})", placeholders.join(", ")));
        }
        sql.push_str(&format!(" VALUES {}", value_groups.join(", ")));

        QueryResult { sql, params }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// DELETE BUILDER
// ═══════════════════════════════════════════════════════════════════════════

/// Builder for DELETE queries.
#[derive(Debug)]
pub struct DeleteBuilder<D: Dialect> {
    dialect: D,
    table: String,
    conditions: Vec<FilterExpr>,
}

impl<D: Dialect> DeleteBuilder<D> {
    /// Create a new delete builder.
    ///
    /// # Panics
    ///
    /// Panics if the table name is not a valid table name.
    pub fn new(dialect: D, table: impl Into<String>) -> Self {
        let table = table.into();
        assert_valid_table_name(&table);
        Self {
            dialect,
            table,
            conditions: Vec::new(),
        }
    }

    /// Restrict the delete with a composed custom-filter clause.
    pub fn clause(mut self, clause: &crate::Clause) -> Self {
        self.conditions.extend(clause.groups().iter().cloned());
        self
    }

    /// Build the DELETE query.
    pub fn build(self) -> QueryResult {
        let mut sql = format!("DELETE FROM {}", self.dialect.quote_ident(&self.table));
        let mut params = Vec::new();

        if !self.conditions.is_empty() {
            let (where_sql, new_params, _) = build_conditions(&self.dialect, &self.conditions, 1);
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
            params.extend(new_params);
        }

        QueryResult { sql, params }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// CONVENIENCE CONSTRUCTORS
// ═══════════════════════════════════════════════════════════════════════════

/// Create a SELECT builder for Postgres.
pub fn postgres(table: impl Into<String>) -> QueryBuilder<Postgres> {
    QueryBuilder::new(Postgres, table)
}

/// Create a SELECT builder for `SQLite`.
pub fn sqlite(table: impl Into<String>) -> QueryBuilder<Sqlite> {
    QueryBuilder::new(Sqlite, table)
}

/// Create an INSERT builder for Postgres.
pub fn insert(table: impl Into<String>) -> InsertBuilder<Postgres> {
    InsertBuilder::new(Postgres, table)
}

/// Create a DELETE builder for Postgres.
pub fn delete(table: impl Into<String>) -> DeleteBuilder<Postgres> {
    DeleteBuilder::new(Postgres, table)
}

/// Create an INSERT builder for `SQLite`.
pub fn insert_sqlite(table: impl Into<String>) -> InsertBuilder<Sqlite> {
    InsertBuilder::new(Sqlite, table)
}

/// Create a DELETE builder for `SQLite`.
pub fn delete_sqlite(table: impl Into<String>) -> DeleteBuilder<Sqlite> {
    DeleteBuilder::new(Sqlite, table)
}
