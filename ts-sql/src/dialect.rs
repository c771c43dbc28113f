//! SQL dialect implementations for Postgres and `SQLite`.
//!
//! Each dialect handles the specific syntax differences between databases.

use crate::Value;
use crate::ddl::FieldType;

/// SQL dialect trait for database-specific syntax.
pub trait Dialect: Clone + Copy {
    /// Format a parameter placeholder (e.g., `$1` for Postgres, `?1` for `SQLite`).
    fn param(&self, idx: usize) -> String;

    /// Quote an identifier. Embedded double quotes are doubled.
    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    /// Format an IN clause with multiple values.
    /// Returns the SQL fragment (e.g., `= ANY($1)` or `IN (?1, ?2)`).
    fn in_clause(&self, field: &str, values: &[Value], start_idx: usize) -> (String, Vec<Value>);

    /// Column type used to store a datastore field type.
    fn column_type(&self, ty: FieldType) -> &'static str;

    /// Column definition of the datastore-assigned row id.
    fn row_id_column(&self) -> &'static str;
}

/// Postgres dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl Dialect for Postgres {
    #[inline]
    fn param(&self, idx: usize) -> String {
        format!("${idx}")
    }

    fn in_clause(&self, field: &str, values: &[Value], start_idx: usize) -> (String, Vec<Value>) {
        // Postgres: field = ANY($1) with array parameter
        let sql = format!("{field} = ANY(${start_idx})");
        (sql, vec![Value::Array(values.to_vec())])
    }

    fn column_type(&self, ty: FieldType) -> &'static str {
        match ty {
            FieldType::Int => "int8",
            FieldType::Float => "float8",
            FieldType::Text => "text",
            FieldType::Bool => "bool",
        }
    }

    fn row_id_column(&self) -> &'static str {
        "\"_id\" serial PRIMARY KEY"
    }
}

/// `SQLite` dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

impl Dialect for Sqlite {
    #[inline]
    fn param(&self, idx: usize) -> String {
        format!("?{idx}")
    }

    fn in_clause(&self, field: &str, values: &[Value], start_idx: usize) -> (String, Vec<Value>) {
        // SQLite: field IN (?1, ?2, ?3) with expanded parameters
        let placeholders: Vec<String> = (0..values.len())
            .map(|i| format!("?{}", start_idx + i))
            .collect();
        let sql = format!("{} IN ({})", field, placeholders.join(", "));
        (sql, values.to_vec())
    }

    fn column_type(&self, ty: FieldType) -> &'static str {
        // Booleans are stored as 0/1 integers
        match ty {
            FieldType::Int | FieldType::Bool => "INTEGER",
            FieldType::Float => "REAL",
            FieldType::Text => "TEXT",
        }
    }

    fn row_id_column(&self) -> &'static str {
        "\"_id\" INTEGER PRIMARY KEY AUTOINCREMENT"
    }
}
