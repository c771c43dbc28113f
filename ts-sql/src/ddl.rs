//! Table definition statements for datastore resources.

use crate::Value;
use crate::dialect::Dialect;
use crate::validate::{assert_valid_sql_identifier, assert_valid_table_name};
use std::fmt;

/// Storage type of a datastore field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Int,
    Float,
    Text,
    Bool,
}

impl FieldType {
    /// Parse a type name, accepting the common Postgres aliases.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "int" | "integer" | "int4" | "int8" | "bigint" => Some(Self::Int),
            "float" | "float8" | "double" | "real" | "numeric" => Some(Self::Float),
            "text" | "string" | "varchar" => Some(Self::Text),
            "bool" | "boolean" => Some(Self::Bool),
            _ => None,
        }
    }

    /// Infer the field type from a record value. `None` for nulls and arrays.
    #[must_use]
    pub const fn infer(value: &Value) -> Option<Self> {
        match value {
            Value::Int(_) => Some(Self::Int),
            Value::Float(_) => Some(Self::Float),
            Value::String(_) => Some(Self::Text),
            Value::Bool(_) => Some(Self::Bool),
            Value::Null | Value::Array(_) => None,
        }
    }

    /// Whether a record value can be stored in a field of this type.
    #[must_use]
    pub const fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (_, Value::Null)
                | (Self::Int, Value::Int(_))
                | (Self::Float, Value::Int(_) | Value::Float(_))
                | (Self::Text, Value::String(_))
                | (Self::Bool, Value::Bool(_))
        )
    }

    /// Canonical name, as reported back to callers.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Text => "text",
            Self::Bool => "bool",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builder for `CREATE TABLE` statements of a resource table.
///
/// Every table gets the datastore row id column `_id` first.
#[derive(Debug)]
pub struct CreateTableBuilder<D: Dialect> {
    dialect: D,
    table: String,
    columns: Vec<(String, FieldType)>,
}

impl<D: Dialect> CreateTableBuilder<D> {
    /// Create a new builder for the given table.
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
        }
    }

    /// Add a column.
    ///
    /// # Panics
    ///
    /// Panics if the column name is not a valid SQL identifier.
    pub fn column(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        let name = name.into();
        assert_valid_sql_identifier(&name, "column");
        self.columns.push((name, ty));
        self
    }

    /// Build the statement.
    #[must_use]
    pub fn build(self) -> String {
        let mut defs = vec![self.dialect.row_id_column().to_string()];
        defs.extend(self.columns.iter().map(|(name, ty)| {
            format!(
                "{} {}",
                self.dialect.quote_ident(name),
                self.dialect.column_type(*ty)
            )
        }));
        format!(
            "CREATE TABLE {} ({})",
            self.dialect.quote_ident(&self.table),
            defs.join(", ")
        )
    }
}

/// `ALTER TABLE ... ADD COLUMN` for a field first seen after creation.
///
/// # Panics
///
/// Panics if the table or column name is invalid.
pub fn add_column<D: Dialect>(dialect: D, table: &str, column: &str, ty: FieldType) -> String {
    assert_valid_table_name(table);
    assert_valid_sql_identifier(column, "column");
    format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        dialect.quote_ident(table),
        dialect.quote_ident(column),
        dialect.column_type(ty)
    )
}

/// `DROP TABLE` for a resource table.
///
/// # Panics
///
/// Panics if the table name is invalid.
pub fn drop_table<D: Dialect>(dialect: D, table: &str) -> String {
    assert_valid_table_name(table);
    format!("DROP TABLE {}", dialect.quote_ident(table))
}
