use crate::core::{EntitySchema, Row};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::postgres::PgRow;
use validator::Validate;

/// A typed value bound into an INSERT or UPDATE. `None` binds a NULL of
/// the column's type.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Long(Option<i64>),
    Double(Option<f64>),
    Text(Option<String>),
    Bool(Option<bool>),
    Timestamp(Option<DateTime<Utc>>),
    Bytes(Option<Vec<u8>>),
}

/// A column written on insert or update
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnValue {
    pub column: &'static str,
    pub value: SqlValue,
}

impl ColumnValue {
    pub fn long(column: &'static str, value: Option<i64>) -> Self {
        Self {
            column,
            value: SqlValue::Long(value),
        }
    }

    pub fn double(column: &'static str, value: Option<f64>) -> Self {
        Self {
            column,
            value: SqlValue::Double(value),
        }
    }

    pub fn text(column: &'static str, value: Option<&str>) -> Self {
        Self {
            column,
            value: SqlValue::Text(value.map(str::to_string)),
        }
    }

    pub fn boolean(column: &'static str, value: Option<bool>) -> Self {
        Self {
            column,
            value: SqlValue::Bool(value),
        }
    }

    pub fn timestamp(column: &'static str, value: Option<DateTime<Utc>>) -> Self {
        Self {
            column,
            value: SqlValue::Timestamp(value),
        }
    }

    pub fn bytes(column: &'static str, value: Option<&[u8]>) -> Self {
        Self {
            column,
            value: SqlValue::Bytes(value.map(<[u8]>::to_vec)),
        }
    }
}

/// A persisted entity exposed through the generic CRUD and criteria routes
pub trait Entity:
    Row + Serialize + DeserializeOwned + Validate + Send + Sync + Unpin + 'static
{
    fn schema() -> &'static EntitySchema;

    /// Select list used when reading rows
    fn select_columns() -> String {
        format!("{}.*", Self::schema().table)
    }

    /// Joins every read needs, independent of any criteria
    fn base_joins() -> &'static str {
        ""
    }

    fn id(&self) -> Option<i64>;

    fn set_id(&mut self, id: Option<i64>);

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error>;

    /// Writable columns, excluding `id`
    fn columns(&self) -> Vec<ColumnValue>;

    /// Columns set once on insert and never overwritten by an update
    fn insert_only_columns() -> &'static [&'static str] {
        &[]
    }

    /// Columns an update writes: every writable column except the
    /// insert-only ones, which keep their stored value
    fn update_columns(&self) -> Vec<ColumnValue> {
        let insert_only = Self::insert_only_columns();
        self.columns()
            .into_iter()
            .filter(|c| !insert_only.contains(&c.column))
            .collect()
    }

    /// Hook run on create before the row is written
    fn prepare_insert(&mut self, _now: DateTime<Utc>) {}
}
