//! Runs built queries and shapes the rows into a table.

use crate::error::{ExecutionError, Result};
use crate::query::{Dialect, Param, Query};
use chrono::{NaiveDate, NaiveDateTime};
use diesel::backend::Backend;
use diesel::deserialize::{self, FromSql};
use diesel::prelude::*;
use diesel::query_builder::{BoxedSqlQuery, SqlQuery};
use diesel::serialize::ToSql;
use diesel::sql_types::{BigInt, Binary, Date, Double, HasSqlType, Text};
use diesel_dynamic_schema::dynamic_value::{Any, DynamicRow, NamedField};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

#[cfg(feature = "sqlite")]
use diesel::sqlite::{Sqlite, SqliteConnection, SqliteType, SqliteValue};

#[cfg(feature = "postgres")]
use diesel::pg::{Pg, PgConnection, PgValue};

type RawRow = DynamicRow<NamedField<SqlValue>>;

/// A single cell decoded without knowing the column type up front.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Bytes(Vec<u8>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for SqlValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlValue::Null => f.write_str("NULL"),
            SqlValue::Bool(b) => write!(f, "{b}"),
            SqlValue::Integer(i) => write!(f, "{i}"),
            SqlValue::Real(r) => write!(f, "{r}"),
            SqlValue::Text(s) => f.write_str(s),
            SqlValue::Date(d) => write!(f, "{d}"),
            SqlValue::Timestamp(t) => write!(f, "{t}"),
            SqlValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

#[cfg(feature = "sqlite")]
impl FromSql<Any, Sqlite> for SqlValue {
    fn from_sql(value: SqliteValue<'_, '_, '_>) -> deserialize::Result<Self> {
        match value.value_type() {
            Some(SqliteType::Text) => {
                <String as FromSql<Text, Sqlite>>::from_sql(value).map(SqlValue::Text)
            }
            Some(SqliteType::Long | SqliteType::Integer | SqliteType::SmallInt) => {
                <i64 as FromSql<BigInt, Sqlite>>::from_sql(value).map(SqlValue::Integer)
            }
            Some(SqliteType::Double | SqliteType::Float) => {
                <f64 as FromSql<Double, Sqlite>>::from_sql(value).map(SqlValue::Real)
            }
            Some(SqliteType::Binary) => {
                <Vec<u8> as FromSql<Binary, Sqlite>>::from_sql(value).map(SqlValue::Bytes)
            }
            None => Ok(SqlValue::Null),
        }
    }

    fn from_nullable_sql(value: Option<SqliteValue<'_, '_, '_>>) -> deserialize::Result<Self> {
        match value {
            Some(value) => <SqlValue as FromSql<Any, Sqlite>>::from_sql(value),
            None => Ok(SqlValue::Null),
        }
    }
}

#[cfg(feature = "postgres")]
mod pg_oid {
    pub const BOOL: u32 = 16;
    pub const BYTEA: u32 = 17;
    pub const INT8: u32 = 20;
    pub const INT2: u32 = 21;
    pub const INT4: u32 = 23;
    pub const FLOAT4: u32 = 700;
    pub const FLOAT8: u32 = 701;
    pub const DATE: u32 = 1082;
    pub const TIMESTAMP: u32 = 1114;
}

#[cfg(feature = "postgres")]
impl FromSql<Any, Pg> for SqlValue {
    fn from_sql(value: PgValue<'_>) -> deserialize::Result<Self> {
        use diesel::sql_types::{Bool, Float, Integer, SmallInt, Timestamp};

        match value.get_oid().get() {
            pg_oid::BOOL => <bool as FromSql<Bool, Pg>>::from_sql(value).map(SqlValue::Bool),
            pg_oid::BYTEA => <Vec<u8> as FromSql<Binary, Pg>>::from_sql(value).map(SqlValue::Bytes),
            pg_oid::INT8 => <i64 as FromSql<BigInt, Pg>>::from_sql(value).map(SqlValue::Integer),
            pg_oid::INT4 => <i32 as FromSql<Integer, Pg>>::from_sql(value)
                .map(|i| SqlValue::Integer(i.into())),
            pg_oid::INT2 => <i16 as FromSql<SmallInt, Pg>>::from_sql(value)
                .map(|i| SqlValue::Integer(i.into())),
            pg_oid::FLOAT8 => <f64 as FromSql<Double, Pg>>::from_sql(value).map(SqlValue::Real),
            pg_oid::FLOAT4 => {
                <f32 as FromSql<Float, Pg>>::from_sql(value).map(|f| SqlValue::Real(f.into()))
            }
            pg_oid::DATE => <NaiveDate as FromSql<Date, Pg>>::from_sql(value).map(SqlValue::Date),
            pg_oid::TIMESTAMP => {
                <NaiveDateTime as FromSql<Timestamp, Pg>>::from_sql(value)
                    .map(SqlValue::Timestamp)
            }
            // text, varchar, name and anything else sent as UTF-8
            _ => match String::from_utf8(value.as_bytes().to_vec()) {
                Ok(s) => Ok(SqlValue::Text(s)),
                Err(e) => Ok(SqlValue::Bytes(e.into_bytes())),
            },
        }
    }

    fn from_nullable_sql(value: Option<PgValue<'_>>) -> deserialize::Result<Self> {
        match value {
            Some(value) => <SqlValue as FromSql<Any, Pg>>::from_sql(value),
            None => Ok(SqlValue::Null),
        }
    }
}

/// A connection that can run a [`Query`] rendered for its dialect.
pub trait QueryRunner {
    const DIALECT: Dialect;

    fn load_rows(&mut self, query: &Query) -> QueryResult<Vec<Vec<(String, SqlValue)>>>;
}

fn flatten(rows: Vec<RawRow>) -> Vec<Vec<(String, SqlValue)>> {
    rows.into_iter()
        .map(|row| {
            (0..)
                .map_while(|i| row.get(i))
                .map(|field| (field.name.clone(), field.value.clone()))
                .collect()
        })
        .collect()
}

/// Attaches the query's parameters in placeholder order.
fn bound_statement<DB>(query: &Query) -> BoxedSqlQuery<'static, DB, SqlQuery>
where
    DB: Backend + HasSqlType<Text> + HasSqlType<Date>,
    String: ToSql<Text, DB>,
    NaiveDate: ToSql<Date, DB>,
{
    let mut statement = diesel::sql_query(query.text()).into_boxed::<DB>();
    for param in query.params() {
        statement = match param {
            Param::Text(s) => statement.bind::<Text, _>(s.clone()),
            Param::Date(d) => statement.bind::<Date, _>(*d),
        };
    }
    statement
}

#[cfg(feature = "sqlite")]
impl QueryRunner for SqliteConnection {
    const DIALECT: Dialect = Dialect::Sqlite;

    fn load_rows(&mut self, query: &Query) -> QueryResult<Vec<Vec<(String, SqlValue)>>> {
        let rows: Vec<RawRow> = bound_statement::<Sqlite>(query).load(self)?;
        Ok(flatten(rows))
    }
}

#[cfg(feature = "postgres")]
impl QueryRunner for PgConnection {
    const DIALECT: Dialect = Dialect::Postgres;

    fn load_rows(&mut self, query: &Query) -> QueryResult<Vec<Vec<(String, SqlValue)>>> {
        let rows: Vec<RawRow> = bound_statement::<Pg>(query).load(self)?;
        Ok(flatten(rows))
    }
}

/// Query output with column names preserved. A name returned by several
/// joined tables appears once, holding the first non-null value among them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultTable {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
}

impl ResultTable {
    pub fn from_named_rows(named_rows: Vec<Vec<(String, SqlValue)>>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        let mut slots: Vec<usize> = Vec::new();

        if let Some(first) = named_rows.first() {
            let mut positions: HashMap<&str, usize> = HashMap::new();
            for (name, _) in first {
                let slot = *positions.entry(name.as_str()).or_insert_with(|| {
                    columns.push(name.clone());
                    columns.len() - 1
                });
                slots.push(slot);
            }
        }

        let rows = named_rows
            .into_iter()
            .map(|fields| {
                let mut values = vec![SqlValue::Null; columns.len()];
                for ((_, value), &slot) in fields.into_iter().zip(&slots) {
                    if values[slot].is_null() {
                        values[slot] = value;
                    }
                }
                values
            })
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<SqlValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<Vec<&SqlValue>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }

    pub fn get(&self, row: usize, name: &str) -> Option<&SqlValue> {
        let index = self.column_index(name)?;
        self.rows.get(row).map(|r| &r[index])
    }

    /// The value of a plain `COUNT(*)` query.
    pub fn scalar_count(&self) -> Option<i64> {
        self.get(0, "count").and_then(SqlValue::as_i64)
    }

    /// Rows as JSON objects keyed by column name.
    pub fn to_json(&self) -> serde_json::Value {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let object = self
                    .columns
                    .iter()
                    .cloned()
                    .zip(row.iter().map(|v| serde_json::to_value(v).unwrap_or_default()))
                    .collect::<serde_json::Map<_, _>>();
                serde_json::Value::Object(object)
            })
            .collect();
        serde_json::Value::Array(rows)
    }
}

pub fn execute<C: QueryRunner>(conn: &mut C, query: &Query) -> Result<ResultTable> {
    if query.dialect() != C::DIALECT {
        return Err(ExecutionError::DialectMismatch {
            built: query.dialect(),
            connection: C::DIALECT,
        }
        .into());
    }

    let rows = conn.load_rows(query).map_err(ExecutionError::Sql)?;
    let table = ResultTable::from_named_rows(rows);
    debug!(rows = table.len(), columns = table.columns().len(), "query executed");
    Ok(table)
}

/// Opens a connection for one query and drops it on every exit path.
#[cfg(feature = "postgres")]
pub fn execute_with(config: &crate::db::ConnectionConfig, query: &Query) -> Result<ResultTable> {
    let mut conn = crate::db::establish_postgres(config)?;
    execute(&mut conn, query)
}
