//! SQLite backend on top of `rusqlite`.

use std::path::Path;

use ouroboros::self_referencing;
use rusqlite::types::Value as SqlValue;
use rusqlite::{ErrorCode, Rows};
use time::Date;

use super::{column_index, Connection, ResultSet, Statement};
use crate::error::DriverError;
use crate::value::Value;

#[derive(Debug)]
pub struct SqliteConnection {
    inner: rusqlite::Connection,
}

impl SqliteConnection {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DriverError> {
        let inner = rusqlite::Connection::open(path.as_ref()).map_err(connection_error)?;
        Ok(Self { inner })
    }

    pub fn open_in_memory() -> Result<Self, DriverError> {
        let inner = rusqlite::Connection::open_in_memory().map_err(connection_error)?;
        Ok(Self { inner })
    }

    /// Runs setup statements that produce no rows.
    pub fn execute_batch(&self, sql: &str) -> Result<(), DriverError> {
        self.inner.execute_batch(sql).map_err(classify)
    }

    #[must_use]
    pub fn inner(&self) -> &rusqlite::Connection {
        &self.inner
    }
}

impl Connection for SqliteConnection {
    fn create_statement(&mut self) -> Result<Box<dyn Statement<'_> + '_>, DriverError> {
        Ok(Box::new(SqliteStatement { conn: &self.inner }))
    }
}

struct SqliteStatement<'c> {
    conn: &'c rusqlite::Connection,
}

impl<'c> Statement<'c> for SqliteStatement<'c> {
    fn execute_query(self: Box<Self>, sql: &str) -> Result<Box<dyn ResultSet + 'c>, DriverError> {
        let stmt = self.conn.prepare(sql).map_err(classify)?;
        let rows = OwnedRowsTryBuilder {
            stmt,
            rows_builder: |stmt| stmt.query([]),
        }
        .try_build()
        .map_err(classify)?;
        Ok(Box::new(SqliteResultSet {
            rows: Some(rows),
            current: None,
        }))
    }
}

#[self_referencing]
struct OwnedRows<'c> {
    stmt: rusqlite::Statement<'c>,
    #[borrows(mut stmt)]
    #[covariant]
    rows: Rows<'this>,
}

struct SqliteResultSet<'c> {
    rows: Option<OwnedRows<'c>>,
    current: Option<Vec<Value>>,
}

impl SqliteResultSet<'_> {
    fn value(&self, ordinal: usize) -> Result<&Value, DriverError> {
        let row = self
            .current
            .as_ref()
            .ok_or_else(|| DriverError::query("no current row"))?;
        let index = column_index(ordinal, row.len())?;
        Ok(&row[index])
    }
}

impl ResultSet for SqliteResultSet<'_> {
    fn next(&mut self) -> Result<bool, DriverError> {
        let Some(rows) = self.rows.as_mut() else {
            return Err(DriverError::connection("result set is closed"));
        };
        let row = rows
            .with_rows_mut(|rows| -> rusqlite::Result<Option<Vec<Value>>> {
                let Some(row) = rows.next()? else {
                    return Ok(None);
                };
                let width = row.as_ref().column_count();
                let mut values = Vec::with_capacity(width);
                for index in 0..width {
                    let value: SqlValue = row.get(index)?;
                    values.push(convert(value));
                }
                Ok(Some(values))
            })
            .map_err(classify)?;
        let advanced = row.is_some();
        self.current = row;
        Ok(advanced)
    }

    fn get_string(&mut self, ordinal: usize) -> Result<String, DriverError> {
        self.value(ordinal)?.to_text()
    }

    fn get_int(&mut self, ordinal: usize) -> Result<i32, DriverError> {
        self.value(ordinal)?.to_int()
    }

    fn get_long(&mut self, ordinal: usize) -> Result<i64, DriverError> {
        self.value(ordinal)?.to_long()
    }

    fn get_bool(&mut self, ordinal: usize) -> Result<bool, DriverError> {
        self.value(ordinal)?.to_bool()
    }

    fn get_date(&mut self, ordinal: usize) -> Result<Date, DriverError> {
        self.value(ordinal)?.to_date()
    }

    fn close(&mut self) -> Result<(), DriverError> {
        self.current = None;
        // Dropping the rows resets the statement; dropping the statement finalizes it.
        self.rows = None;
        Ok(())
    }
}

fn convert(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(value) => Value::Int(value),
        SqlValue::Real(value) => Value::Real(value),
        SqlValue::Text(text) => Value::Text(text.into()),
        SqlValue::Blob(bytes) => Value::Blob(bytes),
    }
}

fn connection_error(err: rusqlite::Error) -> DriverError {
    DriverError::connection(err.to_string())
}

fn classify(err: rusqlite::Error) -> DriverError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if matches!(
                failure.code,
                ErrorCode::CannotOpen
                    | ErrorCode::NotADatabase
                    | ErrorCode::DatabaseBusy
                    | ErrorCode::DatabaseLocked
                    | ErrorCode::SystemIoFailure
            ) =>
        {
            DriverError::connection(err.to_string())
        }
        rusqlite::Error::FromSqlConversionFailure(..)
        | rusqlite::Error::IntegralValueOutOfRange(..)
        | rusqlite::Error::InvalidColumnType(..) => DriverError::type_mismatch(err.to_string()),
        _ => DriverError::query(err.to_string()),
    }
}
