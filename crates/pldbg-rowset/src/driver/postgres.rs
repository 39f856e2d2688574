//! PostgreSQL backend on top of the synchronous `postgres` client.
//!
//! The prepared statement is the statement handle and the streaming
//! `RowIter` the result handle; rows are pulled from the server one at a time.

use postgres::error::SqlState;
use postgres::fallible_iterator::FallibleIterator;
use postgres::types::{FromSql, ToSql};
use postgres::{Client, NoTls, Row, RowIter};
use time::Date;

use super::{Connection, ResultSet, Statement};
use crate::error::{DriverError, DriverErrorKind};

pub struct PgConnection {
    client: Client,
}

impl PgConnection {
    /// Connects with a libpq-style parameter string, e.g. `host=localhost user=postgres`.
    pub fn connect(params: &str) -> Result<Self, DriverError> {
        let client =
            Client::connect(params, NoTls).map_err(|err| DriverError::connection(err.to_string()))?;
        Ok(Self { client })
    }

    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    pub fn client_mut(&mut self) -> &mut Client {
        &mut self.client
    }
}

impl std::fmt::Debug for PgConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgConnection")
            .field("closed", &self.client.is_closed())
            .finish()
    }
}

impl Connection for PgConnection {
    fn create_statement(&mut self) -> Result<Box<dyn Statement<'_> + '_>, DriverError> {
        if self.client.is_closed() {
            return Err(DriverError::connection("connection is closed"));
        }
        Ok(Box::new(PgStatement {
            client: &mut self.client,
        }))
    }
}

struct PgStatement<'c> {
    client: &'c mut Client,
}

impl<'c> Statement<'c> for PgStatement<'c> {
    fn execute_query(self: Box<Self>, sql: &str) -> Result<Box<dyn ResultSet + 'c>, DriverError> {
        let client = self.client;
        let statement = client.prepare(sql).map_err(classify)?;
        let rows = client
            .query_raw(&statement, std::iter::empty::<&(dyn ToSql + Sync)>())
            .map_err(classify)?;
        Ok(Box::new(PgResultSet {
            rows: Some(rows),
            statement: Some(statement),
            current: None,
        }))
    }
}

struct PgResultSet<'c> {
    rows: Option<RowIter<'c>>,
    statement: Option<postgres::Statement>,
    current: Option<Row>,
}

impl PgResultSet<'_> {
    fn get<'a, T: FromSql<'a>>(&'a self, ordinal: usize) -> Result<T, DriverError> {
        let row = self
            .current
            .as_ref()
            .ok_or_else(|| DriverError::query("no current row"))?;
        let index = super::column_index(ordinal, row.len())?;
        row.try_get::<_, T>(index)
            .map_err(|err| DriverError::type_mismatch(err.to_string()))
    }
}

impl ResultSet for PgResultSet<'_> {
    fn next(&mut self) -> Result<bool, DriverError> {
        let Some(rows) = self.rows.as_mut() else {
            return Err(DriverError::connection("result set is closed"));
        };
        self.current = rows.next().map_err(classify)?;
        Ok(self.current.is_some())
    }

    fn get_string(&mut self, ordinal: usize) -> Result<String, DriverError> {
        self.get(ordinal)
    }

    fn get_int(&mut self, ordinal: usize) -> Result<i32, DriverError> {
        self.get(ordinal)
    }

    fn get_long(&mut self, ordinal: usize) -> Result<i64, DriverError> {
        self.get(ordinal)
    }

    fn get_bool(&mut self, ordinal: usize) -> Result<bool, DriverError> {
        self.get(ordinal)
    }

    fn get_date(&mut self, ordinal: usize) -> Result<Date, DriverError> {
        self.get(ordinal)
    }

    fn close(&mut self) -> Result<(), DriverError> {
        self.current = None;
        // Portal first, then the prepared statement.
        self.rows = None;
        self.statement = None;
        Ok(())
    }
}

fn classify(err: postgres::Error) -> DriverError {
    DriverError::new(error_kind(err.is_closed(), err.code()), err.to_string())
}

/// Errors without a SQLSTATE never reached the server; class `08` and the
/// shutdown codes of class `57` mean the session is gone.
fn error_kind(closed: bool, code: Option<&SqlState>) -> DriverErrorKind {
    let Some(code) = code.filter(|_| !closed) else {
        return DriverErrorKind::Connection;
    };
    match code.code() {
        state if state.starts_with("08") => DriverErrorKind::Connection,
        "57P01" | "57P02" | "57P03" => DriverErrorKind::Connection,
        "42804" => DriverErrorKind::TypeMismatch,
        state if state.starts_with("22") => DriverErrorKind::TypeMismatch,
        _ => DriverErrorKind::Query,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(code: &str) -> DriverErrorKind {
        error_kind(false, Some(&SqlState::from_code(code)))
    }

    #[test]
    fn errors_without_sqlstate_are_connection_errors() {
        assert_eq!(error_kind(false, None), DriverErrorKind::Connection);
        assert_eq!(
            error_kind(true, Some(&SqlState::UNDEFINED_TABLE)),
            DriverErrorKind::Connection
        );
    }

    #[test]
    fn sqlstate_classes() {
        assert_eq!(kind("42P01"), DriverErrorKind::Query);
        assert_eq!(kind("42601"), DriverErrorKind::Query);
        assert_eq!(kind("08006"), DriverErrorKind::Connection);
        assert_eq!(kind("57P01"), DriverErrorKind::Connection);
        assert_eq!(kind("22P02"), DriverErrorKind::TypeMismatch);
        assert_eq!(kind("42804"), DriverErrorKind::TypeMismatch);
    }
}
