//! Driver seam between the cursor and a database client.
//!
//! A backend hands out one statement handle per query; executing it yields a
//! result handle that owns the statement, so both are released together by
//! [`ResultSet::close`]. Column ordinals are 1-based.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use time::Date;

use crate::error::DriverError;

/// A live database connection able to allocate statements.
pub trait Connection {
    fn create_statement(&mut self) -> Result<Box<dyn Statement<'_> + '_>, DriverError>;
}

impl<C: Connection + ?Sized> Connection for &mut C {
    fn create_statement(&mut self) -> Result<Box<dyn Statement<'_> + '_>, DriverError> {
        (**self).create_statement()
    }
}

/// A statement handle borrowed from a connection for `'c`.
pub trait Statement<'c> {
    /// Runs `sql` and returns the result handle, which takes over the statement.
    fn execute_query(self: Box<Self>, sql: &str) -> Result<Box<dyn ResultSet + 'c>, DriverError>;
}

/// Forward-only result handle with positional typed getters.
pub trait ResultSet {
    /// Moves to the next row; `false` once the result is exhausted.
    fn next(&mut self) -> Result<bool, DriverError>;
    fn get_string(&mut self, ordinal: usize) -> Result<String, DriverError>;
    fn get_int(&mut self, ordinal: usize) -> Result<i32, DriverError>;
    fn get_long(&mut self, ordinal: usize) -> Result<i64, DriverError>;
    fn get_bool(&mut self, ordinal: usize) -> Result<bool, DriverError>;
    fn get_date(&mut self, ordinal: usize) -> Result<Date, DriverError>;
    /// Releases the result handle, then the statement handle.
    fn close(&mut self) -> Result<(), DriverError>;
}

/// Converts a 1-based ordinal into an index into a row of `width` columns.
pub(crate) fn column_index(ordinal: usize, width: usize) -> Result<usize, DriverError> {
    if ordinal == 0 || ordinal > width {
        return Err(DriverError::type_mismatch(format!(
            "column {ordinal} out of range (row has {width} columns)"
        )));
    }
    Ok(ordinal - 1)
}
