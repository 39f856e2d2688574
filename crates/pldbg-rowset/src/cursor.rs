//! Forward-only row cursor over one query result.

use time::Date;
use tracing::{debug, warn};

use crate::driver::{Connection, ResultSet};
use crate::error::{DriverError, RowSetError};
use crate::query::Query;

/// Position of a [`RowCursor`] in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Query executed, no row fetched yet.
    Open,
    /// A fetch is in flight or failed; no row is readable.
    Advancing,
    /// Positioned on a row; columns may be read.
    RowReady,
    /// The result has no more rows.
    Exhausted,
    /// Statement and result handles are released.
    Closed,
}

/// Executes `query` on `connection` and returns a cursor positioned before the
/// first row.
///
/// The cursor borrows the connection exclusively until it is dropped.
pub fn open<'c, C>(query: &Query, connection: &'c mut C) -> Result<RowCursor<'c>, RowSetError>
where
    C: Connection + ?Sized,
{
    let statement = connection.create_statement()?;
    let results = statement.execute_query(query.sql())?;
    debug!(sql = query.sql(), "row cursor opened");
    Ok(RowCursor {
        results,
        state: CursorState::Open,
        ordinal: 0,
    })
}

/// Forward-only cursor owning one statement and one result handle.
///
/// Columns are read left to right: every `read_*` call consumes the next
/// ordinal of the current row. Handles are released by [`RowCursor::close`]
/// or, failing that, when the cursor is dropped.
pub struct RowCursor<'c> {
    results: Box<dyn ResultSet + 'c>,
    state: CursorState,
    ordinal: usize,
}

impl<'c> RowCursor<'c> {
    #[must_use]
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Number of columns consumed from the current row, failed reads included.
    #[must_use]
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Moves to the next row. Returns `false` once exhausted, and keeps
    /// returning `false` after that.
    pub fn advance(&mut self) -> Result<bool, RowSetError> {
        self.ordinal = 0;
        if matches!(self.state, CursorState::Exhausted | CursorState::Closed) {
            return Ok(false);
        }
        self.state = CursorState::Advancing;
        let advanced = self.results.next()?;
        self.state = if advanced {
            CursorState::RowReady
        } else {
            CursorState::Exhausted
        };
        Ok(advanced)
    }

    pub fn read_string(&mut self) -> Result<String, RowSetError> {
        self.read_with(|results, ordinal| results.get_string(ordinal))
    }

    pub fn read_int(&mut self) -> Result<i32, RowSetError> {
        self.read_with(|results, ordinal| results.get_int(ordinal))
    }

    pub fn read_long(&mut self) -> Result<i64, RowSetError> {
        self.read_with(|results, ordinal| results.get_long(ordinal))
    }

    pub fn read_bool(&mut self) -> Result<bool, RowSetError> {
        self.read_with(|results, ordinal| results.get_bool(ordinal))
    }

    pub fn read_date(&mut self) -> Result<Date, RowSetError> {
        self.read_with(|results, ordinal| results.get_date(ordinal))
    }

    /// First character of the next column's text.
    pub fn read_char(&mut self) -> Result<char, RowSetError> {
        self.read_with(|results, ordinal| {
            results.get_string(ordinal)?.chars().next().ok_or_else(|| {
                DriverError::type_mismatch("empty string has no first character")
            })
        })
    }

    /// Releases the statement and result handles. Later calls are no-ops.
    pub fn close(&mut self) -> Result<(), RowSetError> {
        if self.state == CursorState::Closed {
            return Ok(());
        }
        self.state = CursorState::Closed;
        self.ordinal = 0;
        debug!("row cursor closed");
        self.results.close().map_err(|err| {
            warn!("row cursor release failed: {err}");
            RowSetError::ResourceRelease(err)
        })
    }

    /// Turns the cursor into an iterator of producer values.
    ///
    /// The stream closes the cursor when the result is exhausted and after
    /// the first error; a release failure after a clean exhaustion is yielded
    /// as the last item.
    pub fn rows<T, F>(self, producer: F) -> RowStream<'c, F>
    where
        F: Fn(&mut RowCursor<'_>) -> Result<T, RowSetError>,
    {
        RowStream {
            cursor: self,
            producer,
            done: false,
        }
    }

    /// Closes after a failure; a release error is only logged so the first
    /// error reaches the caller.
    pub(crate) fn abandon(&mut self) {
        let _ = self.close();
    }

    fn read_with<T>(
        &mut self,
        read: impl FnOnce(&mut (dyn ResultSet + 'c), usize) -> Result<T, DriverError>,
    ) -> Result<T, RowSetError> {
        if self.state != CursorState::RowReady {
            return Err(RowSetError::CursorExhausted);
        }
        // A failed read still consumes its column.
        self.ordinal += 1;
        let ordinal = self.ordinal;
        read(self.results.as_mut(), ordinal).map_err(|err| RowSetError::at_column(ordinal, err))
    }
}

impl std::fmt::Debug for RowCursor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowCursor")
            .field("state", &self.state)
            .field("ordinal", &self.ordinal)
            .finish_non_exhaustive()
    }
}

impl Drop for RowCursor<'_> {
    fn drop(&mut self) {
        if self.state != CursorState::Closed {
            self.abandon();
        }
    }
}

/// Lazily advanced sequence of producer values over a [`RowCursor`].
#[derive(Debug)]
pub struct RowStream<'c, F> {
    cursor: RowCursor<'c>,
    producer: F,
    done: bool,
}

impl<'c, F> RowStream<'c, F> {
    #[must_use]
    pub fn cursor(&self) -> &RowCursor<'c> {
        &self.cursor
    }

    /// Stops iteration early and releases the cursor.
    pub fn close(mut self) -> Result<(), RowSetError> {
        self.done = true;
        self.cursor.close()
    }
}

impl<T, F> Iterator for RowStream<'_, F>
where
    F: Fn(&mut RowCursor<'_>) -> Result<T, RowSetError>,
{
    type Item = Result<T, RowSetError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let failure = match self.cursor.advance() {
            Ok(true) => match (self.producer)(&mut self.cursor) {
                Ok(value) => return Some(Ok(value)),
                Err(err) => err,
            },
            Ok(false) => {
                self.done = true;
                return self.cursor.close().err().map(Err);
            }
            Err(err) => err,
        };
        self.done = true;
        self.cursor.abandon();
        Some(Err(failure))
    }
}

/// Runs `query` and builds one value per row with `producer`.
///
/// The cursor is released on every exit path: full consumption, a failed
/// fetch, or a producer error.
pub fn collect<C, T, F>(query: &Query, connection: &mut C, producer: F) -> Result<Vec<T>, RowSetError>
where
    C: Connection + ?Sized,
    F: Fn(&mut RowCursor<'_>) -> Result<T, RowSetError>,
{
    open(query, connection)?.rows(producer).collect()
}
