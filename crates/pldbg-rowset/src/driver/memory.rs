//! In-process driver serving `SELECT * FROM <path>` from registered tables.
//!
//! Handle bookkeeping is exposed through [`HandleStats`] so callers can check
//! that every statement and result handle was released.

use indexmap::IndexMap;
use smol_str::SmolStr;
use time::Date;

use super::{column_index, Connection, ResultSet, Statement};
use crate::error::DriverError;
use crate::value::Value;

const SELECT_ALL: &str = "select * from ";

/// Rows registered under a path.
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    columns: Vec<SmolStr>,
    rows: Vec<Vec<Value>>,
}

impl MemoryTable {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    #[must_use]
    pub fn row(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.rows.push(values.into_iter().collect());
        self
    }

    #[must_use]
    pub fn columns(&self) -> &[SmolStr] {
        &self.columns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandleStats {
    pub open_statements: usize,
    pub open_results: usize,
    pub statements_created: usize,
    pub release_calls: usize,
}

#[derive(Debug, Default)]
pub struct MemoryConnection {
    tables: IndexMap<SmolStr, MemoryTable>,
    stats: HandleStats,
    executed: Vec<String>,
    offline: bool,
    fail_release: bool,
}

impl MemoryConnection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_table(mut self, path: impl Into<SmolStr>, table: MemoryTable) -> Self {
        self.insert_table(path, table);
        self
    }

    pub fn insert_table(&mut self, path: impl Into<SmolStr>, table: MemoryTable) {
        self.tables.insert(path.into(), table);
    }

    /// Every later statement allocation fails with a connection error.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    /// Every later [`ResultSet::close`] reports a release failure.
    pub fn set_fail_release(&mut self, fail: bool) {
        self.fail_release = fail;
    }

    #[must_use]
    pub fn stats(&self) -> &HandleStats {
        &self.stats
    }

    /// SQL text of every executed query, in order.
    #[must_use]
    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    fn release_statement(&mut self) {
        self.stats.open_statements = self.stats.open_statements.saturating_sub(1);
    }
}

impl Connection for MemoryConnection {
    fn create_statement(&mut self) -> Result<Box<dyn Statement<'_> + '_>, DriverError> {
        if self.offline {
            return Err(DriverError::connection("connection is closed"));
        }
        self.stats.open_statements += 1;
        self.stats.statements_created += 1;
        Ok(Box::new(MemoryStatement { conn: Some(self) }))
    }
}

struct MemoryStatement<'c> {
    conn: Option<&'c mut MemoryConnection>,
}

impl<'c> Statement<'c> for MemoryStatement<'c> {
    fn execute_query(
        mut self: Box<Self>,
        sql: &str,
    ) -> Result<Box<dyn ResultSet + 'c>, DriverError> {
        let conn = self
            .conn
            .take()
            .ok_or_else(|| DriverError::connection("statement already executed"))?;
        conn.executed.push(sql.to_string());
        if conn.offline {
            conn.release_statement();
            return Err(DriverError::connection("connection is closed"));
        }
        let path = match select_all_path(sql) {
            Ok(path) => path,
            Err(err) => {
                conn.release_statement();
                return Err(err);
            }
        };
        if !conn.tables.contains_key(path) {
            conn.release_statement();
            return Err(DriverError::query(format!(
                "relation \"{path}\" does not exist"
            )));
        }
        conn.stats.open_results += 1;
        Ok(Box::new(MemoryResultSet {
            table: SmolStr::new(path),
            conn,
            position: None,
            closed: false,
        }))
    }
}

impl Drop for MemoryStatement<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            conn.release_statement();
        }
    }
}

struct MemoryResultSet<'c> {
    conn: &'c mut MemoryConnection,
    table: SmolStr,
    position: Option<usize>,
    closed: bool,
}

impl MemoryResultSet<'_> {
    fn table(&self) -> Result<&MemoryTable, DriverError> {
        self.conn
            .tables
            .get(&self.table)
            .ok_or_else(|| DriverError::query(format!("relation \"{}\" dropped", self.table)))
    }

    fn value(&self, ordinal: usize) -> Result<&Value, DriverError> {
        if self.closed {
            return Err(DriverError::connection("result set is closed"));
        }
        let table = self.table()?;
        let row = self
            .position
            .and_then(|index| table.rows.get(index))
            .ok_or_else(|| DriverError::query("no current row"))?;
        let index = column_index(ordinal, row.len())?;
        Ok(&row[index])
    }

    fn release(&mut self) {
        self.closed = true;
        self.conn.stats.open_results = self.conn.stats.open_results.saturating_sub(1);
        self.conn.release_statement();
        self.conn.stats.release_calls += 1;
    }
}

impl ResultSet for MemoryResultSet<'_> {
    fn next(&mut self) -> Result<bool, DriverError> {
        if self.closed {
            return Err(DriverError::connection("result set is closed"));
        }
        let len = self.table()?.len();
        let next = self.position.map_or(0, |index| index + 1);
        if next < len {
            self.position = Some(next);
            Ok(true)
        } else {
            self.position = Some(len);
            Ok(false)
        }
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
        if self.closed {
            return Ok(());
        }
        self.release();
        if self.conn.fail_release {
            return Err(DriverError::release("server did not acknowledge close"));
        }
        Ok(())
    }
}

impl Drop for MemoryResultSet<'_> {
    fn drop(&mut self) {
        if !self.closed {
            self.release();
        }
    }
}

fn select_all_path(sql: &str) -> Result<&str, DriverError> {
    let trimmed = sql.trim();
    let head = trimmed
        .get(..SELECT_ALL.len())
        .filter(|head| head.eq_ignore_ascii_case(SELECT_ALL))
        .ok_or_else(|| DriverError::query(format!("syntax error in '{trimmed}'")))?;
    let path = trimmed[head.len()..].trim_end_matches(';').trim();
    if path.is_empty() {
        return Err(DriverError::query("syntax error at end of input"));
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_is_taken_after_select_all() {
        assert_eq!(select_all_path("SELECT * FROM t;").unwrap(), "t");
        assert_eq!(
            select_all_path("select * from pldbg_oid_debug(42)").unwrap(),
            "pldbg_oid_debug(42)"
        );
    }

    #[test]
    fn other_statements_are_rejected() {
        let err = select_all_path("DELETE FROM t").unwrap_err();
        assert_eq!(err.kind(), crate::DriverErrorKind::Query);
        assert!(select_all_path("SELECT * FROM ;").is_err());
    }

    #[test]
    fn failed_execute_releases_statement() {
        let mut conn = MemoryConnection::new();
        let statement = conn.create_statement().unwrap();
        assert!(statement.execute_query("SELECT * FROM missing").is_err());
        assert_eq!(conn.stats().open_statements, 0);
        assert_eq!(conn.stats().statements_created, 1);
    }

    #[test]
    fn dropped_result_set_releases_handles() {
        let mut conn = MemoryConnection::new().with_table("t", MemoryTable::new(["a"]));
        {
            let statement = conn.create_statement().unwrap();
            let _results = statement.execute_query("SELECT * FROM t").unwrap();
        }
        assert_eq!(conn.stats().open_statements, 0);
        assert_eq!(conn.stats().open_results, 0);
    }
}
