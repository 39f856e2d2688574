#![cfg(feature = "sqlite")]

use pldbg_rowset::driver::sqlite::SqliteConnection;
use pldbg_rowset::{collect, open, Query, RowSetError};
use time::{Date, Month};

fn seeded() -> SqliteConnection {
    let conn = SqliteConnection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE t (id INTEGER, name TEXT);
         INSERT INTO t VALUES (1, 'a'), (2, 'b'), (3, 'c');
         CREATE TABLE empty (id INTEGER);
         CREATE TABLE breakpoints (oid INTEGER, line INTEGER, enabled INTEGER, kind TEXT, created TEXT);
         INSERT INTO breakpoints VALUES (16384, 12, 1, 'global', '2022-06-01');",
    )
    .unwrap();
    conn
}

#[test]
fn streams_rows_in_order() {
    let mut conn = seeded();
    let rows = collect(&Query::select_all("t"), &mut conn, |row| {
        Ok((row.read_int()?, row.read_string()?))
    })
    .unwrap();
    assert_eq!(
        rows,
        vec![
            (1, "a".to_string()),
            (2, "b".to_string()),
            (3, "c".to_string())
        ]
    );
}

#[test]
fn empty_result_closes_cleanly() {
    let mut conn = seeded();
    let mut cursor = open(&Query::select_all("empty"), &mut conn).unwrap();
    assert!(!cursor.advance().unwrap());
    assert!(!cursor.advance().unwrap());
    cursor.close().unwrap();
}

#[test]
fn decodes_every_column_type() {
    let mut conn = seeded();
    let rows = collect(&Query::select_all("breakpoints"), &mut conn, |row| {
        Ok((
            row.read_long()?,
            row.read_int()?,
            row.read_bool()?,
            row.read_char()?,
            row.read_date()?,
        ))
    })
    .unwrap();
    let created = Date::from_calendar_date(2022, Month::June, 1).unwrap();
    assert_eq!(rows, vec![(16384, 12, true, 'g', created)]);
}

#[test]
fn malformed_sql_is_a_query_error() {
    let mut conn = seeded();
    let err = open(&Query::raw("SELEC * FROM t"), &mut conn).unwrap_err();
    assert!(matches!(err, RowSetError::Query(_)));
}

#[test]
fn text_column_read_as_int_is_a_type_mismatch() {
    let mut conn = seeded();
    let err = collect(&Query::select_all("t"), &mut conn, |row| {
        Ok((row.read_int()?, row.read_int()?))
    })
    .unwrap_err();
    assert!(matches!(err, RowSetError::TypeMismatch { ordinal: 2, .. }));
    // the connection is usable again once the failed cursor is released
    let count = collect(&Query::select_all("t"), &mut conn, |row| row.read_int()).unwrap();
    assert_eq!(count.len(), 3);
}
