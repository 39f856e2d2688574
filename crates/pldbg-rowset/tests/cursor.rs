use std::io::Write;
use std::sync::{Arc, Mutex};

use expect_test::expect;
use pldbg_rowset::driver::memory::{HandleStats, MemoryConnection, MemoryTable};
use pldbg_rowset::{collect, open, CursorState, DriverErrorKind, Query, RowCursor, RowSetError, Value};

fn three_rows() -> MemoryConnection {
    MemoryConnection::new().with_table(
        "t",
        MemoryTable::new(["id", "name"])
            .row([Value::from(1), Value::from("a")])
            .row([Value::from(2), Value::from("b")])
            .row([Value::from(3), Value::from("c")]),
    )
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

fn released(stats: &HandleStats) -> bool {
    stats.open_statements == 0 && stats.open_results == 0
}

fn id_and_name(row: &mut RowCursor<'_>) -> Result<(i32, String), RowSetError> {
    Ok((row.read_int()?, row.read_string()?))
}

#[test]
fn three_rows_then_exhausted() {
    let mut conn = three_rows();
    let mut cursor = open(&Query::select_all("t"), &mut conn).unwrap();
    let mut seen = Vec::new();
    while cursor.advance().unwrap() {
        seen.push(id_and_name(&mut cursor).unwrap());
    }
    assert_eq!(
        seen,
        vec![
            (1, "a".to_string()),
            (2, "b".to_string()),
            (3, "c".to_string())
        ]
    );
    for _ in 0..3 {
        assert!(!cursor.advance().unwrap());
    }
    assert_eq!(cursor.state(), CursorState::Exhausted);
    cursor.close().unwrap();
    drop(cursor);
    assert!(released(conn.stats()));
}

#[test]
fn empty_table_is_exhausted_immediately() {
    let mut conn = MemoryConnection::new().with_table("empty", MemoryTable::new(["id"]));
    let mut cursor = open(&Query::select_all("empty"), &mut conn).unwrap();
    assert!(!cursor.advance().unwrap());
    cursor.close().unwrap();
    drop(cursor);
    assert!(released(conn.stats()));
}

#[test]
fn ordinal_tracks_column_reads() {
    let mut conn = three_rows();
    let mut cursor = open(&Query::select_all("t"), &mut conn).unwrap();
    assert!(cursor.advance().unwrap());
    assert_eq!(cursor.ordinal(), 0);
    cursor.read_int().unwrap();
    assert_eq!(cursor.ordinal(), 1);
    cursor.read_string().unwrap();
    assert_eq!(cursor.ordinal(), 2);

    assert!(cursor.advance().unwrap());
    assert_eq!(cursor.ordinal(), 0);
    assert_eq!(cursor.read_long().unwrap(), 2);
    assert_eq!(cursor.read_char().unwrap(), 'b');
}

#[test]
fn advance_resets_ordinal_even_when_exhausted() {
    let mut conn = MemoryConnection::new()
        .with_table("one", MemoryTable::new(["id"]).row([Value::from(7)]));
    let mut cursor = open(&Query::select_all("one"), &mut conn).unwrap();
    assert!(cursor.advance().unwrap());
    cursor.read_int().unwrap();
    assert!(!cursor.advance().unwrap());
    assert_eq!(cursor.ordinal(), 0);
}

#[test]
fn reads_outside_a_row_fail_for_every_type() {
    let mut conn = three_rows();
    let mut cursor = open(&Query::select_all("t"), &mut conn).unwrap();

    fn assert_all_exhausted(cursor: &mut RowCursor<'_>) {
        assert_eq!(cursor.read_string(), Err(RowSetError::CursorExhausted));
        assert_eq!(cursor.read_int(), Err(RowSetError::CursorExhausted));
        assert_eq!(cursor.read_long(), Err(RowSetError::CursorExhausted));
        assert_eq!(cursor.read_bool(), Err(RowSetError::CursorExhausted));
        assert_eq!(cursor.read_char(), Err(RowSetError::CursorExhausted));
        assert_eq!(cursor.read_date(), Err(RowSetError::CursorExhausted));
        assert_eq!(cursor.ordinal(), 0);
    }

    assert_all_exhausted(&mut cursor);
    while cursor.advance().unwrap() {}
    assert_all_exhausted(&mut cursor);
    cursor.close().unwrap();
    assert_all_exhausted(&mut cursor);
}

#[test]
fn close_is_idempotent() {
    let mut conn = three_rows();
    let mut cursor = open(&Query::select_all("t"), &mut conn).unwrap();
    cursor.close().unwrap();
    cursor.close().unwrap();
    assert_eq!(cursor.state(), CursorState::Closed);
    assert!(!cursor.advance().unwrap());
    drop(cursor);
    assert_eq!(conn.stats().release_calls, 1);
    assert!(released(conn.stats()));
}

#[test]
fn early_close_releases_like_full_consumption() {
    let mut full = three_rows();
    collect(&Query::select_all("t"), &mut full, id_and_name).unwrap();

    let mut partial = three_rows();
    let mut cursor = open(&Query::select_all("t"), &mut partial).unwrap();
    assert!(cursor.advance().unwrap());
    cursor.close().unwrap();
    drop(cursor);

    assert_eq!(full.stats(), partial.stats());
    assert!(released(partial.stats()));
}

#[test]
fn dropping_an_open_cursor_releases_handles() {
    let mut conn = three_rows();
    {
        let mut cursor = open(&Query::select_all("t"), &mut conn).unwrap();
        assert!(cursor.advance().unwrap());
    }
    assert!(released(conn.stats()));
    assert_eq!(conn.stats().release_calls, 1);
}

#[test]
fn decode_error_on_second_row_surfaces_and_releases() {
    let mut conn = MemoryConnection::new().with_table(
        "t",
        MemoryTable::new(["id", "amount"])
            .row([Value::from(1), Value::from(10)])
            .row([Value::from(2), Value::from("ten")])
            .row([Value::from(3), Value::from(30)]),
    );
    let err = collect(&Query::select_all("t"), &mut conn, |row| {
        Ok((row.read_int()?, row.read_int()?))
    })
    .unwrap_err();
    expect!["type mismatch at column 2: 'ten' is not an integer"].assert_eq(&err.to_string());
    match err {
        RowSetError::TypeMismatch { ordinal, source } => {
            assert_eq!(ordinal, 2);
            assert_eq!(source.kind(), DriverErrorKind::TypeMismatch);
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(released(conn.stats()));
}

#[test]
fn failed_read_consumes_its_column() {
    let mut conn = MemoryConnection::new().with_table(
        "t",
        MemoryTable::new(["name", "label"]).row([Value::from("x"), Value::from("y")]),
    );
    let mut cursor = open(&Query::select_all("t"), &mut conn).unwrap();
    assert!(cursor.advance().unwrap());
    assert!(matches!(
        cursor.read_int(),
        Err(RowSetError::TypeMismatch { ordinal: 1, .. })
    ));
    assert_eq!(cursor.ordinal(), 1);
    assert_eq!(cursor.read_string().unwrap(), "y");
    assert_eq!(cursor.ordinal(), 2);
}

#[test]
fn unknown_relation_is_a_query_error() {
    let mut conn = MemoryConnection::new();
    let err = open(&Query::select_all("nope"), &mut conn).unwrap_err();
    assert!(matches!(err, RowSetError::Query(_)));
    assert!(released(conn.stats()));
}

#[test]
fn offline_connection_is_a_connection_error() {
    let mut conn = three_rows();
    conn.set_offline(true);
    let err = collect(&Query::select_all("t"), &mut conn, id_and_name).unwrap_err();
    assert!(matches!(err, RowSetError::Connection(_)));
}

#[test]
fn release_failure_is_reported_once() {
    let mut conn = three_rows();
    conn.set_fail_release(true);
    let mut cursor = open(&Query::select_all("t"), &mut conn).unwrap();
    assert!(matches!(
        cursor.close(),
        Err(RowSetError::ResourceRelease(_))
    ));
    cursor.close().unwrap();
}

#[test]
fn release_failure_on_close_is_logged() {
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let mut conn = three_rows();
    conn.set_fail_release(true);
    tracing::subscriber::with_default(subscriber, || {
        let mut cursor = open(&Query::select_all("t"), &mut conn).unwrap();
        while cursor.advance().unwrap() {}
        assert!(cursor.close().is_err());
    });
    let logs = logs.contents();
    assert!(logs.contains("WARN"), "{logs}");
    assert!(logs.contains("row cursor release failed"), "{logs}");
}

#[test]
fn release_failure_does_not_mask_decode_error() {
    let mut conn = MemoryConnection::new()
        .with_table("t", MemoryTable::new(["id"]).row([Value::from("x")]));
    conn.set_fail_release(true);
    let err = collect(&Query::select_all("t"), &mut conn, |row| row.read_int()).unwrap_err();
    assert!(matches!(err, RowSetError::TypeMismatch { ordinal: 1, .. }));
    assert!(released(conn.stats()));
}

#[test]
fn release_failure_after_clean_exhaustion_is_surfaced() {
    let mut conn = three_rows();
    conn.set_fail_release(true);
    let err = collect(&Query::select_all("t"), &mut conn, id_and_name).unwrap_err();
    assert!(matches!(err, RowSetError::ResourceRelease(_)));
}

#[test]
fn row_stream_is_lazy() {
    let mut conn = three_rows();
    let mut stream = open(&Query::select_all("t"), &mut conn)
        .unwrap()
        .rows(id_and_name);
    assert_eq!(stream.next(), Some(Ok((1, "a".to_string()))));
    assert_eq!(stream.cursor().state(), CursorState::RowReady);
    stream.close().unwrap();
    assert!(released(conn.stats()));
}

#[test]
fn row_stream_stops_after_error() {
    let mut conn = MemoryConnection::new().with_table(
        "t",
        MemoryTable::new(["flag"])
            .row([Value::from(true)])
            .row([Value::from("maybe")])
            .row([Value::from(false)]),
    );
    let items: Vec<_> = open(&Query::select_all("t"), &mut conn)
        .unwrap()
        .rows(|row| row.read_bool())
        .collect();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0], Ok(true));
    assert!(items[1].is_err());
    assert!(released(conn.stats()));
}

#[test]
fn executed_sql_is_select_all() {
    let mut conn = three_rows();
    collect(&Query::select_all("t"), &mut conn, id_and_name).unwrap();
    assert_eq!(conn.executed(), ["SELECT * FROM t"]);
}
