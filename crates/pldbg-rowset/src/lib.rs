//! Forward-only row streaming over SQL query results.
//!
//! A [`RowCursor`] wraps one statement and one result handle obtained from a
//! [`driver::Connection`]. Rows are fetched one at a time and decoded column
//! by column; [`collect`] and [`RowCursor::rows`] turn a cursor into values
//! built by a caller-supplied producer and release the handles on every exit
//! path.
//!
//! ```
//! use pldbg_rowset::driver::memory::{MemoryConnection, MemoryTable};
//! use pldbg_rowset::{collect, Query, Value};
//!
//! let mut conn = MemoryConnection::new().with_table(
//!     "t",
//!     MemoryTable::new(["id", "name"])
//!         .row([Value::from(1), Value::from("a")])
//!         .row([Value::from(2), Value::from("b")]),
//! );
//! let rows = collect(&Query::select_all("t"), &mut conn, |row| {
//!     Ok((row.read_int()?, row.read_string()?))
//! })
//! .unwrap();
//! assert_eq!(rows, vec![(1, "a".to_string()), (2, "b".to_string())]);
//! ```

mod cursor;
pub mod driver;
mod error;
mod query;
mod value;

pub use cursor::{collect, open, CursorState, RowCursor, RowStream};
pub use error::{DriverError, DriverErrorKind, RowSetError};
pub use query::Query;
pub use value::Value;
