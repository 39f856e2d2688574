//! Driver and cursor errors.

use smol_str::SmolStr;
use thiserror::Error;

/// Classification a driver attaches to its failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverErrorKind {
    /// The database could not be reached or the session is gone.
    Connection,
    /// The server rejected the SQL text.
    Query,
    /// A column value could not be coerced to the requested type.
    TypeMismatch,
    /// Releasing a statement or result handle failed.
    Release,
}

/// Error reported by a [`crate::driver`] backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DriverError {
    kind: DriverErrorKind,
    message: SmolStr,
}

impl DriverError {
    pub fn new(kind: DriverErrorKind, message: impl Into<SmolStr>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<SmolStr>) -> Self {
        Self::new(DriverErrorKind::Connection, message)
    }

    pub fn query(message: impl Into<SmolStr>) -> Self {
        Self::new(DriverErrorKind::Query, message)
    }

    pub fn type_mismatch(message: impl Into<SmolStr>) -> Self {
        Self::new(DriverErrorKind::TypeMismatch, message)
    }

    pub fn release(message: impl Into<SmolStr>) -> Self {
        Self::new(DriverErrorKind::Release, message)
    }

    #[must_use]
    pub fn kind(&self) -> DriverErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors surfaced by [`crate::RowCursor`] and [`crate::collect`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowSetError {
    /// The connection could not execute the query.
    #[error("connection error: {0}")]
    Connection(#[source] DriverError),

    /// The query text was rejected at execute time.
    #[error("query error: {0}")]
    Query(#[source] DriverError),

    /// A column could not be decoded as the requested type.
    #[error("type mismatch at column {ordinal}: {source}")]
    TypeMismatch {
        ordinal: usize,
        #[source]
        source: DriverError,
    },

    /// A column was read while the cursor was not positioned on a row.
    #[error("cursor is not positioned on a row")]
    CursorExhausted,

    /// Releasing the statement or result handle failed.
    #[error("failed to release cursor resources: {0}")]
    ResourceRelease(#[source] DriverError),
}

impl RowSetError {
    /// Maps a driver failure raised while reading column `ordinal`.
    pub(crate) fn at_column(ordinal: usize, err: DriverError) -> Self {
        match err.kind() {
            DriverErrorKind::TypeMismatch => Self::TypeMismatch {
                ordinal,
                source: err,
            },
            _ => Self::from(err),
        }
    }
}

impl From<DriverError> for RowSetError {
    fn from(err: DriverError) -> Self {
        match err.kind() {
            DriverErrorKind::Connection => Self::Connection(err),
            DriverErrorKind::Query => Self::Query(err),
            DriverErrorKind::TypeMismatch => Self::TypeMismatch {
                ordinal: 0,
                source: err,
            },
            DriverErrorKind::Release => Self::ResourceRelease(err),
        }
    }
}
