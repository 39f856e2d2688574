//! Debugger errors.

use pldbg_rowset::RowSetError;
use smol_str::SmolStr;
use thiserror::Error;

use crate::controller::ControllerState;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DebugError {
    /// A request to the debugger extension failed.
    #[error(transparent)]
    RowSet(#[from] RowSetError),

    /// The `pldbgapi` extension is not available on the server.
    #[error("pldbgapi extension is not installed: {0}")]
    ExtensionMissing(SmolStr),

    /// The statement is not a debuggable routine call.
    #[error("invalid call expression '{0}'")]
    InvalidCall(SmolStr),

    /// No routine matches the call.
    #[error("routine {0} not found")]
    CalleeNotFound(SmolStr),

    /// Several overloads match the call.
    #[error("routine {0} is ambiguous")]
    AmbiguousCallee(SmolStr),

    /// A debugger request returned no row.
    #[error("empty response from {0}")]
    EmptyResponse(SmolStr),

    /// The editor selection does not match the analysed statement.
    #[error("Invalid selection")]
    InvalidSelection,

    /// Another debug session is already running.
    #[error("a debug session is already active")]
    SessionActive,

    /// A controller operation was called in the wrong state.
    #[error("cannot {operation} while {state:?}")]
    InvalidState {
        operation: &'static str,
        state: ControllerState,
    },

    /// Configuration error.
    #[error("invalid config '{0}'")]
    InvalidConfig(SmolStr),
}
