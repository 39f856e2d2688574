//! PL/pgSQL debugger session control.
//!
//! The [`DebuggerFacade`] decides whether an editor statement is a debuggable
//! routine call and builds a [`DebugController`] for it. The controller talks
//! to the `pldbgapi` extension through [`Executor`] requests and attaches to
//! the backend once the server announces the breakpoint port.

pub mod call;
mod controller;
mod error;
mod executor;
mod facade;
mod request;
mod settings;
mod watcher;

pub use call::{parse_call, CallDefinition, DebugMode};
pub use controller::{parse_break_port, ControllerState, DebugController, DebugTarget, BREAK_MARKER};
pub use error::DebugError;
pub use executor::{Executor, ExecutorMessage, MessageLevel};
pub use facade::{get_call_statement, parse_search_path, DataSource, Dbms, DebuggerFacade};
pub use request::{quote_literal, Callee, ProxyInfo, Request};
pub use settings::{DebuggerSettings, DEFAULT_SCHEMA};
pub use watcher::{OwnerId, SessionWatcher};
