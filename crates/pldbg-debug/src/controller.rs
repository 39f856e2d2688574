//! Debug session controller.
//!
//! States advance `Idle -> AwaitingCallee -> Attaching -> Debugging` and end
//! in `Closed`, which is reachable from every state. Editor callbacks are
//! forwarded as method calls; callbacks for other requests are ignored.

use pldbg_rowset::driver::Connection;
use smol_str::SmolStr;
use tracing::{debug, info, warn};

use crate::call::CallDefinition;
use crate::error::DebugError;
use crate::executor::Executor;
use crate::request::Callee;
use crate::watcher::{OwnerId, SessionWatcher};

/// Marker the `pldbgapi` backend puts in the warning it raises when a
/// global breakpoint is hit.
pub const BREAK_MARKER: &str = "PLDBGBREAK:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Created, nothing resolved yet.
    Idle,
    /// Callee resolved; waiting for the editor to start the query.
    AwaitingCallee,
    /// Breakpoint set on the user's connection; waiting for its port.
    Attaching,
    /// Attached to the target backend.
    Debugging,
    Closed,
}

/// The backend the debugger is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugTarget {
    pub port: u16,
    pub session: i32,
    pub callee: Callee,
}

#[derive(Debug)]
pub struct DebugController<C: Connection> {
    owner: OwnerId,
    call: CallDefinition,
    search_path: Vec<SmolStr>,
    search_path_label: Option<SmolStr>,
    executor: Executor<C>,
    watcher: SessionWatcher,
    state: ControllerState,
    callee: Option<Callee>,
    target: Option<DebugTarget>,
}

impl<C: Connection> DebugController<C> {
    /// `search_path` lists the schemas searched for an unqualified callee;
    /// `search_path_label` is the editor's search path, disabled on failure.
    pub fn new(
        owner: OwnerId,
        call: CallDefinition,
        search_path: Vec<SmolStr>,
        search_path_label: Option<SmolStr>,
        executor: Executor<C>,
        watcher: SessionWatcher,
    ) -> Self {
        Self {
            owner,
            call,
            search_path,
            search_path_label,
            executor,
            watcher,
            state: ControllerState::Idle,
            callee: None,
            target: None,
        }
    }

    #[must_use]
    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    #[must_use]
    pub fn state(&self) -> ControllerState {
        self.state
    }

    #[must_use]
    pub fn call(&self) -> &CallDefinition {
        &self.call
    }

    #[must_use]
    pub fn callee(&self) -> Option<&Callee> {
        self.callee.as_ref()
    }

    #[must_use]
    pub fn target(&self) -> Option<&DebugTarget> {
        self.target.as_ref()
    }

    #[must_use]
    pub fn executor(&self) -> &Executor<C> {
        &self.executor
    }

    /// Checks the extension and resolves the called routine.
    pub fn get_ready(&mut self) -> Result<&Callee, DebugError> {
        debug!("get_ready");
        self.expect_state("get ready", ControllerState::Idle)?;
        if let Err(err) = self.watcher.try_begin(self.owner) {
            self.state = ControllerState::Closed;
            return Err(err);
        }
        if !self.call.can_debug() {
            self.executor.set_error("Invalid call expression");
            return Err(self.fail(DebugError::InvalidCall(self.call.statement.as_str().into())));
        }
        if let Err(err) = self.executor.check_extension() {
            return Err(self.fail(err));
        }
        let callee = match self.executor.search_callee(&self.call, &self.search_path) {
            Ok(callee) => callee,
            Err(err) => return Err(self.fail(err)),
        };
        self.state = ControllerState::AwaitingCallee;
        Ok(self.callee.insert(callee))
    }

    /// Sets the global breakpoint on the connection that will run the
    /// user's statement.
    pub fn init_remote<U>(&mut self, connection: &mut U) -> Result<(), DebugError>
    where
        U: Connection + ?Sized,
    {
        info!("init_remote");
        self.expect_state("init remote", ControllerState::AwaitingCallee)?;
        let Some(oid) = self.callee.as_ref().map(|callee| callee.oid) else {
            return Err(self.fail(DebugError::CalleeNotFound(self.call.qualified_name().into())));
        };
        if let Err(err) = self.executor.start_debug(connection, oid) {
            return Err(self.fail(err));
        }
        self.state = ControllerState::Attaching;
        Ok(())
    }

    /// Handles a server warning raised while the user's query runs.
    ///
    /// Returns the attached target when the warning announced the breakpoint
    /// port of this controller's request.
    pub fn on_warning(
        &mut self,
        owner: OwnerId,
        message: &str,
    ) -> Result<Option<DebugTarget>, DebugError> {
        if owner != self.owner {
            return Ok(None);
        }
        let Some(port) = parse_break_port(message) else {
            return Ok(None);
        };
        if self.state != ControllerState::Attaching {
            debug!("ignoring breakpoint port {port} while {:?}", self.state);
            return Ok(None);
        }
        let session = match self.executor.attach_to_port(port) {
            Ok(session) => session,
            Err(err) => return Err(self.fail(err)),
        };
        let Some(callee) = self.callee.clone() else {
            return Err(self.fail(DebugError::CalleeNotFound(self.call.qualified_name().into())));
        };
        let target = DebugTarget {
            port,
            session,
            callee,
        };
        self.state = ControllerState::Debugging;
        self.target = Some(target.clone());
        Ok(Some(target))
    }

    /// The user's query started returning rows: the routine has finished.
    pub fn on_fetch_started(&mut self, owner: OwnerId) {
        if owner == self.owner {
            self.close();
        }
    }

    pub fn on_last_row(&mut self, owner: OwnerId, total: usize) {
        if owner == self.owner {
            debug!("last row added ({total} rows)");
        }
    }

    /// Ends the session. Later calls are no-ops.
    pub fn close(&mut self) {
        if self.state == ControllerState::Closed {
            return;
        }
        info!("close");
        if let Some(target) = self.target.take() {
            if let Err(err) = self.executor.abort(target.session) {
                warn!("abort of session {} failed: {err}", target.session);
            }
        }
        self.state = ControllerState::Closed;
        self.watcher.end(self.owner);
    }

    fn expect_state(
        &self,
        operation: &'static str,
        expected: ControllerState,
    ) -> Result<(), DebugError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(DebugError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn fail(&mut self, err: DebugError) -> DebugError {
        if let Some(label) = &self.search_path_label {
            self.watcher.disable(label.clone());
        }
        self.close();
        err
    }
}

impl<C: Connection> Drop for DebugController<C> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Port announced by a `PLDBGBREAK:<port>` warning.
///
/// The last marker followed by a valid port wins.
#[must_use]
pub fn parse_break_port(message: &str) -> Option<u16> {
    message.rmatch_indices(BREAK_MARKER).find_map(|(start, marker)| {
        let digits = &message[start + marker.len()..];
        let end = digits
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(digits.len());
        digits[..end].parse().ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn break_port_inside_notice() {
        assert_eq!(parse_break_port("PLDBGBREAK:49152"), Some(49_152));
        assert_eq!(
            parse_break_port("WARNING: PLDBGBREAK:5432 (pid 77)"),
            Some(5432)
        );
        assert_eq!(parse_break_port("PLDBGBREAK:1 PLDBGBREAK:2"), Some(2));
    }

    #[test]
    fn earlier_marker_used_when_last_has_no_port() {
        assert_eq!(parse_break_port("PLDBGBREAK:5 PLDBGBREAK:x"), Some(5));
        assert_eq!(parse_break_port("PLDBGBREAK:7 PLDBGBREAK:"), Some(7));
    }

    #[test]
    fn no_port_without_digits() {
        assert_eq!(parse_break_port("PLDBGBREAK:"), None);
        assert_eq!(parse_break_port("PLDBGBREAK:x1"), None);
        assert_eq!(parse_break_port("notice"), None);
        assert_eq!(parse_break_port("PLDBGBREAK:99999"), None);
    }
}
