//! Debugger requests over a dedicated connection.
//!
//! Every failure is latched as the last message so the controller can report
//! it once and stop the session.

use pldbg_rowset::driver::Connection;
use pldbg_rowset::{collect, RowCursor, RowSetError};
use smol_str::SmolStr;
use tracing::{debug, error, info};

use crate::call::CallDefinition;
use crate::error::DebugError;
use crate::request::{Callee, ProxyInfo, Request};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorMessage {
    pub level: MessageLevel,
    pub content: SmolStr,
}

#[derive(Debug)]
pub struct Executor<C> {
    connection: C,
    proxy: Option<ProxyInfo>,
    last_message: Option<ExecutorMessage>,
}

impl<C: Connection> Executor<C> {
    pub fn new(connection: C) -> Self {
        Self {
            connection,
            proxy: None,
            last_message: None,
        }
    }

    #[must_use]
    pub fn has_error(&self) -> bool {
        matches!(
            self.last_message,
            Some(ExecutorMessage {
                level: MessageLevel::Error,
                ..
            })
        )
    }

    #[must_use]
    pub fn last_message(&self) -> Option<&ExecutorMessage> {
        self.last_message.as_ref()
    }

    #[must_use]
    pub fn proxy(&self) -> Option<&ProxyInfo> {
        self.proxy.as_ref()
    }

    #[must_use]
    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }

    pub fn set_error(&mut self, content: impl Into<SmolStr>) {
        let content = content.into();
        error!("{content}");
        self.last_message = Some(ExecutorMessage {
            level: MessageLevel::Error,
            content,
        });
    }

    fn set_info(&mut self, content: impl Into<SmolStr>) {
        self.last_message = Some(ExecutorMessage {
            level: MessageLevel::Info,
            content: content.into(),
        });
    }

    /// Verifies that `pldbgapi` answers on the debug connection.
    pub fn check_extension(&mut self) -> Result<ProxyInfo, DebugError> {
        let result = collect(
            &Request::ProxyInfo.query(),
            &mut self.connection,
            ProxyInfo::from_row,
        );
        let proxy = match result {
            Ok(rows) => rows.into_iter().next(),
            Err(RowSetError::Query(err)) => {
                let err = DebugError::ExtensionMissing(err.message().into());
                self.set_error(err.to_string());
                return Err(err);
            }
            Err(err) => return Err(self.fail(err.into())),
        };
        let Some(proxy) = proxy else {
            return Err(self.fail(DebugError::EmptyResponse(Request::ProxyInfo.name().into())));
        };
        info!(
            "pldbgapi {} on {} (pid {})",
            proxy.api_version, proxy.server_version, proxy.server_pid
        );
        self.set_info(format!("server {}", proxy.server_version));
        self.proxy = Some(proxy.clone());
        Ok(proxy)
    }

    /// Finds the routine invoked by `call`.
    ///
    /// A qualified call searches only its schema; otherwise the schemas of
    /// `search_path` are tried in order. Overloads are told apart by argument
    /// count only.
    pub fn search_callee(
        &mut self,
        call: &CallDefinition,
        search_path: &[SmolStr],
    ) -> Result<Callee, DebugError> {
        let schemas = match &call.schema {
            Some(schema) => vec![schema.clone()],
            None => search_path.to_vec(),
        };
        let request = Request::SearchCallee {
            routine: &call.routine,
            schemas: &schemas,
        };
        let candidates = match collect(&request.query(), &mut self.connection, Callee::from_row) {
            Ok(candidates) => candidates,
            Err(err) => return Err(self.fail(err.into())),
        };
        debug!(
            "callee search for {} returned {} candidates",
            call.qualified_name(),
            candidates.len()
        );

        let nargs = call.args.len();
        let matching = schemas.iter().find_map(|schema| {
            let in_schema: Vec<&Callee> = candidates
                .iter()
                .filter(|callee| {
                    &callee.schema == schema && usize::try_from(callee.nargs).ok() == Some(nargs)
                })
                .collect();
            (!in_schema.is_empty()).then_some(in_schema)
        });
        match matching.as_deref() {
            Some([callee]) => {
                let callee = (*callee).clone();
                self.set_info(format!("debugging {}.{}", callee.schema, callee.name));
                Ok(callee)
            }
            Some(_) => Err(self.fail(DebugError::AmbiguousCallee(call.qualified_name().into()))),
            None => Err(self.fail(DebugError::CalleeNotFound(call.qualified_name().into()))),
        }
    }

    /// Sets a global breakpoint on `oid` through the user's `connection`.
    ///
    /// The backend announces the breakpoint port on its warning channel once
    /// the user's query reaches the routine.
    pub fn start_debug<U>(&mut self, connection: &mut U, oid: i64) -> Result<(), DebugError>
    where
        U: Connection + ?Sized,
    {
        let request = Request::OidDebug(oid);
        match collect(&request.query(), connection, |row| row.read_int()) {
            Ok(rows) if rows.is_empty() => {
                Err(self.fail(DebugError::EmptyResponse(request.name().into())))
            }
            Ok(_) => {
                debug!("global breakpoint set on oid {oid}");
                Ok(())
            }
            Err(err) => Err(self.fail(err.into())),
        }
    }

    /// Attaches the debug connection to the target waiting on `port`.
    pub fn attach_to_port(&mut self, port: u16) -> Result<i32, DebugError> {
        let session = self.single_value(&Request::AttachToPort(port), |row| row.read_int())?;
        info!("attached to port {port} (session {session})");
        Ok(session)
    }

    /// Aborts the target attached as `session`.
    pub fn abort(&mut self, session: i32) -> Result<bool, DebugError> {
        self.single_value(&Request::AbortTarget(session), |row| row.read_bool())
    }

    fn single_value<T>(
        &mut self,
        request: &Request<'_>,
        producer: impl Fn(&mut RowCursor<'_>) -> Result<T, RowSetError>,
    ) -> Result<T, DebugError> {
        match collect(&request.query(), &mut self.connection, producer) {
            Ok(rows) => match rows.into_iter().next() {
                Some(value) => Ok(value),
                None => Err(self.fail(DebugError::EmptyResponse(request.name().into()))),
            },
            Err(err) => Err(self.fail(err.into())),
        }
    }

    fn fail(&mut self, err: DebugError) -> DebugError {
        self.set_error(err.to_string());
        err
    }
}
