//! Entry point called by the SQL editor.

use pldbg_rowset::driver::Connection;
use smol_str::SmolStr;
use tracing::debug;

use crate::call::{parse_call, CallDefinition, DebugMode};
use crate::controller::DebugController;
use crate::error::DebugError;
use crate::executor::Executor;
use crate::settings::DebuggerSettings;
use crate::watcher::{OwnerId, SessionWatcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dbms {
    Postgres,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    pub name: SmolStr,
    pub dbms: Dbms,
}

#[derive(Debug)]
pub struct DebuggerFacade {
    settings: DebuggerSettings,
    watcher: SessionWatcher,
    call: CallDefinition,
}

impl DebuggerFacade {
    #[must_use]
    pub fn new(settings: DebuggerSettings, watcher: SessionWatcher) -> Self {
        Self {
            settings,
            watcher,
            call: CallDefinition::none(""),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &DebuggerSettings {
        &self.settings
    }

    #[must_use]
    pub fn watcher(&self) -> &SessionWatcher {
        &self.watcher
    }

    /// The call found by the last [`Self::is_applicable_to_debug_statement`].
    #[must_use]
    pub fn call(&self) -> &CallDefinition {
        &self.call
    }

    /// Analyses `sql` and remembers the call for [`Self::create_controller`].
    pub fn is_applicable_to_debug_statement(&mut self, sql: &str, search_path: Option<&str>) -> bool {
        if !self.settings.enabled || self.watcher.is_debugging() {
            return false;
        }
        if let (Some(disabled), Some(current)) = (self.watcher.disabled_search_path(), search_path) {
            if disabled == current {
                debug!("debugging disabled for search path {current}");
                return false;
            }
        }
        self.call = get_call_statement(sql, &self.settings);
        self.call.can_debug()
    }

    /// Routines opened from the schema tree are always debuggable.
    #[must_use]
    pub fn is_applicable_to_debug_routine(&self) -> bool {
        true
    }

    /// Only PostgreSQL data sources can host `pldbgapi`.
    #[must_use]
    pub fn can_debug(&self, source: &DataSource) -> bool {
        source.dbms == Dbms::Postgres
    }

    /// Builds a controller for the analysed call.
    ///
    /// `selection` is the statement text the user asked to debug; it must be
    /// the statement analysed last. `connection` becomes the controller's
    /// debug connection.
    pub fn create_controller<C: Connection>(
        &self,
        owner: OwnerId,
        connection: C,
        selection: &str,
        search_path: Option<&str>,
    ) -> Result<DebugController<C>, DebugError> {
        debug!("create_controller");
        if normalize(selection) != normalize(&self.call.statement) {
            return Err(DebugError::InvalidSelection);
        }
        if !self.call.can_debug() {
            return Err(DebugError::InvalidCall(self.call.statement.as_str().into()));
        }
        let schemas = search_path
            .map(parse_search_path)
            .filter(|schemas| !schemas.is_empty())
            .unwrap_or_else(|| self.settings.search_path.clone());
        Ok(DebugController::new(
            owner,
            self.call.clone(),
            schemas,
            search_path.map(SmolStr::new),
            Executor::new(connection),
            self.watcher.clone(),
        ))
    }
}

/// Recognises a debuggable call in `sql`, honouring `settings`.
#[must_use]
pub fn get_call_statement(sql: &str, settings: &DebuggerSettings) -> CallDefinition {
    match parse_call(sql) {
        Ok(call) if call.mode == DebugMode::Procedure && !settings.allow_procedures => {
            CallDefinition::none(call.statement)
        }
        Ok(call) => call,
        Err(_) => CallDefinition::none(sql.trim()),
    }
}

/// Schemas of an editor search path such as `app, "Sales", public`.
#[must_use]
pub fn parse_search_path(text: &str) -> Vec<SmolStr> {
    text.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty() && *entry != "\"$user\"" && *entry != "$user")
        .map(|entry| match entry.strip_prefix('"').and_then(|e| e.strip_suffix('"')) {
            Some(quoted) => SmolStr::new(quoted.replace("\"\"", "\"")),
            None => SmolStr::new(entry.to_ascii_lowercase()),
        })
        .collect()
}

fn normalize(text: &str) -> String {
    text.trim()
        .trim_end_matches(';')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_path_entries() {
        assert_eq!(
            parse_search_path(r#""$user", App, "Sales", public"#),
            ["app", "Sales", "public"]
        );
        assert!(parse_search_path(" , ").is_empty());
    }

    #[test]
    fn procedures_follow_settings() {
        let mut settings = DebuggerSettings::default();
        assert!(!get_call_statement("CALL p()", &settings).can_debug());
        settings.allow_procedures = true;
        assert!(get_call_statement("CALL p()", &settings).can_debug());
    }

    #[test]
    fn selection_whitespace_is_ignored() {
        assert_eq!(normalize("SELECT  f(1)\n;"), normalize("SELECT f(1)"));
    }
}
