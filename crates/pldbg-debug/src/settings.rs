//! Debugger settings loading.

use std::path::Path;

use serde::Deserialize;
use smol_str::SmolStr;

use crate::call::is_plain_identifier;
use crate::error::DebugError;

pub const DEFAULT_SCHEMA: &str = "public";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebuggerSettings {
    /// Offer debugging for editor statements at all.
    pub enabled: bool,
    /// Accept `CALL proc(...)` statements in addition to `SELECT f(...)`.
    pub allow_procedures: bool,
    /// Schemas searched for unqualified routine names, in order.
    pub search_path: Vec<SmolStr>,
    pub log_level: SmolStr,
}

impl Default for DebuggerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            allow_procedures: false,
            search_path: vec![SmolStr::new(DEFAULT_SCHEMA)],
            log_level: SmolStr::new("info"),
        }
    }
}

impl DebuggerSettings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DebugError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|err| DebugError::InvalidConfig(format!("settings.toml: {err}").into()))?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, DebugError> {
        let raw: SettingsToml = toml::from_str(text)
            .map_err(|err| DebugError::InvalidConfig(format!("settings.toml: {err}").into()))?;
        raw.into_settings()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsToml {
    debugger: Option<DebuggerSection>,
    log: Option<LogSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DebuggerSection {
    enabled: Option<bool>,
    allow_procedures: Option<bool>,
    search_path: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LogSection {
    level: Option<String>,
}

impl SettingsToml {
    fn into_settings(self) -> Result<DebuggerSettings, DebugError> {
        let defaults = DebuggerSettings::default();
        let debugger = self.debugger.unwrap_or(DebuggerSection {
            enabled: None,
            allow_procedures: None,
            search_path: None,
        });
        let search_path = match debugger.search_path {
            Some(schemas) => {
                if schemas.is_empty() {
                    return Err(DebugError::InvalidConfig(
                        "debugger.search_path must not be empty".into(),
                    ));
                }
                schemas
                    .iter()
                    .map(|schema| {
                        let schema = schema.trim().to_ascii_lowercase();
                        if is_plain_identifier(&schema) {
                            Ok(SmolStr::new(schema))
                        } else {
                            Err(DebugError::InvalidConfig(
                                format!("invalid schema '{schema}' in debugger.search_path").into(),
                            ))
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()?
            }
            None => defaults.search_path,
        };
        let log_level = match self.log.and_then(|log| log.level) {
            Some(level) => parse_log_level(&level)?,
            None => defaults.log_level,
        };
        Ok(DebuggerSettings {
            enabled: debugger.enabled.unwrap_or(defaults.enabled),
            allow_procedures: debugger
                .allow_procedures
                .unwrap_or(defaults.allow_procedures),
            search_path,
            log_level,
        })
    }
}

fn parse_log_level(text: &str) -> Result<SmolStr, DebugError> {
    let level = text.trim().to_ascii_lowercase();
    match level.as_str() {
        "error" | "warn" | "info" | "debug" | "trace" => Ok(level.into()),
        _ => Err(DebugError::InvalidConfig(
            format!("invalid log.level '{text}'").into(),
        )),
    }
}
