//! `SELECT * FROM <path>` requests understood by the `pldbgapi` extension.

use pldbg_rowset::{Query, RowCursor, RowSetError};
use smol_str::SmolStr;

/// A debugger request; every request is sent as `SELECT * FROM <path>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request<'a> {
    ProxyInfo,
    SearchCallee {
        routine: &'a str,
        schemas: &'a [SmolStr],
    },
    OidDebug(i64),
    AttachToPort(u16),
    AbortTarget(i32),
}

impl Request<'_> {
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::ProxyInfo => "pldbg_get_proxy_info()".to_string(),
            Self::SearchCallee { routine, schemas } => {
                let schemas = schemas
                    .iter()
                    .map(|schema| quote_literal(schema))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "(SELECT p.oid::bigint, n.nspname::text, p.proname::text, p.pronargs::int \
                     FROM pg_catalog.pg_proc p \
                     JOIN pg_catalog.pg_namespace n ON n.oid = p.pronamespace \
                     WHERE p.proname = {} AND n.nspname IN ({schemas})) AS callee",
                    quote_literal(routine)
                )
            }
            Self::OidDebug(oid) => format!("pldbg_oid_debug({oid})"),
            Self::AttachToPort(port) => format!("pldbg_attach_to_port({port})"),
            Self::AbortTarget(session) => format!("pldbg_abort_target({session})"),
        }
    }

    #[must_use]
    pub fn query(&self) -> Query {
        Query::select_all(&self.path())
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ProxyInfo => "pldbg_get_proxy_info",
            Self::SearchCallee { .. } => "callee search",
            Self::OidDebug(_) => "pldbg_oid_debug",
            Self::AttachToPort(_) => "pldbg_attach_to_port",
            Self::AbortTarget(_) => "pldbg_abort_target",
        }
    }
}

/// SQL string literal with embedded quotes doubled.
#[must_use]
pub fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Row of `pldbg_get_proxy_info()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyInfo {
    pub server_version: String,
    pub server_version_num: i32,
    pub api_version: i32,
    pub server_pid: i32,
}

impl ProxyInfo {
    pub fn from_row(row: &mut RowCursor<'_>) -> Result<Self, RowSetError> {
        Ok(Self {
            server_version: row.read_string()?,
            server_version_num: row.read_int()?,
            api_version: row.read_int()?,
            server_pid: row.read_int()?,
        })
    }
}

/// A routine matching a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Callee {
    pub oid: i64,
    pub schema: SmolStr,
    pub name: SmolStr,
    pub nargs: i32,
}

impl Callee {
    pub fn from_row(row: &mut RowCursor<'_>) -> Result<Self, RowSetError> {
        Ok(Self {
            oid: row.read_long()?,
            schema: row.read_string()?.into(),
            name: row.read_string()?.into(),
            nargs: row.read_int()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;

    #[test]
    fn search_path_is_quoted() {
        let schemas = [SmolStr::new("public"), SmolStr::new("o'neil")];
        let request = Request::SearchCallee {
            routine: "f",
            schemas: &schemas,
        };
        expect![[r#"SELECT * FROM (SELECT p.oid::bigint, n.nspname::text, p.proname::text, p.pronargs::int FROM pg_catalog.pg_proc p JOIN pg_catalog.pg_namespace n ON n.oid = p.pronamespace WHERE p.proname = 'f' AND n.nspname IN ('public', 'o''neil')) AS callee"#]]
            .assert_eq(request.query().sql());
    }

    #[test]
    fn debugger_function_paths() {
        assert_eq!(Request::OidDebug(16_384).path(), "pldbg_oid_debug(16384)");
        assert_eq!(
            Request::AttachToPort(49_152).path(),
            "pldbg_attach_to_port(49152)"
        );
        assert_eq!(Request::AbortTarget(3).path(), "pldbg_abort_target(3)");
    }
}
