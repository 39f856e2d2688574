//! Query text.

use std::fmt;

/// Immutable SQL text submitted to a connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query {
    sql: String,
}

impl Query {
    /// `SELECT * FROM <path>`.
    ///
    /// `path` is inserted verbatim; it must already be a safe relation or
    /// function-call expression.
    #[must_use]
    pub fn select_all(path: &str) -> Self {
        Self {
            sql: format!("SELECT * FROM {}", path.trim()),
        }
    }

    /// Wraps arbitrary SQL text without inspecting it.
    #[must_use]
    pub fn raw(sql: impl Into<String>) -> Self {
        Self { sql: sql.into() }
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_all_projection() {
        let query = Query::select_all(" pldbg_get_proxy_info() ");
        assert_eq!(query.sql(), "SELECT * FROM pldbg_get_proxy_info()");
    }
}
