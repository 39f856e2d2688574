//! Recognition of debuggable routine calls in editor statements.
//!
//! Accepted shapes:
//! - `SELECT [schema.]f(args)` and `SELECT * FROM [schema.]f(args)`: direct calls
//! - `CALL [schema.]p(args)`: procedure calls
//!
//! A trailing `;` is allowed; anything else after the closing parenthesis
//! makes the statement non-debuggable.

mod lexer;

use smol_str::SmolStr;

use crate::error::DebugError;
use lexer::{tokenize, SqlToken, Token};

const MAX_IDENTIFIER_LEN: usize = 63;

/// How a statement can be debugged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugMode {
    None,
    /// `SELECT` of a function call.
    Direct,
    /// `CALL` of a procedure.
    Procedure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallDefinition {
    pub mode: DebugMode,
    pub schema: Option<SmolStr>,
    pub routine: SmolStr,
    /// Argument expressions as written, trimmed.
    pub args: Vec<String>,
    /// The analysed statement text.
    pub statement: String,
}

impl CallDefinition {
    #[must_use]
    pub fn none(statement: impl Into<String>) -> Self {
        Self {
            mode: DebugMode::None,
            schema: None,
            routine: SmolStr::default(),
            args: Vec::new(),
            statement: statement.into(),
        }
    }

    #[must_use]
    pub fn can_debug(&self) -> bool {
        self.mode != DebugMode::None && !self.routine.is_empty()
    }

    #[must_use]
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{}", self.routine),
            None => self.routine.to_string(),
        }
    }
}

/// `[a-z_][a-z0-9_$]*`, at most 63 bytes: safe to embed unquoted in SQL.
#[must_use]
pub fn is_plain_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    text.len() <= MAX_IDENTIFIER_LEN
        && (first.is_ascii_lowercase() || first == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '$')
}

/// Parses `sql` as a routine call.
pub fn parse_call(sql: &str) -> Result<CallDefinition, DebugError> {
    let invalid = || DebugError::InvalidCall(sql.trim().into());
    let tokens = tokenize(sql);
    let mut parser = Parser {
        source: sql,
        tokens: &tokens,
        pos: 0,
    };

    let mode = match parser.bump() {
        Some(SqlToken::Select) => {
            if parser.eat(SqlToken::Star) && !parser.eat(SqlToken::From) {
                return Err(invalid());
            }
            DebugMode::Direct
        }
        Some(SqlToken::Call) => DebugMode::Procedure,
        _ => return Err(invalid()),
    };

    let mut parts = vec![parser.name_part().ok_or_else(invalid)?];
    while parser.eat(SqlToken::Dot) {
        parts.push(parser.name_part().ok_or_else(invalid)?);
    }
    if parts.len() > 2 {
        return Err(invalid());
    }

    if !parser.eat(SqlToken::LParen) {
        return Err(invalid());
    }
    let args = parser.arguments().ok_or_else(invalid)?;
    parser.eat(SqlToken::Semicolon);
    if parser.peek().is_some() {
        return Err(invalid());
    }

    let routine = parts.pop().ok_or_else(invalid)?;
    Ok(CallDefinition {
        mode,
        schema: parts.pop(),
        routine,
        args,
        statement: sql.trim().to_string(),
    })
}

struct Parser<'a> {
    source: &'a str,
    tokens: &'a [Token],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<SqlToken> {
        self.tokens.get(self.pos).map(|token| token.kind)
    }

    fn bump(&mut self) -> Option<SqlToken> {
        let kind = self.peek()?;
        self.pos += 1;
        Some(kind)
    }

    fn eat(&mut self, kind: SqlToken) -> bool {
        if self.peek() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn text(&self, index: usize) -> &str {
        &self.source[self.tokens[index].span.clone()]
    }

    fn name_part(&mut self) -> Option<SmolStr> {
        let index = self.pos;
        match self.bump()? {
            SqlToken::Ident => Some(self.text(index).to_ascii_lowercase().into()),
            SqlToken::QuotedIdent => {
                let text = self.text(index);
                let inner = &text[1..text.len() - 1];
                Some(inner.replace("\"\"", "\"").into())
            }
            _ => None,
        }
    }

    /// Argument texts up to the matching `)`, split at top-level commas.
    fn arguments(&mut self) -> Option<Vec<String>> {
        let source = self.source;
        let tokens = self.tokens;
        let mut args = Vec::new();
        let mut depth = 0usize;
        let mut start: Option<usize> = None;
        let mut end = 0usize;
        loop {
            let token = tokens.get(self.pos)?;
            self.pos += 1;
            match token.kind {
                SqlToken::LParen | SqlToken::LBracket => depth += 1,
                SqlToken::RParen if depth == 0 => {
                    match start {
                        Some(start) => args.push(source[start..end].trim().to_string()),
                        None if args.is_empty() => {}
                        None => return None,
                    }
                    return Some(args);
                }
                SqlToken::RParen | SqlToken::RBracket => depth = depth.checked_sub(1)?,
                SqlToken::Comma if depth == 0 => {
                    let start = start.take()?;
                    args.push(source[start..end].trim().to_string());
                    continue;
                }
                SqlToken::Semicolon | SqlToken::Error => return None,
                _ => {}
            }
            if start.is_none() {
                start = Some(token.span.start);
            }
            end = token.span.end;
        }
    }
}
