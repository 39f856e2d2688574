//! SQL tokens needed to recognise a routine call.

use std::ops::Range;

use logos::Logos;

fn lex_block_comment(lex: &mut logos::Lexer<SqlToken>) -> bool {
    let bytes = lex.remainder().as_bytes();
    let mut depth = 1usize;
    let mut i = 0usize;
    while i + 1 < bytes.len() {
        match (bytes[i], bytes[i + 1]) {
            (b'/', b'*') => {
                depth += 1;
                i += 2;
            }
            (b'*', b'/') => {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    lex.bump(i);
                    return true;
                }
            }
            _ => i += 1,
        }
    }
    lex.bump(bytes.len());
    false
}

fn lex_line_comment(lex: &mut logos::Lexer<SqlToken>) {
    let rest = lex.remainder();
    lex.bump(rest.find(['\r', '\n']).unwrap_or(rest.len()));
}

/// Consumes up to the closing `quote`; a doubled quote is part of the text.
fn lex_quoted(lex: &mut logos::Lexer<SqlToken>, quote: u8) -> bool {
    let bytes = lex.remainder().as_bytes();
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            lex.bump(i + 1);
            return true;
        }
        i += 1;
    }
    lex.bump(bytes.len());
    false
}

fn keyword(text: &str) -> Option<SqlToken> {
    [
        ("select", SqlToken::Select),
        ("from", SqlToken::From),
        ("call", SqlToken::Call),
    ]
    .into_iter()
    .find_map(|(word, kind)| text.eq_ignore_ascii_case(word).then_some(kind))
}

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlToken {
    #[regex(r"[ \t\r\n\f]+")]
    Whitespace,

    #[token("--", lex_line_comment)]
    LineComment,

    /// `/* ... */`, nested as in PostgreSQL.
    #[token("/*", lex_block_comment)]
    BlockComment,

    /// Keywords are lexed as [`SqlToken::Ident`] and told apart by
    /// [`tokenize`].
    Select,
    From,
    Call,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token(",")]
    Comma,

    #[token(".")]
    Dot,

    #[token(";")]
    Semicolon,

    #[token("*")]
    Star,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[regex(r"[A-Za-z_][A-Za-z0-9_$]*")]
    Ident,

    #[token("\"", |lex| lex_quoted(lex, b'"'))]
    QuotedIdent,

    #[token("'", |lex| lex_quoted(lex, b'\''))]
    StringLiteral,

    #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?")]
    Number,

    #[regex(r"[+\-/<>=!|&%^~@#:]")]
    Operator,

    /// Unrecognised input.
    Error,
}

impl SqlToken {
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            Self::Whitespace | Self::LineComment | Self::BlockComment
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: SqlToken,
    pub span: Range<usize>,
}

/// Significant tokens of `source`; trivia is dropped.
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut lexer = SqlToken::lexer(source);
    let mut tokens = Vec::new();
    while let Some(kind) = lexer.next() {
        let kind = match kind {
            Ok(SqlToken::Ident) => keyword(lexer.slice()).unwrap_or(SqlToken::Ident),
            Ok(kind) => kind,
            Err(()) => SqlToken::Error,
        };
        if kind.is_trivia() {
            continue;
        }
        tokens.push(Token {
            kind,
            span: lexer.span(),
        });
    }
    tokens
}
