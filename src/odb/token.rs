use std::fmt;

use crate::datavalue::{quoted, symbol};

/// A lexeme of the open database format.
#[derive(Clone, PartialEq, Debug)]
pub struct Token {
    pub kind: TokenKind,
    /// Line number (1-based) at the start of the token.
    pub line: usize,
    /// Column number (1-based) at the start of the token.
    pub col: usize,
}

#[derive(Clone, PartialEq, Debug)]
pub enum TokenKind {
    LParen,
    RParen,
    /// `'`, quoting the database list.
    Quote,
    Comma,
    Int(i64),
    Float(f64),
    /// `"..."` with escapes resolved.
    String(String),
    /// `|...|` with escapes resolved.
    Symbol(String),
    /// Keyword ending in `>`, e.g. `HEADER>` or `TIME>`.
    Label(String),
    /// `TRUE`/`FALSE`, in either case.
    Bool(bool),
    /// Any other run of non-delimiter characters.
    Atom(String),
    Eof,
    /// Malformed lexeme; the message has already been counted as an error.
    Error(String),
}

impl TokenKind {
    pub fn describe(&self) -> String {
        match self {
            TokenKind::LParen => "'('".into(),
            TokenKind::RParen => "')'".into(),
            TokenKind::Quote => "quote".into(),
            TokenKind::Comma => "','".into(),
            TokenKind::Int(i) => format!("integer {i}"),
            TokenKind::Float(f) => format!("float {f:?}"),
            TokenKind::String(s) => format!("string {}", quoted(s)),
            TokenKind::Symbol(s) => format!("symbol {}", symbol(s)),
            TokenKind::Label(s) => format!("label {s}"),
            TokenKind::Bool(b) => format!("boolean {}", if *b { "TRUE" } else { "FALSE" }),
            TokenKind::Atom(s) => format!("atom {s}"),
            TokenKind::Eof => "end of file".into(),
            TokenKind::Error(m) => format!("bad token ({m})"),
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TokenKind::LParen => f.write_str("L_PAREN"),
            TokenKind::RParen => f.write_str("R_PAREN"),
            TokenKind::Quote => f.write_str("QUOTE"),
            TokenKind::Comma => f.write_str("COMMA"),
            TokenKind::Int(i) => write!(f, "INT {i}"),
            TokenKind::Float(v) => write!(f, "FLOAT {v:?}"),
            TokenKind::String(s) => write!(f, "STRING {}", quoted(s)),
            TokenKind::Symbol(s) => write!(f, "SYMBOL {}", symbol(s)),
            TokenKind::Label(s) => write!(f, "LABEL {s}"),
            TokenKind::Bool(b) => write!(f, "BOOL {}", if *b { "TRUE" } else { "FALSE" }),
            TokenKind::Atom(s) => write!(f, "ATOM {s}"),
            TokenKind::Eof => f.write_str("EOF"),
            TokenKind::Error(m) => write!(f, "ERROR {m}"),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{} {}", self.line, self.col, self.kind)
    }
}
