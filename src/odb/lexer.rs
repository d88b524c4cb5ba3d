use std::io::{self, BufReader, Bytes, Read};

use lazy_static::lazy_static;
use regex::Regex;

use crate::odb::token::{Token, TokenKind};

lazy_static! {
    static ref INTEGER: Regex = Regex::new(r"^[+-]?[0-9]+$").unwrap();
    static ref REAL: Regex =
        Regex::new(r"^[+-]?(?:[0-9]+\.[0-9]*|\.[0-9]+|[0-9]+)(?:[eE][+-]?[0-9]+)?$").unwrap();
    static ref CLOCK: Regex = Regex::new(r"^[0-9]+(?::[0-9]+)+$").unwrap();
}

/// A warning found while scanning, reported by the reader.
#[derive(Clone, PartialEq, Debug)]
pub struct LexWarning {
    pub line: usize,
    pub col: usize,
    pub message: String,
}

/// Byte-at-a-time scanner over any reader. Understands `\n`, `\r` and
/// `\r\n` line ends.
pub struct Lexer<R: Read> {
    bytes: Bytes<BufReader<R>>,
    peeked: Option<u8>,
    line: usize,
    col: usize,
    after_cr: bool,
    warnings: Vec<LexWarning>,
}

fn is_delimiter(b: u8) -> bool {
    matches!(b, b'(' | b')' | b'"' | b',') || b.is_ascii_whitespace()
}

impl<R: Read> Lexer<R> {
    pub fn new(input: R) -> Self {
        Self {
            bytes: BufReader::new(input).bytes(),
            peeked: None,
            line: 1,
            col: 1,
            after_cr: false,
            warnings: Vec::new(),
        }
    }
    pub fn line(&self) -> usize {
        self.line
    }
    pub fn col(&self) -> usize {
        self.col
    }
    /// Warnings gathered since the last call.
    pub fn take_warnings(&mut self) -> Vec<LexWarning> {
        std::mem::take(&mut self.warnings)
    }
    fn peek_byte(&mut self) -> io::Result<Option<u8>> {
        if self.peeked.is_none() {
            self.peeked = self.bytes.next().transpose()?;
        }
        Ok(self.peeked)
    }
    fn bump(&mut self) -> io::Result<Option<u8>> {
        let b = match self.peeked.take() {
            Some(b) => Some(b),
            None => self.bytes.next().transpose()?,
        };
        if let Some(b) = b {
            match b {
                b'\n' => {
                    if !self.after_cr {
                        self.line += 1;
                    }
                    self.col = 1;
                }
                b'\r' => {
                    self.line += 1;
                    self.col = 1;
                }
                _ => self.col += 1,
            }
            self.after_cr = b == b'\r';
        }
        Ok(b)
    }
    fn warn(&mut self, line: usize, col: usize, message: impl Into<String>) {
        self.warnings.push(LexWarning {
            line,
            col,
            message: message.into(),
        });
    }
    fn skip_blanks_and_comments(&mut self) -> io::Result<()> {
        while let Some(b) = self.peek_byte()? {
            if b.is_ascii_whitespace() {
                self.bump()?;
            } else if b == b';' {
                while let Some(c) = self.peek_byte()? {
                    if c == b'\n' || c == b'\r' {
                        break;
                    }
                    self.bump()?;
                }
            } else {
                break;
            }
        }
        Ok(())
    }

    /// Produces the next token. Only I/O failures are errors; malformed
    /// input comes back as [`TokenKind::Error`].
    pub fn next_token(&mut self) -> io::Result<Token> {
        self.skip_blanks_and_comments()?;
        let (line, col) = (self.line, self.col);
        let kind = match self.peek_byte()? {
            None => TokenKind::Eof,
            Some(b'(') => self.single(TokenKind::LParen)?,
            Some(b')') => self.single(TokenKind::RParen)?,
            Some(b'\'') => self.single(TokenKind::Quote)?,
            Some(b',') => self.single(TokenKind::Comma)?,
            Some(b'"') => self.lex_string(line, col)?,
            Some(b'|') => self.lex_symbol(line, col)?,
            Some(b) if b.is_ascii_graphic() => self.lex_atom()?,
            Some(b) => {
                self.bump()?;
                TokenKind::Error(format!("illegal character 0x{b:02X}"))
            }
        };
        Ok(Token { kind, line, col })
    }
    fn single(&mut self, kind: TokenKind) -> io::Result<TokenKind> {
        self.bump()?;
        Ok(kind)
    }
    fn lex_string(&mut self, line: usize, col: usize) -> io::Result<TokenKind> {
        self.bump()?;
        let mut raw = Vec::new();
        let mut dropped = false;
        loop {
            let Some(b) = self.bump()? else {
                return Ok(TokenKind::Error("unterminated string".into()));
            };
            let (b, escaped) = match b {
                b'"' => break,
                b'\\' => match self.bump()? {
                    Some(escaped) => (escaped, true),
                    None => return Ok(TokenKind::Error("unterminated string".into())),
                },
                other => (other, false),
            };
            if !escaped && ((b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r')) || b == 0x7F) {
                dropped = true;
            } else {
                raw.push(b);
            }
        }
        if dropped {
            self.warn(line, col, "non-printing characters dropped from string");
        }
        let text = match String::from_utf8(raw) {
            Ok(text) => text,
            Err(e) => {
                self.warn(line, col, "string is not valid UTF-8");
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        Ok(TokenKind::String(text))
    }
    fn lex_symbol(&mut self, line: usize, col: usize) -> io::Result<TokenKind> {
        self.bump()?;
        let mut raw = Vec::new();
        loop {
            match self.peek_byte()? {
                None | Some(b'\n') | Some(b'\r') => {
                    return Ok(TokenKind::Error("unterminated symbol".into()));
                }
                Some(b'|') => {
                    self.bump()?;
                    break;
                }
                Some(b'\\') => {
                    self.bump()?;
                    match self.peek_byte()? {
                        None | Some(b'\n') | Some(b'\r') => {
                            return Ok(TokenKind::Error("unterminated symbol".into()));
                        }
                        Some(b) => {
                            self.bump()?;
                            raw.push(b);
                        }
                    }
                }
                Some(b) => {
                    self.bump()?;
                    raw.push(b);
                }
            }
        }
        let name = String::from_utf8_lossy(&raw).into_owned();
        let trimmed = name.trim();
        if trimmed.len() != name.len() {
            self.warn(line, col, format!("blanks trimmed from symbol |{name}|"));
        }
        if trimmed.is_empty() {
            return Ok(TokenKind::Error("empty symbol".into()));
        }
        Ok(TokenKind::Symbol(trimmed.to_owned()))
    }
    fn lex_atom(&mut self) -> io::Result<TokenKind> {
        let mut raw = Vec::new();
        while let Some(b) = self.peek_byte()? {
            if is_delimiter(b) || !b.is_ascii_graphic() {
                break;
            }
            self.bump()?;
            raw.push(b);
        }
        let text = String::from_utf8_lossy(&raw).into_owned();
        Ok(classify(text))
    }
}

fn classify(text: String) -> TokenKind {
    if INTEGER.is_match(&text) {
        return match text.parse::<i64>() {
            Ok(i) => TokenKind::Int(i),
            Err(_) => TokenKind::Error(format!("integer {text} out of range")),
        };
    }
    if REAL.is_match(&text) {
        return match text.parse::<f64>() {
            Ok(f) if f.is_finite() => TokenKind::Float(f),
            _ => TokenKind::Error(format!("float {text} out of range")),
        };
    }
    let bytes = text.as_bytes();
    let numeric_start = match bytes {
        [b'+' | b'-', second, ..] => second.is_ascii_digit() || *second == b'.',
        [first, ..] => first.is_ascii_digit(),
        [] => false,
    };
    if numeric_start && !CLOCK.is_match(&text) {
        return TokenKind::Error(format!("malformed number {text}"));
    }
    match text.as_str() {
        "TRUE" | "true" => TokenKind::Bool(true),
        "FALSE" | "false" => TokenKind::Bool(false),
        _ if text.len() > 1 && text.ends_with('>') && !text.starts_with('<') => {
            TokenKind::Label(text)
        }
        _ => TokenKind::Atom(text),
    }
}
