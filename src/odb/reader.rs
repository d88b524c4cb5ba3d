//! Recursive-descent reader for MacSHAPA open database files.
//!
//! Input problems never surface as `Err`. They are written to the error
//! stream and counted against the error and warning ceilings; the reader
//! then skips to the end of the list it was in and carries on. Only I/O
//! failures (and broken internal invariants) are returned as errors. Every
//! entity is registered with the database as soon as it has been read, so a
//! read that aborts still hands back everything up to that point.

use std::io::{self, Read, Write};
use std::mem;

use tracing::{debug, info};

use crate::database::Database;
use crate::datavalue::{ColPred, DataValue, Predicate, Value};
use crate::error::{CodingDbError, Result};
use crate::formal_arg::{FargType, FormalArgument};
use crate::grammar::is_valid_farg_name;
use crate::odb::diagnostics::Diagnostics;
use crate::odb::lexer::Lexer;
use crate::odb::token::{Token, TokenKind};
use crate::registry::Id;
use crate::settings::ReaderSettings;
use crate::timestamp::TimeStamp;
use crate::vocab::{MatrixType, VocabElement};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ReaderState {
    Start,
    ReadingVocabSection,
    ReadingDataSection,
    Done,
    Aborted,
}

// why a parse function stopped early
enum Halt {
    Aborted,
    Failed(CodingDbError),
}

type Step<T> = std::result::Result<T, Halt>;

impl From<io::Error> for Halt {
    fn from(e: io::Error) -> Self {
        Halt::Failed(e.into())
    }
}
impl From<CodingDbError> for Halt {
    fn from(e: CodingDbError) -> Self {
        Halt::Failed(e)
    }
}

type Named = (String, usize, usize);

fn fresh_db(tps: u32) -> Database {
    Database::with_tps("", tps).unwrap_or_else(|_| Database::new(""))
}

fn count(value: i64, min: u32) -> Option<u32> {
    u32::try_from(value).ok().filter(|n| *n >= min)
}

pub struct OdbReader<R: Read, L: Write, E: Write> {
    lexer: Lexer<R>,
    listing: L,
    errors: E,
    diag: Diagnostics,
    continue_on_error: bool,
    list_tokens: bool,
    abort_scan: bool,
    state: ReaderState,
    peeked: Option<Token>,
    // position of the token consumed last
    last: (usize, usize),
    tps: u32,
    db: Database,
}

impl<R: Read, L: Write, E: Write> OdbReader<R, L, E> {
    pub fn new(input: R, listing: L, errors: E) -> Self {
        Self::with_settings(input, listing, errors, &ReaderSettings::default())
    }
    pub fn with_settings(input: R, listing: L, errors: E, settings: &ReaderSettings) -> Self {
        Self {
            lexer: Lexer::new(input),
            listing,
            errors,
            diag: Diagnostics::new(settings.max_errors, settings.max_warnings),
            continue_on_error: settings.continue_on_error,
            list_tokens: settings.list_tokens,
            abort_scan: false,
            state: ReaderState::Start,
            peeked: None,
            last: (1, 1),
            tps: settings.ticks_per_second,
            db: fresh_db(settings.ticks_per_second),
        }
    }
    pub fn set_max_errors(&mut self, max: u32) {
        self.diag.set_max_errors(max);
    }
    pub fn set_max_warnings(&mut self, max: u32) {
        self.diag.set_max_warnings(max);
    }
    pub fn set_continue_on_error(&mut self, on: bool) {
        self.continue_on_error = on;
    }
    pub fn set_list_tokens(&mut self, on: bool) {
        self.list_tokens = on;
    }
    /// Set when a malformed token stopped the scan.
    pub fn abort_scan(&self) -> bool {
        self.abort_scan
    }
    pub fn reset_abort_scan(&mut self) {
        self.abort_scan = false;
    }
    pub fn state(&self) -> ReaderState {
        self.state
    }
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diag
    }
    pub fn error_count(&self) -> u32 {
        self.diag.errors()
    }
    pub fn warning_count(&self) -> u32 {
        self.diag.warnings()
    }
    pub fn into_streams(self) -> (L, E) {
        (self.listing, self.errors)
    }

    /// Scans one token. Lexer warnings and malformed tokens are reported to
    /// the error stream and counted here.
    pub fn get_next_token(&mut self) -> Result<Token> {
        let token = self.lexer.next_token()?;
        for w in self.lexer.take_warnings() {
            self.diag.warning(&mut self.errors, w.line, w.col, &w.message)?;
        }
        if let TokenKind::Error(message) = &token.kind {
            self.diag
                .error(&mut self.errors, token.line, token.col, message)?;
            if !self.continue_on_error {
                self.abort_scan = true;
            }
        }
        if self.diag.aborted() {
            self.state = ReaderState::Aborted;
        }
        if self.list_tokens {
            writeln!(self.listing, "{token}")?;
        }
        Ok(token)
    }

    /// Reads a whole database. The result is partial when the read was
    /// aborted, which [`OdbReader::state`] reports.
    pub fn read_db(&mut self) -> Result<Database> {
        info!("reading open database");
        let state = match self.parse_database() {
            Ok(()) => ReaderState::Done,
            Err(Halt::Aborted) => ReaderState::Aborted,
            Err(Halt::Failed(e)) => {
                self.state = ReaderState::Aborted;
                return Err(e);
            }
        };
        self.state = state;
        let outcome = match state {
            ReaderState::Done => "read complete",
            _ => "read aborted",
        };
        writeln!(
            self.listing,
            "{outcome}: {} error(s), {} warning(s)",
            self.diag.errors(),
            self.diag.warnings()
        )?;
        self.listing.flush()?;
        self.errors.flush()?;
        info!(
            errors = self.diag.errors(),
            warnings = self.diag.warnings(),
            "{outcome}"
        );
        Ok(mem::replace(&mut self.db, fresh_db(self.tps)))
    }

    fn enter(&mut self, state: ReaderState) {
        if self.state != state {
            debug!(?state, "reader state");
            self.state = state;
        }
    }

    // ------------- tokens -------------
    fn next(&mut self) -> Step<Token> {
        loop {
            let token = match self.peeked.take() {
                Some(token) => token,
                None => self.get_next_token()?,
            };
            if self.diag.aborted() || self.abort_scan {
                return Err(Halt::Aborted);
            }
            // already reported by get_next_token
            if matches!(token.kind, TokenKind::Error(_)) {
                continue;
            }
            self.last = (token.line, token.col);
            return Ok(token);
        }
    }
    fn push_back(&mut self, kind: TokenKind, line: usize, col: usize) {
        self.peeked = Some(Token { kind, line, col });
    }
    fn peek_kind(&mut self) -> Step<TokenKind> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.next()?,
        };
        let kind = token.kind.clone();
        self.peeked = Some(token);
        Ok(kind)
    }

    // ------------- diagnostics -------------
    fn error_at(&mut self, line: usize, col: usize, message: impl AsRef<str>) -> Step<()> {
        if self
            .diag
            .error(&mut self.errors, line, col, message.as_ref())?
        {
            Ok(())
        } else {
            Err(Halt::Aborted)
        }
    }
    fn error_here(&mut self, message: impl AsRef<str>) -> Step<()> {
        let (line, col) = self.last;
        self.error_at(line, col, message)
    }
    fn warning_at(&mut self, line: usize, col: usize, message: impl AsRef<str>) -> Step<()> {
        if self
            .diag
            .warning(&mut self.errors, line, col, message.as_ref())?
        {
            Ok(())
        } else {
            Err(Halt::Aborted)
        }
    }
    fn unexpected_eof<T>(&mut self, line: usize, col: usize) -> Step<T> {
        self.error_at(line, col, "unexpected end of file")?;
        Err(Halt::Aborted)
    }
    fn malformed<T>(&mut self, token: Token, expected: &str) -> Step<T> {
        self.error_at(
            token.line,
            token.col,
            format!("expected {expected}, found {}", token.kind.describe()),
        )?;
        Err(Halt::Aborted)
    }

    // ------------- list structure -------------
    /// Skips to and consumes the `)` closing the list whose `(` was read
    /// last.
    fn skip_rest_of_list(&mut self) -> Step<()> {
        let mut depth = 0usize;
        loop {
            let token = self.next()?;
            match token.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen if depth == 0 => return Ok(()),
                TokenKind::RParen => depth -= 1,
                TokenKind::Eof => return self.unexpected_eof(token.line, token.col),
                _ => (),
            }
        }
    }
    /// Consumes the `(` opening a list. Anything else is reported and left
    /// in place.
    fn open_list(&mut self, what: &str) -> Step<bool> {
        let token = self.next()?;
        if token.kind == TokenKind::LParen {
            return Ok(true);
        }
        self.error_at(
            token.line,
            token.col,
            format!("expected '(' opening {what}, found {}", token.kind.describe()),
        )?;
        self.peeked = Some(token);
        Ok(false)
    }
    /// Consumes the `)` closing a list, skipping anything left before it.
    fn close_list(&mut self, what: &str) -> Step<()> {
        let token = self.next()?;
        match token.kind {
            TokenKind::RParen => Ok(()),
            TokenKind::Eof => self.unexpected_eof(token.line, token.col),
            kind => {
                self.error_at(
                    token.line,
                    token.col,
                    format!("expected ')' closing {what}, found {}", kind.describe()),
                )?;
                self.push_back(kind, token.line, token.col);
                self.skip_rest_of_list()
            }
        }
    }
    /// Reads list items up to and including the closing `)`. Each item
    /// starts with `(`; `item` runs after it and consumes the item's `)`.
    fn list_body<F>(&mut self, what: &str, mut item: F) -> Step<()>
    where
        F: FnMut(&mut Self) -> Step<()>,
    {
        loop {
            let token = self.next()?;
            match token.kind {
                TokenKind::RParen => return Ok(()),
                TokenKind::LParen => item(self)?,
                TokenKind::Eof => return self.unexpected_eof(token.line, token.col),
                other => self.error_at(
                    token.line,
                    token.col,
                    format!("unexpected {} in {what}", other.describe()),
                )?,
            }
        }
    }
    /// `( items ) )` after a label or name: the item list, then the `)`
    /// closing the enclosing item.
    fn labelled_list<F>(&mut self, label: &str, item: F) -> Step<()>
    where
        F: FnMut(&mut Self) -> Step<()>,
    {
        if !self.open_list(label)? {
            return self.skip_rest_of_list();
        }
        self.list_body(label, item)?;
        self.close_list(label)
    }
    /// `( |a| |b| ) )` after a label.
    fn labelled_symbols(&mut self, label: &str) -> Step<Vec<Named>> {
        let mut names = Vec::new();
        if !self.open_list(label)? {
            self.skip_rest_of_list()?;
            return Ok(names);
        }
        loop {
            let token = self.next()?;
            match token.kind {
                TokenKind::RParen => break,
                TokenKind::Symbol(name) => names.push((name, token.line, token.col)),
                TokenKind::Eof => return self.unexpected_eof(token.line, token.col),
                TokenKind::LParen => {
                    self.error_at(token.line, token.col, format!("unexpected list in {label}"))?;
                    self.skip_rest_of_list()?;
                }
                other => self.error_at(
                    token.line,
                    token.col,
                    format!("expected a symbol in {label}, found {}", other.describe()),
                )?,
            }
        }
        self.close_list(label)?;
        Ok(names)
    }
    /// `value )` after a label.
    fn scalar(&mut self, label: &str) -> Step<Option<Token>> {
        let token = self.next()?;
        match token.kind {
            TokenKind::LParen | TokenKind::RParen | TokenKind::Eof => {
                self.error_at(
                    token.line,
                    token.col,
                    format!("expected a value after {label}, found {}", token.kind.describe()),
                )?;
                self.peeked = Some(token);
                self.skip_rest_of_list()?;
                Ok(None)
            }
            _ => {
                self.close_list(label)?;
                Ok(Some(token))
            }
        }
    }
    fn int_value(&mut self, label: &str) -> Step<Option<i64>> {
        match self.scalar(label)? {
            Some(Token {
                kind: TokenKind::Int(i),
                ..
            }) => Ok(Some(i)),
            Some(token) => {
                self.error_at(
                    token.line,
                    token.col,
                    format!("expected an integer after {label}, found {}", token.kind.describe()),
                )?;
                Ok(None)
            }
            None => Ok(None),
        }
    }
    fn bool_value(&mut self, label: &str) -> Step<Option<bool>> {
        match self.scalar(label)? {
            Some(Token {
                kind: TokenKind::Bool(b),
                ..
            }) => Ok(Some(b)),
            Some(token) => {
                self.error_at(
                    token.line,
                    token.col,
                    format!("expected TRUE or FALSE after {label}, found {}", token.kind.describe()),
                )?;
                Ok(None)
            }
            None => Ok(None),
        }
    }
    /// The label starting an item. On anything else the item is skipped.
    fn item_label(&mut self, context: &str) -> Step<Option<Named>> {
        let token = self.next()?;
        match token.kind {
            TokenKind::Label(label) => Ok(Some((label, token.line, token.col))),
            other => {
                self.error_at(
                    token.line,
                    token.col,
                    format!("expected a label in {context}, found {}", other.describe()),
                )?;
                self.push_back(other, token.line, token.col);
                self.skip_rest_of_list()?;
                Ok(None)
            }
        }
    }
    /// The `|name|` starting an item. On anything else the item is skipped.
    fn item_name(&mut self, context: &str) -> Step<Option<Named>> {
        let token = self.next()?;
        match token.kind {
            TokenKind::Symbol(name) => Ok(Some((name, token.line, token.col))),
            other => {
                self.error_at(
                    token.line,
                    token.col,
                    format!("expected a name in {context}, found {}", other.describe()),
                )?;
                self.push_back(other, token.line, token.col);
                self.skip_rest_of_list()?;
                Ok(None)
            }
        }
    }
    fn unknown_entry(&mut self, label: &str, line: usize, col: usize, context: &str) -> Step<()> {
        self.warning_at(line, col, format!("unknown entry {label} in {context} ignored"))?;
        self.skip_rest_of_list()
    }
    /// Reads and drops the list after a label; non-empty lists are worth a
    /// warning.
    fn discard(&mut self, label: &str, line: usize, col: usize) -> Step<()> {
        if !self.open_list(label)? {
            return self.skip_rest_of_list();
        }
        if self.peek_kind()? == TokenKind::RParen {
            self.next()?;
        } else {
            self.warning_at(line, col, format!("{label} section discarded"))?;
            self.skip_rest_of_list()?;
        }
        self.close_list(label)
    }

    // ------------- database -------------
    fn parse_database(&mut self) -> Step<()> {
        let token = self.next()?;
        if token.kind != TokenKind::LParen {
            return self.malformed(token, "'(' opening the database");
        }
        self.expect_atom("setf")?;
        self.expect_atom("macshapa-db")?;
        let token = self.next()?;
        if token.kind != TokenKind::Quote {
            return self.malformed(token, "a quoted database list");
        }
        let token = self.next()?;
        if token.kind != TokenKind::LParen {
            return self.malformed(token, "'(' opening the database list");
        }
        self.list_body("the database list", |p| p.parse_section())?;
        self.close_list("the database")?;
        let token = self.next()?;
        if token.kind != TokenKind::Eof {
            self.warning_at(token.line, token.col, "text after the end of the database ignored")?;
        }
        Ok(())
    }
    fn expect_atom(&mut self, word: &str) -> Step<()> {
        let token = self.next()?;
        if matches!(&token.kind, TokenKind::Atom(atom) if atom.eq_ignore_ascii_case(word)) {
            Ok(())
        } else {
            self.malformed(token, word)
        }
    }
    fn parse_section(&mut self) -> Step<()> {
        let Some((label, line, col)) = self.item_label("the database list")? else {
            return Ok(());
        };
        info!(section = %label, "reading section");
        match label.as_str() {
            "HEADER>" => self.labelled_list(&label, |p| p.parse_header_item())?,
            "USER>" => self.labelled_list(&label, |p| p.parse_user_item())?,
            "QUERY>" => self.discard(&label, line, col)?,
            "SYSTEM>" => self.parse_system()?,
            _ => {
                self.error_at(line, col, format!("unknown section {label}"))?;
                return self.skip_rest_of_list();
            }
        }
        writeln!(self.listing, "{label} section read")?;
        Ok(())
    }

    // ------------- header -------------
    fn parse_header_item(&mut self) -> Step<()> {
        let Some((label, line, col)) = self.item_label("HEADER>")? else {
            return Ok(());
        };
        if !matches!(
            label.as_str(),
            "NAME>" | "VERSION>" | "DEBUG-LEVEL>" | "MAX-ERRORS>" | "MAX-WARNINGS>"
        ) {
            return self.unknown_entry(&label, line, col, "HEADER>");
        }
        let Some(value) = self.scalar(&label)? else {
            return Ok(());
        };
        let bad = |kind: &TokenKind| format!("bad value {} for {label}", kind.describe());
        match (label.as_str(), &value.kind) {
            ("NAME>", TokenKind::String(name)) => self.db.set_name(name),
            ("VERSION>", TokenKind::Int(1)) => (),
            ("VERSION>", TokenKind::Int(v)) => self.warning_at(
                value.line,
                value.col,
                format!("unknown version {v}, read as version 1"),
            )?,
            ("DEBUG-LEVEL>", TokenKind::Int(v)) => match count(*v, 0) {
                Some(level) => self.db.set_debug_level(level),
                None => self.error_at(value.line, value.col, bad(&value.kind))?,
            },
            ("MAX-ERRORS>", TokenKind::Int(v)) => match count(*v, 1) {
                Some(max) => self.db.set_max_errors(max),
                None => self.error_at(value.line, value.col, bad(&value.kind))?,
            },
            ("MAX-WARNINGS>", TokenKind::Int(v)) => match count(*v, 1) {
                Some(max) => self.db.set_max_warnings(max),
                None => self.error_at(value.line, value.col, bad(&value.kind))?,
            },
            (_, kind) => self.error_at(value.line, value.col, bad(kind))?,
        }
        Ok(())
    }

    // ------------- user section -------------
    fn parse_user_item(&mut self) -> Step<()> {
        let Some((label, line, col)) = self.item_label("USER>")? else {
            return Ok(());
        };
        match label.as_str() {
            "PREDICATE-DEFINITIONS>" => {
                self.enter(ReaderState::ReadingVocabSection);
                self.labelled_list(&label, |p| p.parse_pred_def())
            }
            "SPREADSHEET-VARIABLE-DECLARATIONS>" => {
                self.enter(ReaderState::ReadingVocabSection);
                self.labelled_list(&label, |p| p.parse_col_dec())
            }
            "SPREADSHEET-VARIABLE-DEFINITIONS>" => {
                self.enter(ReaderState::ReadingDataSection);
                self.labelled_list(&label, |p| p.parse_col_def())
            }
            _ => self.unknown_entry(&label, line, col, "USER>"),
        }
    }
    fn parse_pred_def(&mut self) -> Step<()> {
        let Some((name, line, col)) = self.item_name("PREDICATE-DEFINITIONS>")? else {
            return Ok(());
        };
        let mut var_len = false;
        let mut fargs = Vec::new();
        self.labelled_list(&name, |p| {
            let Some((label, line, col)) = p.item_label("a predicate definition")? else {
                return Ok(());
            };
            match label.as_str() {
                "VARIABLE-LENGTH>" => {
                    if let Some(b) = p.bool_value(&label)? {
                        var_len = b;
                    }
                }
                "FORMAL-ARG-LIST>" => fargs = p.labelled_symbols(&label)?,
                _ => p.unknown_entry(&label, line, col, "a predicate definition")?,
            }
            Ok(())
        })?;
        let added = build_predicate(&name, var_len, &fargs)
            .and_then(|pve| self.db.add_vocab_element(pve));
        match added {
            Ok(id) => {
                let pve = self.db.vocab_element(id)?;
                writeln!(self.listing, "predicate {pve} defined")?;
            }
            Err(e) => self.error_at(line, col, format!("predicate {name} not defined: {e}"))?,
        }
        Ok(())
    }
    fn parse_col_dec(&mut self) -> Step<()> {
        let Some((name, line, col)) = self.item_name("SPREADSHEET-VARIABLE-DECLARATIONS>")? else {
            return Ok(());
        };
        let mut matrix_type = None;
        let mut var_len = false;
        let mut fargs = Vec::new();
        let mut width = None;
        self.labelled_list(&name, |p| {
            let Some((label, line, col)) = p.item_label("a column declaration")? else {
                return Ok(());
            };
            match label.as_str() {
                "TYPE>" => match p.scalar(&label)? {
                    Some(Token {
                        kind: TokenKind::Atom(tag),
                        line,
                        col,
                    }) => match MatrixType::from_tag(&tag) {
                        Some(ty) => matrix_type = Some(ty),
                        None => p.error_at(line, col, format!("unknown column type {tag}"))?,
                    },
                    Some(token) => p.error_at(
                        token.line,
                        token.col,
                        format!("expected a type tag, found {}", token.kind.describe()),
                    )?,
                    None => (),
                },
                "VARIABLE-LENGTH>" => {
                    if let Some(b) = p.bool_value(&label)? {
                        var_len = b;
                    }
                }
                "FORMAL-ARG-LIST>" => fargs = p.labelled_symbols(&label)?,
                "COLUMN-WIDTH>" => {
                    if let Some(w) = p.int_value(&label)? {
                        match count(w, 0) {
                            Some(w) => width = Some(w),
                            None => p.error_here(format!("bad column width {w}"))?,
                        }
                    }
                }
                _ => p.unknown_entry(&label, line, col, "a column declaration")?,
            }
            Ok(())
        })?;
        let Some(matrix_type) = matrix_type else {
            return self.error_at(line, col, format!("column {name} has no TYPE>"));
        };
        let added = build_column(&name, matrix_type, var_len, &fargs)
            .and_then(|mve| self.db.add_column(mve));
        match added {
            Ok(column_id) => {
                if let Some(width) = width {
                    self.db.set_column_width(column_id, width)?;
                }
                writeln!(self.listing, "column {name} declared as {matrix_type}")?;
            }
            Err(e) => self.error_at(line, col, format!("column {name} not declared: {e}"))?,
        }
        Ok(())
    }
    fn parse_col_def(&mut self) -> Step<()> {
        let Some((name, line, col)) = self.item_name("SPREADSHEET-VARIABLE-DEFINITIONS>")? else {
            return Ok(());
        };
        let Ok(column_id) = self.db.column_by_name(&name).map(|c| c.id()) else {
            self.error_at(line, col, format!("column {name} was never declared"))?;
            return self.skip_rest_of_list();
        };
        self.labelled_list(&name, |p| {
            let Some((label, line, col)) = p.item_label("a column definition")? else {
                return Ok(());
            };
            match label.as_str() {
                "CELLS>" => p.labelled_list(&label, |p| p.parse_cell(column_id))?,
                "VOCAB>" => {
                    for (used, line, col) in p.labelled_symbols(&label)? {
                        if p.db.vocab_id(&used).is_none() {
                            p.warning_at(
                                line,
                                col,
                                format!("unknown vocab element {used} listed for {name}"),
                            )?;
                        }
                    }
                }
                _ => p.unknown_entry(&label, line, col, "a column definition")?,
            }
            Ok(())
        })
    }
    fn parse_cell(&mut self, column_id: Id) -> Step<()> {
        let (line, col) = self.last;
        let mut matrix = self.db.new_matrix(column_id)?;
        let fargs = self.db.vocab_element(matrix.mve_id())?.fargs().to_vec();
        let tps = self.db.tps();
        let mut onset = TimeStamp::zero(tps);
        let mut offset = TimeStamp::zero(tps);
        self.list_body("a cell", |p| {
            let token = p.next()?;
            match token.kind {
                TokenKind::Label(label) if label == "ONSET>" || label == "OFFSET>" => {
                    if let Some(ticks) = p.int_value(&label)? {
                        match TimeStamp::new(tps, ticks) {
                            Ok(ts) if label == "ONSET>" => onset = ts,
                            Ok(ts) => offset = ts,
                            Err(e) => p.error_here(format!("bad {label} {ticks}: {e}"))?,
                        }
                    }
                }
                TokenKind::Symbol(farg_name) => {
                    let Some(index) = fargs.iter().position(|f| f.name() == farg_name) else {
                        p.error_at(
                            token.line,
                            token.col,
                            format!("no argument {farg_name} in this column"),
                        )?;
                        return p.skip_rest_of_list();
                    };
                    let value = p.parse_value(&fargs[index])?;
                    p.close_list(&farg_name)?;
                    if let Some(value) = value {
                        if let Err(e) = matrix.set_arg(index, value) {
                            p.error_at(token.line, token.col, e.to_string())?;
                        }
                    }
                }
                TokenKind::Eof => return p.unexpected_eof(token.line, token.col),
                other => {
                    p.error_at(
                        token.line,
                        token.col,
                        format!("unexpected {} in a cell", other.describe()),
                    )?;
                    p.push_back(other, token.line, token.col);
                    p.skip_rest_of_list()?;
                }
            }
            Ok(())
        })?;
        match self.db.append_cell(column_id, onset, offset, matrix) {
            Ok(cell_id) => {
                let ord = self.db.cell(cell_id)?.ord();
                let name = self.db.column(column_id)?.name();
                writeln!(self.listing, "cell {ord} of {name} read")?;
            }
            Err(e) => self.error_at(line, col, format!("cell not added: {e}"))?,
        }
        Ok(())
    }

    // ------------- values -------------
    /// Reads one cell or predicate argument. `None` means the value was bad
    /// and has been reported.
    fn parse_value(&mut self, farg: &FormalArgument) -> Step<Option<DataValue>> {
        let token = self.next()?;
        let (line, col) = (token.line, token.col);
        let tps = self.db.tps();
        let value = match token.kind {
            TokenKind::Int(i) if farg.farg_type() == FargType::Float => Value::Float(i as f64),
            TokenKind::Int(i) => Value::Integer(i),
            TokenKind::Float(f) => Value::Float(f),
            TokenKind::String(s) if farg.farg_type() == FargType::Text => Value::Text(Some(s)),
            TokenKind::String(s) => Value::QuoteString(Some(s)),
            // an argument name stands for "no value"
            TokenKind::Symbol(s) if is_valid_farg_name(&s) => {
                return Ok(Some(DataValue::for_farg(farg, tps)));
            }
            TokenKind::Symbol(s) => Value::Nominal(Some(s)),
            TokenKind::LParen => match self.parse_compound(farg)? {
                Some(value) => value,
                None => return Ok(None),
            },
            TokenKind::Eof => return self.unexpected_eof(line, col),
            other => {
                self.error_at(
                    line,
                    col,
                    format!("expected a value for {}, found {}", farg.name(), other.describe()),
                )?;
                if other == TokenKind::RParen {
                    self.push_back(other, line, col);
                }
                return Ok(None);
            }
        };
        let built = DataValue::for_farg_as(farg, value.value_type(), tps).and_then(|mut dv| {
            dv.set(value)?;
            Ok(dv)
        });
        match built {
            Ok(dv) => Ok(Some(dv)),
            Err(e) => {
                self.error_at(line, col, format!("bad value for {}: {e}", farg.name()))?;
                Ok(None)
            }
        }
    }
    /// `()`, `( TIME> n )` or `( |name| args )`, after the `(`.
    fn parse_compound(&mut self, farg: &FormalArgument) -> Step<Option<Value>> {
        let token = self.next()?;
        match token.kind {
            TokenKind::RParen => Ok(Some(match farg.farg_type() {
                FargType::ColPred => Value::ColPred(None),
                _ => Value::Predicate(None),
            })),
            TokenKind::Label(label) if label == "TIME>" => {
                let Some(ticks) = self.int_value(&label)? else {
                    return Ok(None);
                };
                match TimeStamp::new(self.db.tps(), ticks) {
                    Ok(ts) => Ok(Some(Value::TimeStamp(ts))),
                    Err(e) => {
                        self.error_here(format!("bad time {ticks}: {e}"))?;
                        Ok(None)
                    }
                }
            }
            TokenKind::Symbol(name) => self.parse_pred_value(&name, token.line, token.col),
            TokenKind::Eof => self.unexpected_eof(token.line, token.col),
            other => {
                self.error_at(
                    token.line,
                    token.col,
                    format!("expected a predicate or TIME>, found {}", other.describe()),
                )?;
                self.push_back(other, token.line, token.col);
                self.skip_rest_of_list()?;
                Ok(None)
            }
        }
    }
    /// Arguments of a predicate or column predicate, after `( |name|`.
    fn parse_pred_value(&mut self, name: &str, line: usize, col: usize) -> Step<Option<Value>> {
        let Some(ve) = self.db.vocab_element_by_name(name).ok().cloned() else {
            self.error_at(line, col, format!("unknown predicate {name}"))?;
            self.skip_rest_of_list()?;
            return Ok(None);
        };
        let tps = self.db.tps();
        let fargs = if ve.is_predicate() {
            ve.fargs().to_vec()
        } else {
            ve.cp_fargs().to_vec()
        };
        let mut args: Vec<DataValue> = fargs.iter().map(|f| DataValue::for_farg(f, tps)).collect();
        let mut read = 0;
        let mut bad = false;
        loop {
            if self.peek_kind()? == TokenKind::RParen {
                self.next()?;
                break;
            }
            if read == fargs.len() {
                self.error_here(format!("too many arguments for {name}"))?;
                self.skip_rest_of_list()?;
                bad = true;
                break;
            }
            match self.parse_value(&fargs[read])? {
                Some(dv) => args[read] = dv,
                None => bad = true,
            }
            read += 1;
        }
        if read < fargs.len() && !ve.var_len() {
            self.error_at(
                line,
                col,
                format!("{name} takes {} arguments, found {read}", fargs.len()),
            )?;
            return Ok(None);
        }
        if bad {
            return Ok(None);
        }
        Ok(Some(if ve.is_predicate() {
            let mut p = Predicate::for_vocab(&ve, tps);
            p.args = args;
            Value::Predicate(Some(p))
        } else {
            let mut cp = ColPred::for_vocab(&ve, tps);
            cp.args = args;
            Value::ColPred(Some(cp))
        }))
    }

    // ------------- system section -------------
    fn parse_system(&mut self) -> Step<()> {
        let mut visible: Option<Vec<Named>> = None;
        self.labelled_list("SYSTEM>", |p| {
            let Some((label, line, col)) = p.item_label("SYSTEM>")? else {
                return Ok(());
            };
            match label.as_str() {
                "SHAPA-PANE-VARS>" => visible = Some(p.labelled_symbols(&label)?),
                "GROUPS>" | "ALIGNMENTS>" | "IMPORT-FORMAT-LIST>" => p.discard(&label, line, col)?,
                _ => p.unknown_entry(&label, line, col, "SYSTEM>")?,
            }
            Ok(())
        })?;
        match visible {
            Some(visible) => self.apply_pane_vars(&visible),
            None => Ok(()),
        }
    }
    /// Columns missing from the pane list are hidden.
    fn apply_pane_vars(&mut self, visible: &[Named]) -> Step<()> {
        for (name, line, col) in visible {
            if self.db.column_by_name(name).is_err() {
                self.warning_at(*line, *col, format!("unknown column {name} in SHAPA-PANE-VARS>"))?;
            }
        }
        let columns: Vec<(Id, bool)> = self
            .db
            .columns()
            .iter()
            .map(|c| (c.id(), visible.iter().any(|(name, ..)| name == c.name())))
            .collect();
        for (id, shown) in columns {
            self.db.set_column_hidden(id, !shown)?;
        }
        Ok(())
    }
}

fn build_predicate(name: &str, var_len: bool, fargs: &[Named]) -> Result<VocabElement> {
    let mut pve = VocabElement::predicate(name)?;
    for (farg, ..) in fargs {
        pve.append_formal_arg(FormalArgument::new(farg, FargType::Untyped)?)?;
    }
    pve.set_var_len(var_len)?;
    Ok(pve)
}

fn build_column(
    name: &str,
    matrix_type: MatrixType,
    var_len: bool,
    fargs: &[Named],
) -> Result<VocabElement> {
    let mut mve = VocabElement::matrix(name, matrix_type)?;
    match matrix_type.farg_type() {
        Some(ty) => {
            let [(farg, ..)] = fargs else {
                return Err(CodingDbError::InvalidValue(format!(
                    "{matrix_type} columns take exactly one formal argument, found {}",
                    fargs.len()
                )));
            };
            mve.append_formal_arg(FormalArgument::new(farg, ty)?)?;
        }
        None => {
            for (farg, ..) in fargs {
                mve.append_formal_arg(FormalArgument::new(farg, FargType::Untyped)?)?;
            }
        }
    }
    if var_len {
        mve.set_var_len(true)?;
    }
    Ok(mve)
}
