//! Dumps a database in the MacSHAPA open database layout that
//! [`crate::odb::OdbReader`] reads. Reading a dump and dumping the result
//! again gives back the same text.

use std::collections::BTreeSet;
use std::fmt::Display;
use std::io::Write;

use tracing::info;

use crate::database::Database;
use crate::datavalue::{needs_escape, symbol, DataValue, Value};
use crate::error::Result;
use crate::registry::Id;
use crate::vocab::{MatrixType, VocabElement};

const INDENT: &str = "  ";

struct Emitter<'a, W: Write> {
    out: &'a mut W,
    newline: &'a str,
}

impl<W: Write> Emitter<'_, W> {
    fn line(&mut self, level: usize, text: impl Display) -> Result<()> {
        write!(self.out, "{}{}{}", INDENT.repeat(level), text, self.newline)?;
        Ok(())
    }
    /// `( LABEL>` then `(` and the body, closed at the same level.
    fn section<F>(&mut self, level: usize, label: &str, body: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.line(level, format!("( {label}"))?;
        self.line(level + 1, "(")?;
        body(self)?;
        self.line(level + 1, ")")?;
        self.line(level, ")")
    }
}

fn flag(b: bool) -> &'static str {
    if b { "TRUE" } else { "FALSE" }
}

/// Double-quoted string; `\`, `"`, `'` and control characters are escaped.
fn modb_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        if matches!(ch, '\\' | '"' | '\'') || needs_escape(ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

fn symbols<'a>(names: impl Iterator<Item = &'a str>) -> String {
    let names: Vec<String> = names.map(symbol).collect();
    if names.is_empty() {
        "( )".into()
    } else {
        format!("( {} )", names.join(" "))
    }
}

// variable length argument lists leave out trailing arguments nobody filled in
fn written_args(args: &[DataValue], var_len: bool) -> &[DataValue] {
    if !var_len {
        return args;
    }
    let keep = args
        .iter()
        .rposition(|arg| !matches!(arg.value(), Value::Undefined(_)))
        .map_or(0, |i| i + 1);
    &args[..keep]
}

impl Database {
    /// Writes the whole database, ending every line with `newline`.
    pub fn to_modb_file<W: Write>(&self, out: &mut W, newline: &str) -> Result<()> {
        let mut w = Emitter { out, newline };
        w.line(0, "; MacSHAPA Open Database")?;
        w.line(0, "( setf macshapa-db")?;
        w.line(1, "'(")?;
        self.write_header(&mut w, 2)?;
        w.section(2, "USER>", |w| {
            self.write_predicates(w, 4)?;
            self.write_declarations(w, 4)?;
            self.write_definitions(w, 4)
        })?;
        w.section(2, "QUERY>", |_| Ok(()))?;
        self.write_system(&mut w, 2)?;
        w.line(1, ")")?;
        w.line(0, ")")?;
        w.out.flush()?;
        info!(name = %self.name(), columns = self.columns().len(), "wrote open database");
        Ok(())
    }

    fn write_header<W: Write>(&self, w: &mut Emitter<'_, W>, level: usize) -> Result<()> {
        w.section(level, "HEADER>", |w| {
            let inner = level + 2;
            w.line(inner, format!("( NAME> {} )", modb_string(self.name())))?;
            w.line(inner, "( VERSION> 1 )")?;
            w.line(inner, format!("( DEBUG-LEVEL> {} )", self.debug_level()))?;
            w.line(inner, format!("( MAX-ERRORS> {} )", self.max_errors()))?;
            w.line(inner, format!("( MAX-WARNINGS> {} )", self.max_warnings()))
        })
    }

    fn write_predicates<W: Write>(&self, w: &mut Emitter<'_, W>, level: usize) -> Result<()> {
        w.section(level, "PREDICATE-DEFINITIONS>", |w| {
            for pve in self.predicates() {
                w.line(
                    level + 2,
                    format!(
                        "( {} ( ( VARIABLE-LENGTH> {} ) ( FORMAL-ARG-LIST> {} ) ) )",
                        symbol(pve.name()),
                        flag(pve.var_len()),
                        symbols(pve.fargs().iter().map(|f| f.name()))
                    ),
                )?;
            }
            Ok(())
        })
    }

    fn write_declarations<W: Write>(&self, w: &mut Emitter<'_, W>, level: usize) -> Result<()> {
        w.section(level, "SPREADSHEET-VARIABLE-DECLARATIONS>", |w| {
            let item = level + 2;
            for column in self.columns() {
                let mve = self.vocab_element(column.mve_id())?;
                let Some(matrix_type) = mve.matrix_type() else {
                    continue;
                };
                w.line(item, format!("( {}", symbol(column.name())))?;
                w.line(item + 1, "(")?;
                w.line(item + 2, format!("( TYPE> {} )", matrix_type.tag()))?;
                w.line(item + 2, format!("( VARIABLE-LENGTH> {} )", flag(mve.var_len())))?;
                w.line(
                    item + 2,
                    format!(
                        "( FORMAL-ARG-LIST> {} )",
                        symbols(mve.fargs().iter().map(|f| f.name()))
                    ),
                )?;
                w.line(item + 2, format!("( COLUMN-WIDTH> {} )", column.width()))?;
                w.line(item + 1, ")")?;
                w.line(item, ")")?;
            }
            Ok(())
        })
    }

    fn write_definitions<W: Write>(&self, w: &mut Emitter<'_, W>, level: usize) -> Result<()> {
        w.section(level, "SPREADSHEET-VARIABLE-DEFINITIONS>", |w| {
            let item = level + 2;
            for column in self.columns() {
                let mve = self.vocab_element(column.mve_id())?;
                w.line(item, format!("( {}", symbol(column.name())))?;
                w.line(item + 1, "(")?;
                w.section(item + 2, "CELLS>", |w| {
                    for cell in self.cells(column.id())? {
                        let at = item + 4;
                        w.line(at, "(")?;
                        w.line(at + 1, format!("( ONSET> {} )", cell.onset().ticks()))?;
                        w.line(at + 1, format!("( OFFSET> {} )", cell.offset().ticks()))?;
                        for (farg, arg) in mve.fargs().iter().zip(cell.value().args()) {
                            w.line(
                                at + 1,
                                format!("( {} {} )", symbol(farg.name()), self.modb_value(arg)),
                            )?;
                        }
                        w.line(at, ")")?;
                    }
                    Ok(())
                })?;
                if matches!(
                    mve.matrix_type(),
                    Some(MatrixType::Matrix | MatrixType::Predicate)
                ) {
                    let used = self.predicates_used(column.id())?;
                    let names: Vec<&str> = used.iter().map(|ve| ve.name()).collect();
                    w.line(
                        item + 2,
                        format!("( VOCAB> {} )", symbols(names.into_iter())),
                    )?;
                }
                w.line(item + 1, ")")?;
                w.line(item, ")")?;
            }
            Ok(())
        })
    }

    fn write_system<W: Write>(&self, w: &mut Emitter<'_, W>, level: usize) -> Result<()> {
        w.section(level, "SYSTEM>", |w| {
            w.section(level + 2, "SHAPA-PANE-VARS>", |w| {
                for column in self.columns().into_iter().filter(|c| !c.hidden()) {
                    w.line(level + 4, symbol(column.name()))?;
                }
                Ok(())
            })?;
            w.line(level + 2, "( GROUPS> ( ) )")?;
            w.line(level + 2, "( ALIGNMENTS> ( ) )")?;
            w.line(level + 2, "( IMPORT-FORMAT-LIST> ( ) )")
        })
    }

    /// Predicates referenced anywhere in the cells of a column, by id.
    fn predicates_used(&self, column_id: Id) -> Result<Vec<&VocabElement>> {
        let mut ids = BTreeSet::new();
        for cell in self.cells(column_id)? {
            for arg in cell.value().args() {
                arg.walk(&mut |dv| {
                    if let Value::Predicate(Some(p)) = dv.value() {
                        ids.insert(p.pve_id());
                    }
                });
            }
        }
        ids.into_iter().map(|id| self.vocab_element(id)).collect()
    }

    /// A value as it appears in a cell or predicate argument list.
    pub fn modb_value(&self, dv: &DataValue) -> String {
        match dv.value() {
            Value::Float(v) => format!("{v:.6}"),
            Value::Integer(v) => v.to_string(),
            Value::TimeStamp(ts) => format!("( TIME> {} )", ts.ticks()),
            Value::Nominal(Some(s)) => symbol(s),
            Value::QuoteString(Some(s)) | Value::Text(Some(s)) => modb_string(s),
            Value::Nominal(None) | Value::QuoteString(None) | Value::Text(None) => self
                .formal_arg(dv.farg_id())
                .map(|farg| symbol(farg.name()))
                .unwrap_or_else(|_| symbol("<val>")),
            Value::Undefined(name) => symbol(name),
            Value::Predicate(None) | Value::ColPred(None) => "()".into(),
            Value::Predicate(Some(p)) => self.modb_call(p.name(), written_args(p.args(), p.var_len())),
            Value::ColPred(Some(cp)) => {
                self.modb_call(cp.name(), written_args(cp.args(), cp.var_len()))
            }
        }
    }

    fn modb_call(&self, name: &str, args: &[DataValue]) -> String {
        let mut s = format!("( {}", symbol(name));
        for arg in args {
            s.push(' ');
            s += &self.modb_value(arg);
        }
        s += " )";
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_escape_quotes_and_backslashes() {
        assert_eq!(modb_string(r#"it's "x" \ y"#), r#""it\'s \"x\" \\ y""#);
    }

    #[test]
    fn empty_database_layout() {
        let db = Database::new("empty");
        let mut out = Vec::new();
        db.to_modb_file(&mut out, "\n").unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("; MacSHAPA Open Database\n( setf macshapa-db\n  '(\n"));
        assert!(text.contains("\n        ( NAME> \"empty\" )\n"));
        assert!(text.contains("    ( QUERY>\n      (\n      )\n    )\n"));
        assert!(text.ends_with("  )\n)\n"));
    }
}
