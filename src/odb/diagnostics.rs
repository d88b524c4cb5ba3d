use std::io::{self, Write};

use tracing::warn;

/// Error and warning bookkeeping of one read. A count that goes past its
/// ceiling writes a fatal line instead of the entry and marks the read
/// aborted, so the number of ERROR (WARNING) lines written never exceeds
/// the ceiling.
#[derive(Clone, Debug)]
pub struct Diagnostics {
    errors: u32,
    warnings: u32,
    max_errors: u32,
    max_warnings: u32,
    aborted: bool,
}

impl Diagnostics {
    pub fn new(max_errors: u32, max_warnings: u32) -> Self {
        Self {
            errors: 0,
            warnings: 0,
            max_errors,
            max_warnings,
            aborted: false,
        }
    }
    pub fn errors(&self) -> u32 {
        self.errors
    }
    pub fn warnings(&self) -> u32 {
        self.warnings
    }
    pub fn max_errors(&self) -> u32 {
        self.max_errors
    }
    pub fn max_warnings(&self) -> u32 {
        self.max_warnings
    }
    pub fn aborted(&self) -> bool {
        self.aborted
    }
    pub(crate) fn set_max_errors(&mut self, max: u32) {
        self.max_errors = max;
    }
    pub(crate) fn set_max_warnings(&mut self, max: u32) {
        self.max_warnings = max;
    }
    /// Records an error. Returns false once the read has to stop.
    pub fn error<W: Write>(
        &mut self,
        out: &mut W,
        line: usize,
        col: usize,
        message: &str,
    ) -> io::Result<bool> {
        if self.aborted {
            return Ok(false);
        }
        self.errors += 1;
        if self.errors > self.max_errors {
            self.abort(out, "error", self.max_errors)?;
            return Ok(false);
        }
        writeln!(out, "ERROR (line {line}, col {col}): {message}")?;
        Ok(true)
    }
    pub fn warning<W: Write>(
        &mut self,
        out: &mut W,
        line: usize,
        col: usize,
        message: &str,
    ) -> io::Result<bool> {
        if self.aborted {
            return Ok(false);
        }
        self.warnings += 1;
        if self.warnings > self.max_warnings {
            self.abort(out, "warning", self.max_warnings)?;
            return Ok(false);
        }
        writeln!(out, "WARNING (line {line}, col {col}): {message}")?;
        Ok(true)
    }
    fn abort<W: Write>(&mut self, out: &mut W, what: &str, limit: u32) -> io::Result<()> {
        self.aborted = true;
        warn!(limit, "{what} limit exceeded, read aborted");
        writeln!(out, "FATAL: {what} limit of {limit} exceeded, read aborted")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceiling_caps_the_emitted_lines() {
        let mut out = Vec::new();
        let mut diag = Diagnostics::new(2, 5);
        assert!(diag.error(&mut out, 1, 1, "one").unwrap());
        assert!(diag.warning(&mut out, 1, 2, "careful").unwrap());
        assert!(diag.error(&mut out, 2, 1, "two").unwrap());
        assert!(!diag.error(&mut out, 3, 1, "three").unwrap());
        assert!(!diag.warning(&mut out, 4, 1, "late").unwrap());
        assert!(diag.aborted());
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "ERROR (line 1, col 1): one\n\
             WARNING (line 1, col 2): careful\n\
             ERROR (line 2, col 1): two\n\
             FATAL: error limit of 2 exceeded, read aborted\n"
        );
    }
}
