//! Name and string grammars shared by formal arguments, vocabulary elements
//! and data values.
//!
//! The building block is the set of graphic ASCII characters (`0x21..=0x7E`)
//! minus `(`, `)`, `<`, `>`, `,` and `"`.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{CodingDbError, Result};

const GRAPHIC: &str = r"[\x21\x23-\x27\x2A\x2B\x2D-\x3B\x3D\x3F-\x7E]";

lazy_static! {
    static ref FARG_NAME: Regex = Regex::new(&format!(r"^<{GRAPHIC}+>$")).unwrap();
    static ref NOMINAL: Regex =
        Regex::new(&format!(r"^{GRAPHIC}(?:(?:{GRAPHIC}| )*{GRAPHIC})?$")).unwrap();
    static ref PRED_NAME: Regex = Regex::new(&format!(r"^{GRAPHIC}+$")).unwrap();
    static ref QUOTE_STRING: Regex = Regex::new(r#"^[\x20\x21\x23-\x7E]*$"#).unwrap();
}

pub fn is_valid_farg_name(name: &str) -> bool {
    FARG_NAME.is_match(name)
}

/// Nominals may contain single blanks between graphic characters, but never
/// start or end with one.
pub fn is_valid_nominal(value: &str) -> bool {
    NOMINAL.is_match(value)
}

pub fn is_valid_pred_name(name: &str) -> bool {
    PRED_NAME.is_match(name)
}

/// Column (spreadsheet variable) names follow the nominal grammar.
pub fn is_valid_column_name(name: &str) -> bool {
    NOMINAL.is_match(name)
}

pub fn is_valid_quote_string(value: &str) -> bool {
    QUOTE_STRING.is_match(value)
}

/// Text is free form within Latin-1, apart from the backspace character.
pub fn is_valid_text(value: &str) -> bool {
    value.chars().all(|ch| ch != '\u{8}' && u32::from(ch) <= 0xFF)
}

pub fn check_farg_name(name: &str) -> Result<()> {
    if is_valid_farg_name(name) {
        Ok(())
    } else {
        Err(CodingDbError::InvalidName(name.to_owned()))
    }
}

pub fn check_pred_name(name: &str) -> Result<()> {
    if is_valid_pred_name(name) {
        Ok(())
    } else {
        Err(CodingDbError::InvalidName(name.to_owned()))
    }
}

pub fn check_column_name(name: &str) -> Result<()> {
    if is_valid_column_name(name) {
        Ok(())
    } else {
        Err(CodingDbError::InvalidName(name.to_owned()))
    }
}
