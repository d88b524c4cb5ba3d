//! The MacSHAPA open database (ODB) text format: tokens, the lexer, the
//! error-tolerant reader, the `toMODBFile` style dump and the parser for
//! canonical data value strings.

pub mod dbstring;
pub mod diagnostics;
pub mod lexer;
pub mod reader;
pub mod token;
mod writer;

pub use dbstring::parse_data_value;
pub use diagnostics::Diagnostics;
pub use lexer::{LexWarning, Lexer};
pub use reader::{OdbReader, ReaderState};
pub use token::{Token, TokenKind};
