//! Codingdb – the core of a behavioral-coding database: a typed vocabulary of
//! predicates and column templates, spreadsheet columns of time-stamped cells
//! and a reader/writer for the MacSHAPA open database (ODB) text format.
//!
//! Everything that lives in a database is an *entity* with a database-unique
//! id:
//! * A [`formal_arg::FormalArgument`] is a typed, named parameter slot
//!   (`<name>`), optionally narrowed to a value range or an approved set.
//! * A [`vocab::VocabElement`] is a predicate or matrix (column template)
//!   definition owning an ordered formal argument list.
//! * A [`datavalue::DataValue`] is one argument value, bound to a formal
//!   argument whose constraints it enforces on every assignment.
//! * A [`cell::DataColumn`] holds [`cell::DataCell`]s, each carrying an
//!   onset, an offset and a [`datavalue::Matrix`] of values.
//!
//! The [`database::Database`] owns all of them through its
//! [`registry::Registry`] and keeps cell values in step when a vocabulary
//! element or formal argument changes.
//!
//! ## Modules
//! * [`registry`] – Id issuing and the id -> entity map.
//! * [`grammar`] – Name and string validity checks.
//! * [`timestamp`] – Tick based time stamps.
//! * [`formal_arg`] – Formal arguments, their types and range constraints.
//! * [`vocab`] – Predicate and matrix vocabulary elements.
//! * [`datavalue`] – The data value hierarchy plus predicates and matrices.
//! * [`cell`] – Columns and cells.
//! * [`database`] – The owning database and its change propagation.
//! * [`odb`] – Lexer, error-tolerant reader and dump of the ODB format.
//! * [`settings`] – Reader settings from a file and the environment.
//!
//! ## Quick Start
//! ```
//! use codingdb::odb::OdbReader;
//!
//! let source = "(setf macshapa-db '((HEADER> ((NAME> \"demo\"))) (USER> ())))";
//! let mut listing = Vec::new();
//! let mut errors = Vec::new();
//! let mut reader = OdbReader::new(source.as_bytes(), &mut listing, &mut errors);
//! let db = reader.read_db().unwrap();
//! assert_eq!(db.name(), "demo");
//! assert_eq!(reader.error_count(), 0);
//!
//! let mut dump = Vec::new();
//! db.to_modb_file(&mut dump, "\n").unwrap();
//! assert!(String::from_utf8(dump).unwrap().contains("( NAME> \"demo\" )"));
//! ```

pub mod cell;
pub mod database;
pub mod datavalue;
pub mod error;
pub mod formal_arg;
pub mod grammar;
pub mod odb;
pub mod registry;
pub mod settings;
pub mod timestamp;
pub mod vocab;

pub use database::Database;
pub use error::{CodingDbError, Result};
