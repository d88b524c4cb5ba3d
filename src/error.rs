use thiserror::Error;

use crate::registry::Id;

#[derive(Error, Debug)]
pub enum CodingDbError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid id: {0}")]
    InvalidId(Id),
    #[error("Id {id} already assigned")]
    IdAlreadyAssigned { id: Id },
    #[error("Id {id} belongs to element {container}")]
    Nested { id: Id, container: Id },
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),
    #[error("Invalid name: {0:?}")]
    InvalidName(String),
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    #[error("Parse error: {message}")]
    Parse {
        message: String,
        line: Option<usize>,
        col: Option<usize>,
    },
    #[error("Internal invariant violated: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, CodingDbError>;

// Helper conversions
impl From<config::ConfigError> for CodingDbError {
    fn from(e: config::ConfigError) -> Self {
        CodingDbError::Config(e.to_string())
    }
}

impl CodingDbError {
    pub fn parse_at(message: impl Into<String>, line: usize, col: usize) -> Self {
        CodingDbError::Parse {
            message: message.into(),
            line: Some(line),
            col: Some(col),
        }
    }
}
