use std::path::Path;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{CodingDbError, Result};
use crate::timestamp::DEFAULT_TPS;

pub const ENV_PREFIX: &str = "CODINGDB";

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Newline {
    Lf,
    Cr,
    CrLf,
}

impl Newline {
    pub fn as_str(&self) -> &'static str {
        match self {
            Newline::Lf => "\n",
            Newline::Cr => "\r",
            Newline::CrLf => "\r\n",
        }
    }
}

/// Settings for reading and dumping open database files.
#[derive(Clone, PartialEq, Debug, Deserialize)]
#[serde(default)]
pub struct ReaderSettings {
    /// Errors tolerated before a read is aborted.
    pub max_errors: u32,
    pub max_warnings: u32,
    /// Keep scanning after a malformed token instead of aborting.
    pub continue_on_error: bool,
    /// Echo every token to the listing stream.
    pub list_tokens: bool,
    pub newline: Newline,
    pub ticks_per_second: u32,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            max_errors: 1,
            max_warnings: 1,
            continue_on_error: false,
            list_tokens: false,
            newline: Newline::Lf,
            ticks_per_second: DEFAULT_TPS,
        }
    }
}

impl ReaderSettings {
    /// Layers built-in defaults, an optional settings file (format picked by
    /// extension) and `CODINGDB_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Self::default();
        let mut builder = Config::builder()
            .set_default("max_errors", i64::from(defaults.max_errors))?
            .set_default("max_warnings", i64::from(defaults.max_warnings))?
            .set_default("continue_on_error", defaults.continue_on_error)?
            .set_default("list_tokens", defaults.list_tokens)?
            .set_default("newline", "lf")?
            .set_default("ticks_per_second", i64::from(defaults.ticks_per_second))?;
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        let settings: Self = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }
    pub fn validate(&self) -> Result<()> {
        if self.max_errors == 0 || self.max_warnings == 0 {
            return Err(CodingDbError::Config(
                "max_errors and max_warnings must be at least 1".into(),
            ));
        }
        if self.ticks_per_second == 0 {
            return Err(CodingDbError::Config(
                "ticks_per_second must be positive".into(),
            ));
        }
        Ok(())
    }
}
