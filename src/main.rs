//! `codingdb <input.odb> [dump.odb]`
//!
//! Reads an open database file, writing the listing to stdout and the error
//! log to stderr, and optionally dumps what was read. Settings come from the
//! file named by `CODINGDB_SETTINGS` and from `CODINGDB_*` variables.

use std::env;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;

use codingdb::odb::{OdbReader, ReaderState};
use codingdb::settings::ReaderSettings;
use codingdb::Result;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn run(input: PathBuf, dump: Option<PathBuf>) -> Result<bool> {
    let settings_path = env::var_os("CODINGDB_SETTINGS").map(PathBuf::from);
    let settings = ReaderSettings::load(settings_path.as_deref())?;
    info!(?settings, "settings loaded");

    let source = File::open(&input)?;
    let stdout = io::stdout();
    let stderr = io::stderr();
    let mut reader = OdbReader::with_settings(source, stdout.lock(), stderr.lock(), &settings);
    let db = reader.read_db()?;
    let complete = reader.state() == ReaderState::Done;

    if let Some(path) = dump {
        let mut out = BufWriter::new(File::create(&path)?);
        db.to_modb_file(&mut out, settings.newline.as_str())?;
        info!(path = %path.display(), "dump written");
    }
    Ok(complete)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let mut args = env::args_os().skip(1).map(PathBuf::from);
    let Some(input) = args.next() else {
        eprintln!("usage: codingdb <input.odb> [dump.odb]");
        return ExitCode::from(2);
    };
    match run(input, args.next()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(%e, "read failed");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
