use codingdb::odb::{OdbReader, ReaderState};
use codingdb::settings::ReaderSettings;

struct Outcome {
    state: ReaderState,
    errors: u32,
    listing: String,
    log: String,
    db: codingdb::Database,
}

fn read(source: &str, settings: &ReaderSettings) -> Outcome {
    let mut listing = Vec::new();
    let mut log = Vec::new();
    let mut reader = OdbReader::with_settings(source.as_bytes(), &mut listing, &mut log, settings);
    let db = reader.read_db().unwrap();
    let state = reader.state();
    let errors = reader.error_count();
    drop(reader);
    Outcome {
        state,
        errors,
        listing: String::from_utf8(listing).unwrap(),
        log: String::from_utf8(log).unwrap(),
        db,
    }
}

fn with_limits(max_errors: u32, max_warnings: u32) -> ReaderSettings {
    ReaderSettings {
        max_errors,
        max_warnings,
        ..ReaderSettings::default()
    }
}

const BAD_HEADER: &str = r#"(setf macshapa-db '(
  (HEADER> ((NAME> 1) (DEBUG-LEVEL> "x") (MAX-ERRORS> -1) (VERSION> 1)))
))"#;

#[test]
fn error_lines_never_exceed_the_ceiling() {
    let out = read(BAD_HEADER, &with_limits(2, 5));
    assert_eq!(out.state, ReaderState::Aborted);
    let lines: Vec<&str> = out.log.lines().collect();
    assert_eq!(lines.len(), 3, "{}", out.log);
    assert!(lines[0].starts_with("ERROR (line 2, col "));
    assert!(lines[0].ends_with("bad value integer 1 for NAME>"));
    assert!(lines[1].starts_with("ERROR (line 2, col "));
    assert_eq!(lines[2], "FATAL: error limit of 2 exceeded, read aborted");
    assert!(out.listing.contains("read aborted: "));
    assert_eq!(out.db.name(), "");
}

#[test]
fn errors_below_the_ceiling_are_skipped_over() {
    let out = read(BAD_HEADER, &with_limits(10, 5));
    assert_eq!(out.state, ReaderState::Done);
    assert_eq!(out.errors, 3);
    assert_eq!(out.log.lines().filter(|l| l.starts_with("ERROR")).count(), 3);
    assert!(out.listing.contains("HEADER> section read"));
}

#[test]
fn warnings_have_their_own_ceiling() {
    let source = r#"(setf macshapa-db '(
  (QUERY> ((something)))
  (SYSTEM> ((GROUPS> ((g)))))
))"#;
    let out = read(source, &with_limits(5, 1));
    assert_eq!(out.state, ReaderState::Aborted);
    assert_eq!(
        out.log,
        "WARNING (line 2, col 4): QUERY> section discarded\n\
         FATAL: warning limit of 1 exceeded, read aborted\n"
    );
}

#[test]
fn bad_cells_are_reported_and_reading_goes_on() {
    let source = r#"(setf macshapa-db '(
 (HEADER> ((NAME> "demo")))
 (USER> (
  (SPREADSHEET-VARIABLE-DECLARATIONS> (
   (|n| ((TYPE> <<INTEGER>>) (VARIABLE-LENGTH> FALSE) (FORMAL-ARG-LIST> (|<val>|)) (COLUMN-WIDTH> 100)))
  ))
  (SPREADSHEET-VARIABLE-DEFINITIONS> (
   (|ghost| ((CELLS> ())))
   (|n| ((CELLS> (
     ((ONSET> 0) (OFFSET> 10) (|<val>| "oops"))
     ((ONSET> 10) (OFFSET> 20) (|<val>| 4))
   ))))
  ))
 ))
))"#;
    let out = read(source, &with_limits(10, 10));
    assert_eq!(out.state, ReaderState::Done, "{}", out.log);
    assert_eq!(out.errors, 2, "{}", out.log);
    assert!(out.log.contains("column ghost was never declared"));
    let col = out.db.column_by_name("n").unwrap();
    assert_eq!(col.width(), 100);
    let cells = out.db.cells(col.id()).unwrap();
    assert_eq!(cells.len(), 2);
    assert_eq!(cells[0].value().arg(0).unwrap().as_integer(), Some(0));
    assert_eq!(cells[1].value().arg(0).unwrap().as_integer(), Some(4));
    assert_eq!(cells[1].onset().ticks(), 10);
    assert!(out.listing.contains("column n declared as INTEGER"));
    assert!(out.listing.contains("cell 2 of n read"));
}

const BAD_TOKEN: &str =
    r#"(setf macshapa-db '((HEADER> ((NAME> "x") (DEBUG-LEVEL> 12abc) (VERSION> 1)))))"#;

#[test]
fn malformed_tokens_stop_the_scan_by_default() {
    let out = read(BAD_TOKEN, &with_limits(5, 5));
    assert_eq!(out.state, ReaderState::Aborted);
    assert_eq!(out.errors, 1);
    assert!(out.log.contains("malformed number 12abc"));
    assert_eq!(out.db.name(), "x");
}

#[test]
fn continue_on_error_reads_past_malformed_tokens() {
    let settings = ReaderSettings {
        continue_on_error: true,
        ..with_limits(5, 5)
    };
    let out = read(BAD_TOKEN, &settings);
    assert_eq!(out.state, ReaderState::Done, "{}", out.log);
    assert_eq!(out.errors, 2);
    assert!(out.log.contains("expected a value after DEBUG-LEVEL>"));
}

#[test]
fn token_listing_echoes_every_token() {
    let settings = ReaderSettings {
        list_tokens: true,
        ..ReaderSettings::default()
    };
    let out = read("(setf macshapa-db '())", &settings);
    assert_eq!(out.state, ReaderState::Done);
    assert!(out.listing.starts_with("1:1 L_PAREN\n1:2 ATOM setf\n1:7 ATOM macshapa-db\n1:19 QUOTE\n"));
    assert!(out.listing.contains("1:23 EOF\n"));
}
