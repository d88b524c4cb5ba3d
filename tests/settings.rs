use std::fs;

use codingdb::settings::{Newline, ReaderSettings};

#[test]
fn defaults_without_a_file() {
    let settings = ReaderSettings::load(None).unwrap();
    assert_eq!(settings.max_errors, 1);
    assert_eq!(settings.max_warnings, 1);
    assert!(!settings.continue_on_error);
    assert_eq!(settings.newline, Newline::Lf);
    assert_eq!(settings.ticks_per_second, 60);
}

#[test]
fn file_values_override_defaults() {
    let path = std::env::temp_dir().join(format!("codingdb-settings-{}.toml", std::process::id()));
    fs::write(
        &path,
        "max_errors = 25\nlist_tokens = true\nnewline = \"crlf\"\n",
    )
    .unwrap();
    let settings = ReaderSettings::load(Some(&path)).unwrap();
    fs::remove_file(&path).unwrap();
    assert_eq!(settings.max_errors, 25);
    assert_eq!(settings.max_warnings, 1);
    assert!(settings.list_tokens);
    assert_eq!(settings.newline.as_str(), "\r\n");
}

#[test]
fn zero_ceilings_are_rejected() {
    let settings = ReaderSettings {
        max_warnings: 0,
        ..ReaderSettings::default()
    };
    assert!(settings.validate().is_err());
    assert!(ReaderSettings::default().validate().is_ok());
}
