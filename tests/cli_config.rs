//! Configuration layering and the `ssc` binary's command-line surface.

mod common;

use common::read_log_lines;
use ssc::config::{MluMethod, Settings, SettingsOverrides};
use ssc::SscError;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output};
use std::time::Duration;
use tempfile::{NamedTempFile, TempDir};

fn toml_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn ssc(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ssc"))
        .args(args)
        .current_dir(dir)
        .env("RUST_LOG", "ssc=warn")
        .output()
        .unwrap()
}

#[test]
fn file_values_are_overridden_by_flags() {
    let file = toml_file(
        r#"
count = 12
exposure_secs = 240
mlu_method = 1
label = "M81"
"#,
    );
    let overrides = SettingsOverrides {
        count: Some(3),
        ..SettingsOverrides::default()
    };

    let settings = Settings::load(Some(file.path()), &overrides).unwrap();
    assert_eq!(settings.count, 3);
    assert_eq!(settings.exposure_secs, 240);

    let config = settings.exposure_config().unwrap();
    assert_eq!(config.exposure, Duration::from_secs(240));
    assert_eq!(config.mlu_method, MluMethod::SinglePulse);
    assert_eq!(config.label.as_deref(), Some("M81"));
}

#[test]
fn dither_from_file_is_validated_before_use() {
    let file = toml_file("dither = 9\n");
    let settings = Settings::load(Some(file.path()), &SettingsOverrides::default()).unwrap();
    assert!(matches!(
        settings.exposure_config(),
        Err(SscError::Configuration(_))
    ));
}

#[test]
fn out_of_range_dither_flag_exits_with_usage() {
    let dir = TempDir::new().unwrap();
    let output = ssc(dir.path(), &["-s", "/nonexistent/tty", "-d", "7"]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--dither"), "stderr: {}", stderr);
    assert!(!stderr.contains("/nonexistent/tty"));
}

#[cfg(feature = "instrument_serial")]
#[test]
fn missing_device_fails_before_sequence() {
    let dir = TempDir::new().unwrap();
    let output = ssc(dir.path(), &["-q", "-s", "/nonexistent/tty", "-t", "0"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("/nonexistent/tty"), "stderr: {}", stderr);
}

#[test]
fn overlong_pause_is_rejected_before_running() {
    let dir = TempDir::new().unwrap();
    let output = ssc(
        dir.path(),
        &["--dry-run", "-q", "-c", "2", "-t", "0", "-p", "18446744073709551615"],
    );

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("pause"), "stderr: {}", stderr);
    assert!(!stderr.contains("panicked"));
}

#[test]
fn named_config_file_must_exist() {
    let dir = TempDir::new().unwrap();
    let output = ssc(
        dir.path(),
        &["--dry-run", "-q", "--config", "observatory.toml", "-t", "0"],
    );

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("observatory.toml"), "stderr: {}", stderr);
}

#[test]
fn dry_run_writes_one_log_line() {
    let dir = TempDir::new().unwrap();
    let log_dir = dir.path().join("logs");
    std::fs::create_dir(&log_dir).unwrap();

    let output = ssc(
        dir.path(),
        &[
            "--dry-run",
            "-q",
            "-c",
            "1",
            "-m",
            "1",
            "-M",
            "0",
            "--log-dir",
            "logs",
            "-l",
            "TEST",
            "0",
        ],
    );
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(output.stdout.is_empty());

    let lines = read_log_lines(&log_dir);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].label, "TEST");
    assert_eq!(lines[0].rounded_seconds, 0);
}
