//! Per-exposure log records.
//!
//! One line is appended per exposure to a file named after the UTC date of the
//! exposure start, e.g. `ssc-20240314.log`:
//!
//! ```text
//! M31, 21:04:17, 300 seconds, 1710450257.041522, 1710450557.043109
//! ```
//!
//! Logging is best-effort. A file that cannot be opened or written is skipped with a
//! warning; the exposure run itself never fails because of it.

use chrono::{DateTime, Utc};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name prefix of the dated logs.
pub const LOG_PREFIX: &str = "ssc";
/// File name extension of the dated logs.
pub const LOG_EXTENSION: &str = "log";

/// Start and end of one light-gathering interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExposureWindow {
    /// Shutter opened.
    pub start: DateTime<Utc>,
    /// Shutter closed (or the run was interrupted).
    pub end: DateTime<Utc>,
}

impl ExposureWindow {
    /// Elapsed time rounded to the nearest second, halves rounding up.
    pub fn rounded_seconds(&self) -> u64 {
        let micros = (self.end - self.start).num_microseconds().unwrap_or(0).max(0) as u64;
        (micros + 500_000) / 1_000_000
    }
}

/// One log line, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExposureRecord {
    /// Object label.
    pub label: String,
    /// Exposure interval.
    pub window: ExposureWindow,
}

impl ExposureRecord {
    /// Render the comma-separated log line, without the trailing newline.
    pub fn to_line(&self) -> String {
        format!(
            "{}, {}, {} seconds, {}, {}",
            self.label,
            self.window.start.format("%H:%M:%S"),
            self.window.rounded_seconds(),
            raw_timestamp(&self.window.start),
            raw_timestamp(&self.window.end),
        )
    }
}

/// `seconds.microseconds` since the Unix epoch.
fn raw_timestamp(t: &DateTime<Utc>) -> String {
    format!("{}.{:06}", t.timestamp(), t.timestamp_subsec_micros())
}

/// Appends exposure records to dated files.
#[derive(Debug, Clone)]
pub struct ExposureLogger {
    label: Option<String>,
    dir: PathBuf,
}

impl ExposureLogger {
    /// Logger writing into `dir`; `None` as label disables logging entirely.
    pub fn new(label: Option<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            label,
            dir: dir.into(),
        }
    }

    /// Logger that never writes.
    pub fn disabled() -> Self {
        Self::new(None, ".")
    }

    /// Path of the log file that receives an exposure starting at `start`.
    pub fn path_for(&self, start: &DateTime<Utc>) -> PathBuf {
        log_path(&self.dir, start)
    }

    /// Append one record for `window`. Returns the record if it reached the file.
    pub fn record(&self, window: ExposureWindow) -> Option<ExposureRecord> {
        let label = self.label.as_ref()?;
        let record = ExposureRecord {
            label: label.clone(),
            window,
        };
        let path = self.path_for(&window.start);

        let mut file = match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => file,
            Err(e) => {
                warn!("Skipping exposure log, cannot open {:?}: {}", path, e);
                return None;
            }
        };

        if let Err(e) = writeln!(file, "{}", record.to_line()) {
            warn!("Skipping exposure log, cannot write {:?}: {}", path, e);
            return None;
        }

        debug!(path = %path.display(), "Exposure logged");
        Some(record)
    }
}

fn log_path(dir: &Path, start: &DateTime<Utc>) -> PathBuf {
    dir.join(format!(
        "{}-{}.{}",
        LOG_PREFIX,
        start.format("%Y%m%d"),
        LOG_EXTENSION
    ))
}
