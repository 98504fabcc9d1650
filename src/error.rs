//! Custom error types for the application.
//!
//! This module defines the primary error type, `SscError`, used by every part of the
//! exposure pipeline. The taxonomy follows how each failure must be treated:
//!
//! - **`Config` / `Configuration`**: loading or validating settings. These are raised
//!   before any device or socket is opened, so no hardware cleanup is needed.
//! - **`Device`**: any failure to open or drive the shutter control line. Fatal: the
//!   sequence stops, the line is released and the device handle closed.
//! - **`Dither`**: any failure talking to the guiding service. Fatal, no retry policy.
//! - **`SerialFeatureDisabled`**: the binary was built without serial support.
//!
//! Log-file failures have no variant here. The exposure logger is
//! best-effort and never reports an error to its caller.

use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, SscError>;

/// Step of the dither exchange that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DitherStage {
    /// Resolving or connecting to the guiding service.
    Connect,
    /// Writing the command byte.
    Send,
    /// Waiting for the acknowledgment byte.
    Receive,
}

impl std::fmt::Display for DitherStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stage = match self {
            DitherStage::Connect => "connect",
            DitherStage::Send => "send",
            DitherStage::Receive => "receive",
        };
        f.write_str(stage)
    }
}

/// Primary error type.
#[derive(Error, Debug)]
pub enum SscError {
    /// Settings could not be extracted from defaults, file or environment.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Settings were readable but semantically invalid.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// Shutter device could not be opened or its control line could not be driven.
    #[error("Shutter device '{path}': {source}")]
    Device {
        /// Device path as configured.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Exchange with the guiding service failed.
    #[error("Dither {stage} failed ({addr}): {source}")]
    Dither {
        /// Which part of the exchange failed.
        stage: DitherStage,
        /// Guiding service address.
        addr: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Serial support compiled out.
    #[error("Serial support not enabled. Rebuild with --features instrument_serial")]
    SerialFeatureDisabled,
}

impl From<figment::Error> for SscError {
    fn from(err: figment::Error) -> Self {
        SscError::Config(Box::new(err))
    }
}
