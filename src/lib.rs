//! Core library for the ssc shutter controller.
//!
//! This library drives a camera's remote-shutter input through the RTS line of a
//! serial port to take a series of timed exposures, with optional mirror lockup,
//! dithering through an external guiding service between frames, and a dated
//! per-exposure log. The `ssc` binary is a thin command-line wrapper around
//! [`controller::SequenceController`].

pub mod cli;
pub mod config;
pub mod controller;
pub mod dither;
pub mod error;
pub mod exposure_log;
pub mod hardware;
pub mod progress;
pub mod sequencer;
pub mod timing;

pub use config::{ExposureConfig, MluMethod, Settings};
pub use controller::{RunOutcome, RunSummary, SequenceController};
pub use error::{AppResult, SscError};
