//! Command-line interface.
//!
//! Every flag is optional; anything not given falls through to the environment,
//! the configuration file and finally the built-in defaults (see [`crate::config`]).

use crate::config::SettingsOverrides;
use clap::Parser;
use std::path::PathBuf;

/// Trigger a camera shutter over a serial control line for a series of exposures.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "ssc", version, about)]
pub struct Cli {
    /// Serial port to use [default: /dev/ttyS0]
    #[arg(short = 's', long, value_name = "PATH")]
    pub device: Option<String>,

    /// Number of exposures [default: 1]
    #[arg(short = 'c', long)]
    pub count: Option<u32>,

    /// Exposure time in seconds [default: 1]
    #[arg(short = 't', long = "time", value_name = "SECONDS")]
    pub exposure: Option<u64>,

    /// Pause between exposures in seconds [default: 5]
    #[arg(short = 'p', long, value_name = "SECONDS")]
    pub pause: Option<u64>,

    /// Mirror lockup method: 1 = one pulse, 2 = two pulses [default: 2]
    #[arg(short = 'm', long)]
    pub mlu_method: Option<u32>,

    /// Mirror lockup delay in milliseconds [default: 2000]
    #[arg(short = 'M', long, value_name = "MS")]
    pub mlu_delay: Option<u64>,

    /// Minimum shutter pulse in milliseconds [default: 200]
    #[arg(short = 'S', long, value_name = "MS")]
    pub min_pulse: Option<u64>,

    /// Guider dither amount 1..5, 0 disables [default: 0]
    #[arg(short = 'd', long, value_parser = clap::value_parser!(u8).range(0..=5))]
    pub dither: Option<u8>,

    /// Guiding service address [default: localhost:4300]
    #[arg(short = 'P', long, value_name = "HOST[:PORT]")]
    pub guider: Option<String>,

    /// Object description for the exposure log; enables logging
    #[arg(short = 'l', long)]
    pub label: Option<String>,

    /// Quiet operation, no progress display
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Configuration file [default: ssc.toml]
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory for exposure logs [default: .]
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Simulate the shutter line instead of opening the device
    #[arg(long)]
    pub dry_run: bool,

    /// Exposure time in seconds, overrides --time
    #[arg(value_name = "SECONDS")]
    pub seconds: Option<u64>,
}

impl Cli {
    /// Flags given on the command line, as the top configuration layer.
    pub fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            device: self.device.clone(),
            count: self.count,
            exposure_secs: self.seconds.or(self.exposure),
            pause_secs: self.pause,
            mlu_method: self.mlu_method,
            mlu_delay_ms: self.mlu_delay,
            min_pulse_ms: self.min_pulse,
            dither: self.dither,
            guider: self.guider.clone(),
            label: self.label.clone(),
            quiet: self.quiet.then_some(true),
            log_dir: self.log_dir.clone(),
            dry_run: self.dry_run.then_some(true),
        }
    }
}
