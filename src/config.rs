//! Layered configuration for exposure runs.
//!
//! Settings are resolved with `figment` in increasing order of precedence:
//!
//! 1. Built-in defaults ([`Settings::default`])
//! 2. TOML file (`ssc.toml` unless another path is given)
//! 3. Environment variables prefixed with `SSC_` (e.g. `SSC_COUNT=20`)
//! 4. Command-line overrides ([`SettingsOverrides`])
//!
//! [`Settings`] is the raw, serializable surface. [`ExposureConfig`] is the validated,
//! immutable form consumed by the sequencer; it is produced before any device or
//! socket is opened, so invalid input never touches hardware.

use crate::dither::DitherAmount;
use crate::error::{AppResult, SscError};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "ssc.toml";
/// Environment variable prefix.
pub const ENV_PREFIX: &str = "SSC_";
/// Port used by the guiding service when the address names none.
pub const DEFAULT_GUIDER_PORT: u16 = 4300;
/// Longest accepted exposure, pause or delay.
pub const MAX_WAIT: Duration = Duration::from_secs(30 * 24 * 3600);

// =============================================================================
// Raw settings
// =============================================================================

/// Raw settings as read from defaults, file, environment and command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Serial device carrying the shutter control line.
    pub device: String,
    /// Number of exposures.
    pub count: u32,
    /// Exposure time in seconds.
    pub exposure_secs: u64,
    /// Pause between exposures in seconds.
    pub pause_secs: u64,
    /// Mirror lockup method (1 = one pulse, 2 = two pulses).
    pub mlu_method: u32,
    /// Delay between mirror lockup and exposure start.
    pub mlu_delay_ms: u64,
    /// Minimum pulse length that the camera registers as a shutter press.
    pub min_pulse_ms: u64,
    /// Dither amount 0..=5, 0 disables dithering.
    pub dither: u8,
    /// Guiding service address, `host` or `host:port`.
    pub guider: String,
    /// Object label written to the exposure log. No label, no log.
    pub label: Option<String>,
    /// Suppress the progress display.
    pub quiet: bool,
    /// Directory receiving the dated exposure logs.
    pub log_dir: PathBuf,
    /// Drive a simulated shutter line instead of the serial device.
    pub dry_run: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device: "/dev/ttyS0".to_string(),
            count: 1,
            exposure_secs: 1,
            pause_secs: 5,
            mlu_method: 2,
            mlu_delay_ms: 2000,
            min_pulse_ms: 200,
            dither: 0,
            guider: format!("localhost:{}", DEFAULT_GUIDER_PORT),
            label: None,
            quiet: false,
            log_dir: PathBuf::from("."),
            dry_run: false,
        }
    }
}

/// Command-line values that take precedence over every other layer.
///
/// Only fields that were actually given are serialized, so absent flags leave the
/// lower layers untouched.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, Serialize)]
pub struct SettingsOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exposure_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pause_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mlu_method: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mlu_delay_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_pulse_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dither: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiet: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
}

impl Settings {
    /// Build the provider chain without extracting it.
    ///
    /// An explicit `config_file` is read from exactly that path; the default file is
    /// looked up in the working directory and its parents.
    pub fn figment(config_file: Option<&Path>, overrides: &SettingsOverrides) -> Figment {
        let file = match config_file {
            Some(path) => Toml::file_exact(path),
            None => Toml::file(DEFAULT_CONFIG_FILE),
        };
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(file)
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Serialized::defaults(overrides))
    }

    /// Load settings from all layers.
    ///
    /// A missing `ssc.toml` is not an error. A missing file that was named
    /// explicitly is, and so is a malformed one.
    pub fn load(config_file: Option<&Path>, overrides: &SettingsOverrides) -> AppResult<Self> {
        if let Some(path) = config_file {
            if !path.is_file() {
                return Err(SscError::Configuration(format!(
                    "configuration file {} not found",
                    path.display()
                )));
            }
        }
        let settings: Settings = Self::figment(config_file, overrides).extract()?;
        Ok(settings)
    }

    /// Validate and convert into the immutable run configuration.
    pub fn exposure_config(&self) -> AppResult<ExposureConfig> {
        if self.count == 0 {
            return Err(SscError::Configuration(
                "exposure count must be at least 1".to_string(),
            ));
        }

        let dither = DitherAmount::from_level(self.dither)?;
        let guider: GuiderAddress = self.guider.parse()?;

        Ok(ExposureConfig {
            count: self.count,
            exposure: bounded_wait("exposure", Duration::from_secs(self.exposure_secs))?,
            pause: bounded_wait("pause", Duration::from_secs(self.pause_secs))?,
            mlu_method: MluMethod::from(self.mlu_method),
            mlu_delay: bounded_wait("MLU delay", Duration::from_millis(self.mlu_delay_ms))?,
            min_pulse: bounded_wait("minimum pulse", Duration::from_millis(self.min_pulse_ms))?,
            dither,
            guider,
            quiet: self.quiet,
            label: self.label.clone().filter(|l| !l.is_empty()),
        })
    }
}

fn bounded_wait(name: &str, wait: Duration) -> AppResult<Duration> {
    if wait > MAX_WAIT {
        return Err(SscError::Configuration(format!(
            "{} of {} s exceeds the {} s limit",
            name,
            wait.as_secs(),
            MAX_WAIT.as_secs()
        )));
    }
    Ok(wait)
}

// =============================================================================
// Validated run configuration
// =============================================================================

/// Mirror lockup strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MluMethod {
    /// One pulse: the camera locks the mirror on its short self-timer and the
    /// same press opens the shutter.
    SinglePulse,
    /// Two pulses: a short press locks the mirror, a second press opens the shutter.
    TwoPulse,
    /// Any other value. Accepted so the run proceeds, but no exposure is taken.
    Unsupported(u32),
}

impl From<u32> for MluMethod {
    fn from(value: u32) -> Self {
        match value {
            1 => MluMethod::SinglePulse,
            2 => MluMethod::TwoPulse,
            other => MluMethod::Unsupported(other),
        }
    }
}

impl fmt::Display for MluMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MluMethod::SinglePulse => write!(f, "1"),
            MluMethod::TwoPulse => write!(f, "2"),
            MluMethod::Unsupported(n) => write!(f, "{}", n),
        }
    }
}

/// Guiding service endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuiderAddress {
    /// Host name or IP address, resolved at connect time.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Default for GuiderAddress {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_GUIDER_PORT,
        }
    }
}

impl FromStr for GuiderAddress {
    type Err = SscError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = match s.split_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|e| {
                    SscError::Configuration(format!("invalid guider port '{}': {}", port, e))
                })?;
                (host, port)
            }
            None => (s, DEFAULT_GUIDER_PORT),
        };

        if host.is_empty() {
            return Err(SscError::Configuration(format!(
                "guider address '{}' has no host",
                s
            )));
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for GuiderAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Immutable configuration of one exposure run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExposureConfig {
    /// Number of exposures, at least 1.
    pub count: u32,
    /// Light-gathering time per exposure.
    pub exposure: Duration,
    /// Pause before every exposure but the first.
    pub pause: Duration,
    /// Mirror lockup strategy.
    pub mlu_method: MluMethod,
    /// Mirror settling delay (method 2) or self-timer latency (method 1).
    pub mlu_delay: Duration,
    /// Length of the mirror lockup pulse in method 2.
    pub min_pulse: Duration,
    /// Dither amount, `None` when dithering is disabled.
    pub dither: Option<DitherAmount>,
    /// Guiding service endpoint, only used when dithering.
    pub guider: GuiderAddress,
    /// Suppress the progress display.
    pub quiet: bool,
    /// Object label; logging is disabled without one.
    pub label: Option<String>,
}

impl Default for ExposureConfig {
    fn default() -> Self {
        // Settings::default() is always valid.
        let d = Settings::default();
        Self {
            count: d.count,
            exposure: Duration::from_secs(d.exposure_secs),
            pause: Duration::from_secs(d.pause_secs),
            mlu_method: MluMethod::from(d.mlu_method),
            mlu_delay: Duration::from_millis(d.mlu_delay_ms),
            min_pulse: Duration::from_millis(d.min_pulse_ms),
            dither: None,
            guider: GuiderAddress::default(),
            quiet: d.quiet,
            label: None,
        }
    }
}
