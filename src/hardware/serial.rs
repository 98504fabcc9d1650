//! RTS-driven shutter line on a serial device.
//!
//! The `serialport` crate sets and clears the modem control bits individually, which
//! is the read-modify-write of the control bitmask the camera cable needs: only RTS
//! changes, every other line keeps its level.

use crate::error::{AppResult, SscError};
use crate::hardware::ShutterLine;
#[cfg(feature = "instrument_serial")]
use std::time::Duration;
use tracing::debug;

/// Baud rate used when opening the port. The line is never used for data, so any
/// rate the driver accepts will do.
#[cfg(feature = "instrument_serial")]
const OPEN_BAUD_RATE: u32 = 9600;

/// Shutter line on the RTS pin of a serial port.
pub struct SerialShutterLine {
    path: String,
    #[cfg(feature = "instrument_serial")]
    port: Box<dyn serialport::SerialPort>,
    asserted: bool,
}

impl SerialShutterLine {
    /// Open the device for exclusive use.
    ///
    /// Opening a tty may raise RTS on its own; callers release the line right after.
    ///
    /// # Errors
    /// Returns [`SscError::Device`] if the device cannot be opened.
    #[cfg(feature = "instrument_serial")]
    pub fn open(path: &str) -> AppResult<Self> {
        let port = serialport::new(path, OPEN_BAUD_RATE)
            .timeout(Duration::from_millis(100))
            .open()
            .map_err(|e| SscError::Device {
                path: path.to_string(),
                source: e.into(),
            })?;

        debug!("Shutter device '{}' opened", path);
        Ok(Self {
            path: path.to_string(),
            port,
            asserted: false,
        })
    }

    /// Serial support is compiled out.
    #[cfg(not(feature = "instrument_serial"))]
    pub fn open(path: &str) -> AppResult<Self> {
        let _ = path;
        Err(SscError::SerialFeatureDisabled)
    }

    #[cfg(feature = "instrument_serial")]
    fn set_rts(&mut self, level: bool) -> AppResult<()> {
        self.port
            .write_request_to_send(level)
            .map_err(|e| SscError::Device {
                path: self.path.clone(),
                source: e.into(),
            })?;
        self.asserted = level;
        debug!(device = %self.path, rts = level, "Shutter line set");
        Ok(())
    }

    #[cfg(not(feature = "instrument_serial"))]
    fn set_rts(&mut self, _level: bool) -> AppResult<()> {
        Err(SscError::SerialFeatureDisabled)
    }
}

impl ShutterLine for SerialShutterLine {
    fn assert(&mut self) -> AppResult<()> {
        self.set_rts(true)
    }

    fn deassert(&mut self) -> AppResult<()> {
        self.set_rts(false)
    }

    fn is_asserted(&self) -> bool {
        self.asserted
    }
}

impl Drop for SerialShutterLine {
    fn drop(&mut self) {
        // Last chance to release the shutter before the handle closes.
        let _ = self.set_rts(false);
        debug!("Shutter device '{}' closed", self.path);
    }
}
