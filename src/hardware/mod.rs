//! Shutter control line hardware.
//!
//! The camera's remote-shutter input is driven by a single binary signal (RTS on a
//! serial port). [`ShutterLine`] is the capability the sequencer needs; the serial
//! implementation talks to a real device, the mock records every transition.
//!
//! Closing the device is dropping the line. Every implementation releases the
//! signal when dropped, so a line can never outlive its owner in the asserted state.

pub mod mock;
pub mod serial;

pub use mock::{LineLevel, LineTransition, MockLineProbe, MockShutterLine};
pub use serial::SerialShutterLine;

use crate::error::AppResult;

/// Binary output controlling the camera shutter.
///
/// Both operations are idempotent: asserting an asserted line (or deasserting a
/// released one) leaves the observable state unchanged.
pub trait ShutterLine: Send {
    /// Drive the signal active (shutter button pressed).
    fn assert(&mut self) -> AppResult<()>;

    /// Drive the signal inactive (shutter button released).
    fn deassert(&mut self) -> AppResult<()>;

    /// Last level written.
    fn is_asserted(&self) -> bool;
}

impl<T: ShutterLine + ?Sized> ShutterLine for Box<T> {
    fn assert(&mut self) -> AppResult<()> {
        (**self).assert()
    }

    fn deassert(&mut self) -> AppResult<()> {
        (**self).deassert()
    }

    fn is_asserted(&self) -> bool {
        (**self).is_asserted()
    }
}
