//! Mock Hardware Implementations
//!
//! Provides a simulated shutter line for testing and dry runs without a camera.
//! Every level change is stamped with the tokio clock, so tests running with
//! paused time can assert exact pulse lengths.
//!
//! # Example
//!
//! ```rust,ignore
//! let (line, probe) = MockShutterLine::new();
//! // hand `line` to the controller, keep `probe` for assertions
//! assert_eq!(probe.levels(), vec![LineLevel::Asserted, LineLevel::Deasserted]);
//! assert_eq!(probe.close_count(), 1);
//! ```

use crate::error::{AppResult, SscError};
use crate::hardware::ShutterLine;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::time::Instant;

/// Level of the control line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineLevel {
    /// Signal active.
    Asserted,
    /// Signal inactive.
    Deasserted,
}

/// A change of level and when it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineTransition {
    /// New level.
    pub level: LineLevel,
    /// Monotonic time of the change.
    pub at: Instant,
}

#[derive(Debug, Default)]
struct LineLog {
    asserted: bool,
    transitions: Vec<LineTransition>,
    calls: u32,
    closes: u32,
    fail_on_call: Option<u32>,
}

impl LineLog {
    fn write(&mut self, asserted: bool) -> AppResult<()> {
        self.calls += 1;
        if self.fail_on_call == Some(self.calls) {
            return Err(SscError::Device {
                path: "mock".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "injected failure"),
            });
        }
        if self.asserted != asserted {
            self.asserted = asserted;
            self.transitions.push(LineTransition {
                level: if asserted {
                    LineLevel::Asserted
                } else {
                    LineLevel::Deasserted
                },
                at: Instant::now(),
            });
        }
        Ok(())
    }
}

/// Simulated shutter line.
///
/// Only real level changes are recorded as transitions; repeated writes of the same
/// level count as calls but leave no trace, mirroring what the camera would see.
pub struct MockShutterLine {
    log: Arc<Mutex<LineLog>>,
}

/// Observer handle for a [`MockShutterLine`], usable after the line is dropped.
#[derive(Clone)]
pub struct MockLineProbe {
    log: Arc<Mutex<LineLog>>,
}

impl MockShutterLine {
    /// New released line and its probe.
    pub fn new() -> (Self, MockLineProbe) {
        let log = Arc::new(Mutex::new(LineLog::default()));
        (
            Self { log: log.clone() },
            MockLineProbe { log },
        )
    }

    /// Line whose `n`-th write (1-based) fails with a device error.
    pub fn failing_on_call(n: u32) -> (Self, MockLineProbe) {
        let (line, probe) = Self::new();
        line.log.lock().fail_on_call = Some(n);
        (line, probe)
    }
}

impl ShutterLine for MockShutterLine {
    fn assert(&mut self) -> AppResult<()> {
        self.log.lock().write(true)
    }

    fn deassert(&mut self) -> AppResult<()> {
        self.log.lock().write(false)
    }

    fn is_asserted(&self) -> bool {
        self.log.lock().asserted
    }
}

impl Drop for MockShutterLine {
    fn drop(&mut self) {
        let mut log = self.log.lock();
        // Same release-on-close as the serial line, without the failure injection.
        log.fail_on_call = None;
        let _ = log.write(false);
        log.closes += 1;
    }
}

impl MockLineProbe {
    /// All recorded level changes.
    pub fn transitions(&self) -> Vec<LineTransition> {
        self.log.lock().transitions.clone()
    }

    /// Levels of all recorded changes.
    pub fn levels(&self) -> Vec<LineLevel> {
        self.log.lock().transitions.iter().map(|t| t.level).collect()
    }

    /// Current level.
    pub fn is_asserted(&self) -> bool {
        self.log.lock().asserted
    }

    /// Number of assert/deassert calls, including no-op ones.
    pub fn calls(&self) -> u32 {
        self.log.lock().calls
    }

    /// How many times the line was closed.
    pub fn close_count(&self) -> u32 {
        self.log.lock().closes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_is_idempotent() {
        let (mut line, probe) = MockShutterLine::new();
        line.assert().unwrap();
        line.assert().unwrap();
        assert!(line.is_asserted());
        assert_eq!(probe.levels(), vec![LineLevel::Asserted]);
        assert_eq!(probe.calls(), 2);

        line.deassert().unwrap();
        line.deassert().unwrap();
        assert_eq!(
            probe.levels(),
            vec![LineLevel::Asserted, LineLevel::Deasserted]
        );
    }

    #[test]
    fn test_release_on_drop() {
        let (mut line, probe) = MockShutterLine::new();
        line.assert().unwrap();
        drop(line);
        assert!(!probe.is_asserted());
        assert_eq!(probe.close_count(), 1);
    }

    #[test]
    fn test_injected_failure() {
        let (mut line, probe) = MockShutterLine::failing_on_call(2);
        line.assert().unwrap();
        assert!(matches!(line.deassert(), Err(SscError::Device { .. })));
        assert!(probe.is_asserted());
        drop(line);
        assert!(!probe.is_asserted());
    }
}
