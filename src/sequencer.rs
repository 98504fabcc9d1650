//! Mirror lockup and exposure state machine.
//!
//! ```text
//! Idle ──assert──▶ MirrorLockup ──(method 2: deassert)──▶ Settling ──assert──▶ Exposing ──deassert──▶ Idle
//!                       └────────────(method 1: after mlu delay)────────────────▶ Exposing
//! ```
//!
//! Method 1 holds the line from the first press to the end of the exposure; the
//! camera's self-timer locks the mirror and the MLU delay covers that latency.
//! Method 2 sends a short press to lock the mirror, lets it settle, then presses
//! again for the exposure proper.
//!
//! The sequencer may be cancelled at any await point by dropping its future. It
//! leaves [`SequenceState`] describing where it stopped so the owner can release the
//! line and record a partial exposure.

use crate::config::{ExposureConfig, MluMethod};
use crate::error::AppResult;
use crate::exposure_log::ExposureWindow;
use crate::hardware::ShutterLine;
use crate::progress::ProgressSink;
use crate::timing::{MonotonicSleeper, SequenceClock};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where the sequencer currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequencerPhase {
    /// No exposure in progress.
    #[default]
    Idle,
    /// Mirror lockup press in progress.
    MirrorLockup,
    /// Waiting for the mirror to settle (method 2).
    Settling,
    /// Shutter open, light being gathered.
    Exposing,
}

/// Mutable state of a run, shared between the sequencer and its owner.
#[derive(Debug, Default)]
pub struct SequenceState {
    /// Current exposure, 1-based. 0 before the first exposure.
    pub index: u32,
    /// Planned number of exposures.
    pub count: u32,
    phase: SequencerPhase,
    exposing: bool,
    start: Option<DateTime<Utc>>,
}

impl SequenceState {
    /// State for a run of `count` exposures.
    pub fn new(count: u32) -> Self {
        Self {
            count,
            ..Self::default()
        }
    }

    /// Current phase.
    pub fn phase(&self) -> SequencerPhase {
        self.phase
    }

    /// True only while the shutter is open for the timed interval.
    pub fn is_exposing(&self) -> bool {
        self.exposing
    }

    /// Start of the exposure in progress.
    pub fn exposure_start(&self) -> Option<DateTime<Utc>> {
        self.start.filter(|_| self.exposing)
    }

    fn enter(&mut self, phase: SequencerPhase) {
        debug!(exposure = self.index, ?phase, "Sequencer phase");
        self.phase = phase;
    }

    fn begin_exposure(&mut self, start: DateTime<Utc>) {
        self.start = Some(start);
        self.exposing = true;
        self.enter(SequencerPhase::Exposing);
    }

    /// Close the exposure in progress at `end`.
    ///
    /// Clears the exposing flag and returns the window, or `None` if no exposure was
    /// running. Calling it again is a no-op.
    pub fn finish_exposure(&mut self, end: DateTime<Utc>) -> Option<ExposureWindow> {
        if !self.exposing {
            return None;
        }
        self.exposing = false;
        self.start.take().map(|start| ExposureWindow { start, end })
    }
}

/// Result of one pass through the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExposureOutcome {
    /// The exposure ran to completion.
    Completed(ExposureWindow),
    /// The MLU method is not supported; nothing was done.
    Skipped(MluMethod),
}

/// Drives the shutter line through one exposure.
#[derive(Debug, Clone)]
pub struct ExposureSequencer {
    mlu_method: MluMethod,
    mlu_delay: Duration,
    min_pulse: Duration,
    sleeper: MonotonicSleeper,
    clock: SequenceClock,
}

impl ExposureSequencer {
    /// Sequencer for the given configuration.
    pub fn new(config: &ExposureConfig, sleeper: MonotonicSleeper, clock: SequenceClock) -> Self {
        Self {
            mlu_method: config.mlu_method,
            mlu_delay: config.mlu_delay,
            min_pulse: config.min_pulse,
            sleeper,
            clock,
        }
    }

    /// Run one exposure of `duration`.
    ///
    /// On success the line is released and the state is back to
    /// [`SequencerPhase::Idle`]. On error or cancellation the line may still be
    /// asserted; releasing it is the caller's responsibility.
    pub async fn expose(
        &self,
        duration: Duration,
        line: &mut dyn ShutterLine,
        state: &mut SequenceState,
        progress: &mut dyn ProgressSink,
    ) -> AppResult<ExposureOutcome> {
        match self.mlu_method {
            MluMethod::SinglePulse => {
                state.enter(SequencerPhase::MirrorLockup);
                line.assert()?;
                self.sleeper.sleep_quiet(self.mlu_delay).await;
            }
            MluMethod::TwoPulse => {
                state.enter(SequencerPhase::MirrorLockup);
                line.assert()?;
                self.sleeper.sleep_quiet(self.min_pulse).await;
                line.deassert()?;

                state.enter(SequencerPhase::Settling);
                self.sleeper.sleep_quiet(self.mlu_delay).await;
                line.assert()?;
            }
            MluMethod::Unsupported(method) => {
                warn!("unknown MLU method {}", method);
                return Ok(ExposureOutcome::Skipped(self.mlu_method));
            }
        }

        let start = self.clock.now();
        state.begin_exposure(start);
        info!(exposure = state.index, "Shutter open");

        self.sleeper.sleep_verbose(duration, progress).await;

        let end = self.clock.now();
        state.finish_exposure(end);
        line.deassert()?;
        state.enter(SequencerPhase::Idle);

        let window = ExposureWindow { start, end };
        info!(
            exposure = state.index,
            seconds = window.rounded_seconds(),
            "Shutter closed"
        );
        Ok(ExposureOutcome::Completed(window))
    }
}
