//! Top-level exposure run.
//!
//! For every planned exposure the controller dithers (from the second exposure on,
//! when enabled), pauses, runs the sequencer and logs the result. The whole loop is
//! one future raced against an interrupt future; whichever path ends the run, the
//! controller releases the shutter line and closes the device exactly once.
//!
//! The guiding service is connected inside the run, so an interrupt also ends a
//! connect that never completes.
//!
//! Interrupt path, in order:
//! 1. deassert the line
//! 2. if the shutter was open, close the exposure now and log the partial record
//! 3. close the device
//!
//! The dither connection is closed when the controller is dropped.

use crate::config::ExposureConfig;
use crate::dither::DitherClient;
use crate::error::{AppResult, SscError};
use crate::exposure_log::{ExposureLogger, ExposureWindow};
use crate::hardware::ShutterLine;
use crate::progress::ProgressSink;
use crate::sequencer::{ExposureOutcome, ExposureSequencer, SequenceState};
use crate::timing::{MonotonicSleeper, SequenceClock};
use std::future::Future;
use tracing::{info, warn};

/// Transient indicator shown while waiting for the guider.
pub const DITHER_NOTICE: &str = "Dithering...";

/// What a run achieved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Planned number of exposures.
    pub planned: u32,
    /// Completed exposure windows, in order.
    pub exposures: Vec<ExposureWindow>,
    /// Acknowledged dither requests.
    pub dithers: u32,
    /// Exposure cut short by an interrupt.
    pub partial: Option<ExposureWindow>,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every planned exposure was attempted.
    Completed(RunSummary),
    /// The interrupt fired first.
    Interrupted(RunSummary),
}

impl RunOutcome {
    /// Summary regardless of how the run ended.
    pub fn summary(&self) -> &RunSummary {
        match self {
            RunOutcome::Completed(summary) | RunOutcome::Interrupted(summary) => summary,
        }
    }
}

/// Owns every resource of an exposure run.
pub struct SequenceController {
    config: ExposureConfig,
    sequencer: ExposureSequencer,
    sleeper: MonotonicSleeper,
    clock: SequenceClock,
    line: Option<Box<dyn ShutterLine>>,
    dither: DitherClient,
    logger: ExposureLogger,
    progress: Box<dyn ProgressSink>,
    state: SequenceState,
    exposures: Vec<ExposureWindow>,
}

impl SequenceController {
    /// Controller for `config` driving `line`.
    ///
    /// No connection is made here; the guiding service is contacted when the run
    /// starts, and only if dithering is configured.
    pub fn new(
        config: ExposureConfig,
        line: Box<dyn ShutterLine>,
        logger: ExposureLogger,
        progress: Box<dyn ProgressSink>,
    ) -> Self {
        let sleeper = MonotonicSleeper::default();
        let clock = SequenceClock::start();
        Self {
            sequencer: ExposureSequencer::new(&config, sleeper, clock),
            state: SequenceState::new(config.count),
            config,
            sleeper,
            clock,
            line: Some(line),
            dither: DitherClient::disabled(),
            logger,
            progress,
            exposures: Vec::new(),
        }
    }

    /// Replace the run clock.
    pub fn with_clock(mut self, clock: SequenceClock) -> Self {
        self.clock = clock;
        self.sequencer = ExposureSequencer::new(&self.config, self.sleeper, clock);
        self
    }

    /// Connect to the guiding service if needed, then run all exposures, unless
    /// `interrupt` completes first.
    ///
    /// # Errors
    /// Device and dither failures end the run immediately. The line is released
    /// and the device closed before the error is returned.
    pub async fn run<F>(mut self, interrupt: F) -> AppResult<RunOutcome>
    where
        F: Future<Output = ()>,
    {
        let finished = tokio::select! {
            biased;
            _ = interrupt => None,
            result = self.run_sequence() => Some(result),
        };

        match finished {
            Some(Ok(())) => {
                self.dither.disconnect().await;
                self.close_line()?;
                info!(
                    exposures = self.exposures.len(),
                    planned = self.config.count,
                    "Sequence complete"
                );
                Ok(RunOutcome::Completed(self.summary(None)))
            }
            Some(Err(e)) => {
                if let Err(release) = self.close_line() {
                    warn!("Failed to release shutter after error: {}", release);
                }
                Err(e)
            }
            None => {
                let partial = self.handle_interrupt();
                Ok(RunOutcome::Interrupted(self.summary(partial)))
            }
        }
    }

    async fn run_sequence(&mut self) -> AppResult<()> {
        // Opening a tty may raise RTS; start from a released line.
        self.line_mut()?.deassert()?;

        self.dither = DitherClient::connect(self.config.dither, &self.config.guider).await?;

        let count = self.config.count;
        for i in 1..=count {
            self.state.index = i;

            if i > 1 && self.dither.is_enabled() {
                self.progress.notice(DITHER_NOTICE);
                self.dither.dither().await?;
            }

            self.progress.set_label(&format!("Exposure {}/{}", i, count));
            info!("Exposure {}/{}", i, count);

            if i > 1 {
                self.sleeper.sleep_quiet(self.config.pause).await;
            }

            let line = self.line.as_deref_mut().ok_or_else(line_closed)?;
            let outcome = self
                .sequencer
                .expose(
                    self.config.exposure,
                    line,
                    &mut self.state,
                    &mut *self.progress,
                )
                .await?;

            if let ExposureOutcome::Completed(window) = outcome {
                self.logger.record(window);
                self.exposures.push(window);
            }
        }

        Ok(())
    }

    fn handle_interrupt(&mut self) -> Option<ExposureWindow> {
        warn!(exposure = self.state.index, "Interrupted, releasing shutter");

        if let Some(line) = self.line.as_mut() {
            if let Err(e) = line.deassert() {
                warn!("Failed to release shutter on interrupt: {}", e);
            }
        }

        let partial = self.state.finish_exposure(self.clock.now());
        if let Some(window) = partial {
            info!(
                seconds = window.rounded_seconds(),
                "Logging interrupted exposure"
            );
            self.logger.record(window);
        }

        if let Err(e) = self.close_line() {
            warn!("Failed to close shutter device: {}", e);
        }
        partial
    }

    /// Release the line and close the device. Later calls are no-ops.
    fn close_line(&mut self) -> AppResult<()> {
        match self.line.take() {
            Some(mut line) => line.deassert(),
            None => Ok(()),
        }
    }

    fn line_mut(&mut self) -> AppResult<&mut (dyn ShutterLine + 'static)> {
        self.line.as_deref_mut().ok_or_else(line_closed)
    }

    fn summary(&self, partial: Option<ExposureWindow>) -> RunSummary {
        RunSummary {
            planned: self.config.count,
            exposures: self.exposures.clone(),
            dithers: self.dither.requests(),
            partial,
        }
    }
}

fn line_closed() -> SscError {
    SscError::Device {
        path: "shutter".to_string(),
        source: std::io::Error::new(std::io::ErrorKind::NotConnected, "device already closed"),
    }
}
