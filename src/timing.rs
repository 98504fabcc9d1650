//! Deadline-based sleeping and the run clock.
//!
//! All waits are expressed as absolute deadlines on the tokio monotonic clock. A wait
//! that wakes early simply re-arms until the deadline has passed, so the total time
//! slept is never shorter than requested. Dropping the future is the only way to end
//! a wait early, which is how an interrupt cancels the sequence.

use crate::progress::ProgressSink;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::Instant;

/// Interval between progress ticks during an exposure.
pub const PROGRESS_STEP: Duration = Duration::from_millis(500);

/// Sleep until `deadline`, resuming after any early wake-up.
pub async fn sleep_until(deadline: Instant) {
    while Instant::now() < deadline {
        tokio::time::sleep_until(deadline).await;
    }
}

/// Sleep until `offset` past `start`. An offset beyond the clock's range never ends.
async fn sleep_past(start: Instant, offset: Duration) {
    match start.checked_add(offset) {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Millisecond-resolution delays with optional progress ticks.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicSleeper {
    step: Duration,
}

impl Default for MonotonicSleeper {
    fn default() -> Self {
        Self::new(PROGRESS_STEP)
    }
}

impl MonotonicSleeper {
    /// Sleeper ticking every `step` in verbose waits. A zero step is treated as 1 ms.
    pub fn new(step: Duration) -> Self {
        Self {
            step: step.max(Duration::from_millis(1)),
        }
    }

    /// Block for at least `duration`.
    pub async fn sleep_quiet(&self, duration: Duration) {
        sleep_past(Instant::now(), duration).await;
    }

    /// Block for at least `duration`, reporting progress before every full step.
    ///
    /// The remainder shorter than one step is slept without a tick, then
    /// [`ProgressSink::done`] is called. Ticks are scheduled against the start
    /// instant, so slow rendering does not stretch the total wait.
    pub async fn sleep_verbose(&self, duration: Duration, progress: &mut dyn ProgressSink) {
        let start = Instant::now();
        let mut sofar = Duration::ZERO;

        while sofar + self.step <= duration {
            progress.tick(percent_complete(sofar, duration));
            sofar += self.step;
            sleep_past(start, sofar).await;
        }

        sleep_past(start, duration).await;
        progress.done();
    }
}

fn percent_complete(sofar: Duration, total: Duration) -> u32 {
    if total.is_zero() {
        return 100;
    }
    let pct = sofar.as_millis() * 100 / total.as_millis().max(1);
    pct.min(100) as u32
}

/// Wall-clock timestamps derived from the monotonic clock.
///
/// The wall time is sampled once when the clock is created; later readings add the
/// monotonic elapsed time. Exposure start/end stamps therefore never go backwards
/// and agree exactly with the sleeps that separate them.
#[derive(Debug, Clone, Copy)]
pub struct SequenceClock {
    wall_anchor: DateTime<Utc>,
    mono_anchor: Instant,
}

impl SequenceClock {
    /// Anchor the clock at the current wall time.
    pub fn start() -> Self {
        Self::anchored_at(Utc::now())
    }

    /// Anchor the clock at a chosen wall time.
    pub fn anchored_at(wall_anchor: DateTime<Utc>) -> Self {
        Self {
            wall_anchor,
            mono_anchor: Instant::now(),
        }
    }

    /// Current wall time.
    pub fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.mono_anchor.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.wall_anchor + elapsed
    }
}
