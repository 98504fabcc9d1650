//! Progress display for the exposure wait.
//!
//! The sleeper calls a [`ProgressSink`] at fixed intervals; what happens on each tick
//! (a rewritten console line, nothing at all, or an in-memory record for tests) is
//! decided by the sink chosen at startup.

use std::io::Write;

/// Animation frames cycled on every tick.
pub const ANIMATION: [char; 8] = ['|', '/', '-', '\\', '|', '/', '-', '\\'];

/// Receiver of progress events.
pub trait ProgressSink: Send {
    /// Set the label shown on subsequent ticks, e.g. `Exposure 2/10`.
    fn set_label(&mut self, label: &str);
    /// Progress update, `percent` is 0..=100.
    fn tick(&mut self, percent: u32);
    /// The timed wait has completed.
    fn done(&mut self);
    /// Transient status message, shown even when progress is suppressed.
    fn notice(&mut self, message: &str);
}

/// Single-line console display that overwrites itself with `\r`.
pub struct ConsoleProgress<W: Write + Send> {
    out: W,
    label: String,
    frame: usize,
}

impl<W: Write + Send> ConsoleProgress<W> {
    /// Render to the given writer.
    pub fn new(out: W) -> Self {
        Self {
            out,
            label: String::new(),
            frame: 0,
        }
    }

    /// Consume the display and return the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> ProgressSink for ConsoleProgress<W> {
    fn set_label(&mut self, label: &str) {
        self.label = label.to_string();
    }

    fn tick(&mut self, percent: u32) {
        let glyph = ANIMATION[self.frame];
        self.frame = (self.frame + 1) % ANIMATION.len();
        // Display failures must never disturb the exposure timing.
        let _ = write!(self.out, "{}   {:3}% {}\r", self.label, percent, glyph);
        let _ = self.out.flush();
    }

    fn done(&mut self) {
        let _ = writeln!(self.out, "{} ... done   ", self.label);
        let _ = self.out.flush();
    }

    fn notice(&mut self, message: &str) {
        let _ = write!(self.out, "{}\r", message);
        let _ = self.out.flush();
    }
}

/// Quiet mode: ticks and completion lines are dropped, notices still go through.
pub struct QuietProgress<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> QuietProgress<W> {
    /// Write notices to the given writer.
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write + Send> ProgressSink for QuietProgress<W> {
    fn set_label(&mut self, _label: &str) {}

    fn tick(&mut self, _percent: u32) {}

    fn done(&mut self) {}

    fn notice(&mut self, message: &str) {
        let _ = write!(self.out, "{}\r", message);
        let _ = self.out.flush();
    }
}

/// Progress sink for the terminal.
pub fn stdout_progress(quiet: bool) -> Box<dyn ProgressSink> {
    if quiet {
        Box::new(QuietProgress::new(std::io::stdout()))
    } else {
        Box::new(ConsoleProgress::new(std::io::stdout()))
    }
}

/// Event captured by [`RecordingProgress`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Label change.
    Label(String),
    /// Tick with its percentage.
    Tick(u32),
    /// Wait finished.
    Done,
    /// Transient notice.
    Notice(String),
}

/// Sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    /// Events in arrival order.
    pub events: Vec<ProgressEvent>,
}

impl RecordingProgress {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Percentages of all ticks so far.
    pub fn ticks(&self) -> Vec<u32> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::Tick(p) => Some(*p),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for RecordingProgress {
    fn set_label(&mut self, label: &str) {
        self.events.push(ProgressEvent::Label(label.to_string()));
    }

    fn tick(&mut self, percent: u32) {
        self.events.push(ProgressEvent::Tick(percent));
    }

    fn done(&mut self) {
        self.events.push(ProgressEvent::Done);
    }

    fn notice(&mut self, message: &str) {
        self.events.push(ProgressEvent::Notice(message.to_string()));
    }
}
