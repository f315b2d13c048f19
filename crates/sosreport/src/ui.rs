//! User-facing surfaces the flows write to.
//!
//! The flows never print directly; they report through a [`Notifier`]
//! (blocking alerts) and a [`TimerDisplay`] (the recording countdown).

use std::io::Write;

/// Sink for messages the user must see.
pub trait Notifier: Send + Sync {
    /// Show a message to the user.
    fn alert(&self, message: &str);
}

/// The countdown readout shown while recording.
pub trait TimerDisplay: Send + Sync {
    /// Replace the displayed text.
    fn show(&self, text: &str);
}

/// Format a number of seconds as `MM:SS`.
#[must_use]
pub fn format_countdown(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Notifier that writes alerts to standard error.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn alert(&self, message: &str) {
        eprintln!("{message}");
    }
}

/// Countdown display that redraws a single terminal line.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleTimer {
    quiet: bool,
}

impl ConsoleTimer {
    /// Create a console timer; a quiet timer draws nothing.
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl TimerDisplay for ConsoleTimer {
    fn show(&self, text: &str) {
        if self.quiet {
            return;
        }
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\rRecording {text}");
        let _ = stderr.flush();
    }
}
