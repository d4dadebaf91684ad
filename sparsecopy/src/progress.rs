//! Progress bar for the copy loop.

use console::Term;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use sparsecopy_core::progress::Progress;

const MIB: f64 = 1024.0 * 1024.0;

/// A 40-column bar on stderr showing percentage and megabytes copied.
///
/// Finishes the bar on drop so the terminal is left on a fresh line.
pub struct CopyProgress {
    bar: ProgressBar,
}

impl CopyProgress {
    /// Creates a bar; its length is set by [`CopyProgress::start`].
    pub fn new() -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
        bar.set_style(
            ProgressStyle::default_bar()
                .template("|{bar:40.green/black}| {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Self { bar }
    }

    /// A bar that draws nothing, for when progress is off or unknowable.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Whether a progress bar can be shown at all.
    pub fn should_show() -> bool {
        Term::stderr().is_term()
    }

    /// Sets the number of bytes the transfer expects to process.
    pub fn start(&self, expected: Option<u64>) {
        match expected {
            Some(len) => self.bar.set_length(len),
            None => self.bar.set_draw_target(ProgressDrawTarget::hidden()),
        }
    }

    /// Redraws the bar for a new report.
    pub fn update(&self, progress: Progress) {
        self.bar.set_position(progress.processed);
        self.bar.set_message(format!(
            "{:5.1}% {:.3}MB of {:.3}MB",
            progress.percent(),
            progress.processed as f64 / MIB,
            progress.expected as f64 / MIB,
        ));
    }

    /// Prints a line on stderr without tearing the bar.
    pub fn notice(&self, message: &str) {
        self.bar.suspend(|| eprintln!("{message}"));
    }
}

impl Drop for CopyProgress {
    fn drop(&mut self) {
        if !self.bar.is_hidden() {
            self.bar.finish();
        }
    }
}
