//! Progress percentage tracking.
//!
//! The engine reports progress through a callback. A `ProgressTracker` turns
//! the running byte count into a percentage with one decimal place and
//! suppresses reports whose percentage has not changed since the last one.

/// One progress report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Percentage complete in tenths of a percent (0..=1000).
    pub tenths: u16,
    /// Bytes processed so far.
    pub processed: u64,
    /// Bytes expected in total.
    pub expected: u64,
}

impl Progress {
    /// Percentage complete, with one decimal place of precision.
    pub fn percent(&self) -> f64 {
        f64::from(self.tenths) / 10.0
    }
}

/// Percentage of `expected` covered by `processed`, in tenths of a percent,
/// rounded to nearest and clamped to `0..=1000`. An empty transfer is done.
pub fn percent_tenths(processed: u64, expected: u64) -> u16 {
    if expected == 0 {
        return 1000;
    }
    let expected = u128::from(expected);
    let tenths = (u128::from(processed) * 1000 + expected / 2) / expected;
    // Clamped to 1000, so the narrowing cannot truncate.
    tenths.min(1000) as u16
}

/// Emits a [`Progress`] only when the displayed percentage changes.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    expected: Option<u64>,
    last: Option<u16>,
}

impl ProgressTracker {
    /// A tracker that reports against `expected` bytes, or never reports if
    /// `expected` is `None`.
    pub(crate) fn new(expected: Option<u64>) -> Self {
        Self {
            expected,
            last: None,
        }
    }

    /// A tracker that never reports.
    pub(crate) fn disabled() -> Self {
        Self::new(None)
    }

    /// Returns a report if `processed` moves the percentage.
    pub(crate) fn update(&mut self, processed: u64) -> Option<Progress> {
        let expected = self.expected?;
        let tenths = percent_tenths(processed, expected);
        if self.last == Some(tenths) {
            return None;
        }
        self.last = Some(tenths);
        Some(Progress {
            tenths,
            processed,
            expected,
        })
    }
}
