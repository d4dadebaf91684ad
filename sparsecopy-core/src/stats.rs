//! Transfer statistics.

use std::fmt;

/// Counters accumulated by the engine over one transfer.
///
/// Only the engine writes these; front-ends read them for progress and the
/// final summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Bytes materialized in the destination by writing.
    pub bytes_written_real: u64,
    /// Bytes skipped over, leaving holes.
    pub bytes_skipped_sparse: u64,
    /// Zero source bytes that were written anyway because the destination
    /// held non-zero data there. Counted within `bytes_written_real`.
    pub bytes_nonzero_destination: u64,
    /// Bytes the transfer is expected to process, when known.
    pub expected_total_bytes: Option<u64>,
}

impl Statistics {
    /// Creates empty statistics for a transfer of `expected_total_bytes`.
    pub fn new(expected_total_bytes: Option<u64>) -> Self {
        Self {
            expected_total_bytes,
            ..Self::default()
        }
    }

    /// Bytes consumed from the source so far: real plus sparse.
    pub fn total_bytes_processed(&self) -> u64 {
        self.bytes_written_real + self.bytes_skipped_sparse
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total bytes = {} (real = {}, sparse = {}), nonzerodest = {}",
            self.total_bytes_processed(),
            self.bytes_written_real,
            self.bytes_skipped_sparse,
            self.bytes_nonzero_destination
        )
    }
}

/// Bytes a transfer is expected to process: the source extent, capped by the
/// byte limit. Unknown when the source extent is unknown.
pub fn expected_total_bytes(source_extent: Option<u64>, max_bytes: Option<u64>) -> Option<u64> {
    let extent = source_extent?;
    Some(max_bytes.map_or(extent, |limit| extent.min(limit)))
}
