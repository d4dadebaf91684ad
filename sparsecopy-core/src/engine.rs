//! The block scanning engine.
//!
//! [`copy_blocks`] reads the source one block at a time. Blocks with any
//! non-zero byte are written. All-zero blocks are skipped with a seek, which
//! leaves a hole, unless the destination already holds non-zero data inside
//! its original extent at that position; those blocks are written as zeros so
//! the old data is overwritten rather than left behind.
use crate::config::Config;
use crate::consistency::{ConsistencyChecker, SkipSafety};
use crate::error::{Result, SparseCopyError};
use crate::progress::{Progress, ProgressTracker};
use crate::stats::{Statistics, expected_total_bytes};
use crate::stream::{Destination, DestinationStream, SourceStream};
use crate::sync::SyncScheduler;
use crate::zero::is_zero;
use std::io::Read;
use tracing::{debug, trace};

/// Allocates a zeroed buffer of `size` bytes, reporting failure instead of
/// aborting.
pub(crate) fn alloc_block(size: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(size)
        .map_err(|_| SparseCopyError::Allocation { size })?;
    buf.resize(size, 0);
    Ok(buf)
}

/// What the block loop produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopOutcome {
    /// Counters for the blocks processed.
    pub statistics: Statistics,
    /// The byte limit was reached while the source still had data, and
    /// `error_on_remainder` asked for that to be treated as a failure.
    pub remainder_exceeded: bool,
}

/// Mutable state owned by one run of the loop.
#[derive(Debug)]
struct TransferState {
    /// Bytes still allowed from the source; `None` is unbounded.
    remaining: Option<u64>,
    sync: SyncScheduler,
    progress: ProgressTracker,
}

impl TransferState {
    /// How many bytes to request next, or `None` once the budget is spent.
    fn next_request(&self, block_size: usize) -> Option<usize> {
        match self.remaining {
            Some(0) => None,
            Some(remaining) => {
                Some(usize::try_from(remaining).map_or(block_size, |r| r.min(block_size)))
            }
            None => Some(block_size),
        }
    }

    fn consume(&mut self, n: u64) {
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= n;
        }
    }
}

/// Checks that the first block of the destination is zero.
///
/// Reads up to `buffer.len()` bytes from offset 0 and leaves the cursor at
/// `restore_to`.
fn verify_first_block_zero<D: Destination>(
    destination: &mut DestinationStream<D>,
    buffer: &mut [u8],
    restore_to: u64,
) -> Result<()> {
    destination.seek_to(0, "rewind destination for zero check")?;
    let read = destination.read_probe(buffer)?;
    destination.seek_to(restore_to, "restore destination position")?;
    if is_zero(&buffer[..read]) {
        Ok(())
    } else {
        Err(SparseCopyError::InitialZeroCheck)
    }
}

/// Runs the block scanning loop.
///
/// The destination cursor must already sit at `config.seek_position`; on
/// return it sits at `seek_position + total_bytes_processed`. The destination
/// length is not adjusted here, see [`crate::finalize`].
///
/// `on_progress` is called whenever the displayed percentage changes, if
/// `config.show_progress` is set and the source extent is known.
///
/// # Errors
///
/// Any read, write, or seek failure aborts the loop. When
/// `config.verify_first_block_zero` is set and the destination's first block
/// is not zero, nothing is copied and
/// [`SparseCopyError::InitialZeroCheck`] is returned.
pub fn copy_blocks<R, D, F>(
    config: &Config,
    source: &mut SourceStream<R>,
    destination: &mut DestinationStream<D>,
    mut on_progress: F,
) -> Result<LoopOutcome>
where
    R: Read,
    D: Destination,
    F: FnMut(Progress),
{
    config.validate()?;
    let block_size = usize::try_from(config.block_size)
        .map_err(|_| SparseCopyError::BadArgument("block size too large".into()))?;

    let expected = expected_total_bytes(source.extent(), config.max_bytes);
    let mut statistics = Statistics::new(expected);
    let mut buffer = alloc_block(block_size)?;
    let mut checker = ConsistencyChecker::new(block_size, config.skip_consistency_check)?;
    let mut state = TransferState {
        remaining: config.max_bytes,
        sync: SyncScheduler::new(config.sync_threshold()),
        progress: if config.show_progress {
            ProgressTracker::new(expected)
        } else {
            ProgressTracker::disabled()
        },
    };

    if config.verify_first_block_zero {
        verify_first_block_zero(destination, &mut buffer, config.seek_position)?;
    }

    debug!(
        block_size,
        seek_position = config.seek_position,
        original_extent = destination.original_extent(),
        expected = ?expected,
        "starting sparse copy"
    );

    while let Some(request) = state.next_request(block_size) {
        let n = source.read_block(&mut buffer[..request])?;
        if n == 0 {
            break;
        }
        let len = n as u64;
        state.consume(len);
        let block = &buffer[..n];

        let skip = is_zero(block) && {
            let position = destination.position()?;
            match checker.check(destination, position, n)? {
                SkipSafety::Safe => true,
                SkipSafety::Unsafe => {
                    trace!(position, len, "destination not zero; writing zero block");
                    statistics.bytes_nonzero_destination += len;
                    false
                }
            }
        };

        if skip {
            destination.skip(len)?;
            statistics.bytes_skipped_sparse += len;
        } else {
            destination.write_block(block)?;
            statistics.bytes_written_real += len;
            if state.sync.record(destination, len) {
                trace!(written = statistics.bytes_written_real, "data sync checkpoint");
            }
        }

        if let Some(progress) = state.progress.update(statistics.total_bytes_processed()) {
            on_progress(progress);
        }
    }

    let remainder_exceeded =
        state.remaining == Some(0) && config.error_on_remainder && source_has_more(source)?;

    debug!(
        real = statistics.bytes_written_real,
        sparse = statistics.bytes_skipped_sparse,
        nonzero_destination = statistics.bytes_nonzero_destination,
        unsynced = state.sync.pending(),
        remainder_exceeded,
        "block loop finished"
    );

    Ok(LoopOutcome {
        statistics,
        remainder_exceeded,
    })
}

/// Whether at least one more byte can be read from the source.
fn source_has_more<R: Read>(source: &mut SourceStream<R>) -> Result<bool> {
    let mut probe = [0u8; 1];
    Ok(source.read_block(&mut probe)? > 0)
}
