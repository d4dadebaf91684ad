//! End-to-end sparse transfers.
//!
//! [`transfer`] drives an already opened pair of streams through the block
//! loop and the finalizer. [`run`] opens the streams from paths first and is
//! what a front-end normally calls.
use crate::config::Config;
use crate::engine::copy_blocks;
use crate::error::{Result, SparseCopyError};
use crate::finalize::{Finalization, RescanPolicy, finalize};
use crate::progress::Progress;
use crate::stats::{Statistics, expected_total_bytes};
use crate::stream::{Destination, DestinationStream, SourceStream, open_destination, open_source};
use std::io::Read;
use std::path::Path;
use tracing::info;

/// The result of a successful transfer.
#[derive(Debug)]
pub struct Report {
    /// Final counters.
    pub statistics: Statistics,
    /// What was done to the destination's extent.
    pub finalization: Finalization,
}

/// Copies `source` into `destination` and finalizes the destination.
///
/// The destination is finalized even when the source turns out to hold more
/// than `config.max_bytes` with `config.error_on_remainder` set; the data
/// copied up to the limit stays in place and
/// [`SparseCopyError::RemainderExceedsLimit`] is returned afterwards.
///
/// `on_rescan` is forwarded to [`finalize`].
pub fn transfer<R, D, F>(
    config: &Config,
    source: &mut SourceStream<R>,
    destination: &mut DestinationStream<D>,
    policy: &RescanPolicy,
    on_progress: F,
    on_rescan: impl FnOnce(),
) -> Result<Report>
where
    R: Read,
    D: Destination,
    F: FnMut(Progress),
{
    let outcome = copy_blocks(config, source, destination, on_progress)?;
    let finalization = finalize(destination, config, policy, on_rescan)?;

    if outcome.remainder_exceeded {
        return Err(SparseCopyError::RemainderExceedsLimit {
            limit: config.max_bytes.unwrap_or_default(),
        });
    }

    info!(statistics = %outcome.statistics, "sparse copy complete");
    Ok(Report {
        statistics: outcome.statistics,
        finalization,
    })
}

/// Copies the file at `source_path` (or standard input for `-`) to
/// `destination_path`, leaving holes for zero blocks.
///
/// # Arguments
///
/// * `source_path` - File or device to read, or `-` for standard input.
/// * `destination_path` - File or device to write. Created if missing.
/// * `config` - Transfer parameters.
/// * `on_start` - Called once before copying with the number of bytes the
///   transfer expects to process, if that is known. It is only known when the
///   source is seekable.
/// * `on_progress` - Called when the percentage complete changes, if
///   `config.show_progress` is set.
/// * `on_rescan` - Called after copying, before a block device's partition
///   table is re-read.
///
/// # Errors
///
/// Returns an error if either stream cannot be opened, if any I/O on them
/// fails, if the initial zero check fails, or if more input remained than
/// `config.max_bytes` allows while `config.error_on_remainder` is set.
pub fn run<F>(
    source_path: &Path,
    destination_path: &Path,
    config: &Config,
    on_start: impl FnOnce(Option<u64>),
    on_progress: F,
    on_rescan: impl FnOnce(),
) -> Result<Report>
where
    F: FnMut(Progress),
{
    config.validate()?;
    let mut source = open_source(source_path)?;
    let mut destination = open_destination(destination_path, config)?;

    on_start(expected_total_bytes(source.extent(), config.max_bytes));

    transfer(
        config,
        &mut source,
        &mut destination,
        &RescanPolicy::default(),
        on_progress,
        on_rescan,
    )
}
