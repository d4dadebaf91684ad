//! Reconciles the destination's length after the block loop.
//!
//! Skipping the trailing blocks of a copy only moves the cursor; it does not
//! make a regular file any longer. The finalizer sets the length explicitly.
//! Block devices have a fixed size, so instead they get a sync barrier and a
//! partition table re-read, since the copy may have written a new table.
use crate::config::Config;
use crate::device::DeviceKind;
use crate::error::{Result, SparseCopyError};
use crate::platform;
use crate::stream::{Destination, DestinationStream};
use std::io;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Attempts made to re-read a busy device's partition table.
pub const RESCAN_ATTEMPTS: u32 = 40;

/// Pause between partition table re-read attempts.
pub const RESCAN_DELAY: Duration = Duration::from_millis(250);

/// How hard to try re-reading a block device's partition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RescanPolicy {
    /// Maximum number of attempts, including the first.
    pub attempts: u32,
    /// Delay between attempts while the device reports busy.
    pub delay: Duration,
}

impl Default for RescanPolicy {
    fn default() -> Self {
        Self {
            attempts: RESCAN_ATTEMPTS,
            delay: RESCAN_DELAY,
        }
    }
}

/// What finalization did to the destination.
#[derive(Debug)]
pub enum Finalization {
    /// A regular file was set to `length` bytes.
    Resized {
        /// The final length.
        length: u64,
    },
    /// A block device's partition table was re-read.
    PartitionTableReread {
        /// Attempts it took.
        attempts: u32,
    },
    /// A block device's partition table could not be re-read. The copy
    /// itself succeeded.
    PartitionTableUnchanged {
        /// Attempts made.
        attempts: u32,
        /// The last refusal.
        error: io::Error,
    },
    /// The destination is neither a regular file nor a block device and was
    /// left as is.
    Untouched(DeviceKind),
}

/// Finalizes the destination after the block loop.
///
/// For a regular file the length becomes `max(original extent, cursor)`, or
/// `config.final_size` when one was requested, even if that cuts off data
/// that was just written. `final_size` has no effect on block devices.
///
/// `on_rescan` is called once, before the sync barrier, when the destination
/// is a block device whose partition table is about to be re-read.
///
/// # Errors
///
/// Fails if the destination cannot be stat'ed or a regular file cannot be
/// resized. A failed partition table re-read is not an error.
pub fn finalize<D: Destination>(
    destination: &mut DestinationStream<D>,
    config: &Config,
    policy: &RescanPolicy,
    on_rescan: impl FnOnce(),
) -> Result<Finalization> {
    let kind = destination.get_ref().kind().map_err(SparseCopyError::Stat)?;
    debug!(%kind, "finalizing destination");

    match kind {
        DeviceKind::RegularFile => {
            let cursor = destination.position()?;
            let length = config
                .final_size
                .unwrap_or_else(|| cursor.max(destination.original_extent()));
            destination
                .get_mut()
                .set_len(length)
                .map_err(|source| SparseCopyError::Truncate { length, source })?;
            Ok(Finalization::Resized { length })
        }
        DeviceKind::BlockDevice => {
            if config.final_size.is_some() {
                debug!("final size ignored for block device");
            }
            info!("rereading partition table");
            on_rescan();
            Ok(rescan_partitions(destination.get_mut(), policy))
        }
        DeviceKind::Other => Ok(Finalization::Untouched(kind)),
    }
}

fn rescan_partitions<D: Destination>(device: &mut D, policy: &RescanPolicy) -> Finalization {
    if let Err(e) = device.sync_barrier() {
        warn!(error = %e, "sync before partition table re-read failed");
    }

    let mut attempts = 0;
    loop {
        attempts += 1;
        match device.reread_partition_table() {
            Ok(()) => return Finalization::PartitionTableReread { attempts },
            Err(e) if platform::is_device_busy(&e) && attempts < policy.attempts => {
                debug!(attempts, "device busy; retrying partition table re-read");
                thread::sleep(policy.delay);
            }
            Err(error) => {
                info!(attempts, %error, "partition table not re-read");
                return Finalization::PartitionTableUnchanged { attempts, error };
            }
        }
    }
}
