use crate::stream::{Destination, DestinationStream};
use tracing::debug;

/// Issues a data flush every `threshold` materialized bytes.
#[derive(Debug)]
pub(crate) struct SyncScheduler {
    threshold: Option<u64>,
    written_since_sync: u64,
}

impl SyncScheduler {
    /// `None` disables flushing.
    pub(crate) fn new(threshold: Option<u64>) -> Self {
        Self {
            threshold,
            written_since_sync: 0,
        }
    }

    /// Records a write of `n` bytes and flushes once the threshold is met.
    ///
    /// Returns `true` when a flush was requested. A failed flush is logged
    /// and otherwise ignored.
    pub(crate) fn record<D: Destination>(
        &mut self,
        destination: &mut DestinationStream<D>,
        n: u64,
    ) -> bool {
        self.written_since_sync += n;
        let Some(threshold) = self.threshold else {
            return false;
        };
        if self.written_since_sync < threshold {
            return false;
        }
        if let Err(e) = destination.get_mut().sync_data() {
            debug!(error = %e, "periodic data sync failed; continuing");
        }
        self.written_since_sync = 0;
        true
    }

    /// Bytes written since the last flush.
    pub(crate) fn pending(&self) -> u64 {
        self.written_since_sync
    }
}
