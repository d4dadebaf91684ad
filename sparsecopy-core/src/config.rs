//! Configuration for a sparse transfer.

use crate::error::{Result, SparseCopyError};

/// Default block size in bytes.
pub const DEFAULT_BLOCK_SIZE: u64 = 512;

/// Parameters governing one transfer.
///
/// A `Config` is built once by the front-end, checked with
/// [`Config::validate`], and then only read by the engine.
///
/// # Examples
///
/// ```
/// use sparsecopy_core::config::Config;
///
/// let config = Config::default()
///     .with_block_size(4096)
///     .with_max_bytes(Some(1 << 20))
///     .with_overlay_existing(true);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Size of each scanned block in bytes. Must be non-zero.
    pub block_size: u64,

    /// Offset in the destination at which writing starts.
    pub seek_position: u64,

    /// Maximum number of bytes to take from the source.
    ///
    /// `None` copies until end of input, `Some(0)` copies nothing.
    pub max_bytes: Option<u64>,

    /// Flush destination data every this many materialized bytes.
    ///
    /// `None` or `Some(0)` disables periodic flushing.
    pub sync_every: Option<u64>,

    /// Open the destination without truncating it and superimpose the source.
    pub overlay_existing: bool,

    /// Skip blocks without confirming the destination already holds zeros.
    pub skip_consistency_check: bool,

    /// Refuse to run unless the first destination block is zero.
    pub verify_first_block_zero: bool,

    /// Suppress informational output.
    pub quiet: bool,

    /// Report progress while copying.
    pub show_progress: bool,

    /// Fail if the source holds more than `max_bytes`.
    pub error_on_remainder: bool,

    /// Explicit final length of a regular-file destination.
    pub final_size: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            seek_position: 0,
            max_bytes: None,
            sync_every: None,
            overlay_existing: false,
            skip_consistency_check: false,
            verify_first_block_zero: false,
            quiet: false,
            show_progress: false,
            error_on_remainder: false,
            final_size: None,
        }
    }
}

impl Config {
    /// Checks the invariants the engine relies on.
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(SparseCopyError::BadArgument(format!(
                "bad block size {}",
                self.block_size
            )));
        }
        if usize::try_from(self.block_size).is_err() {
            return Err(SparseCopyError::BadArgument(format!(
                "block size {} does not fit in memory",
                self.block_size
            )));
        }
        if i64::try_from(self.seek_position).is_err() {
            return Err(SparseCopyError::BadArgument(format!(
                "bad seek position {}",
                self.seek_position
            )));
        }
        Ok(())
    }

    /// Whether the destination must be opened for reading as well as writing.
    pub fn needs_destination_read(&self) -> bool {
        self.verify_first_block_zero || !self.skip_consistency_check
    }

    /// Sync threshold, with a zero threshold treated as disabled.
    pub(crate) fn sync_threshold(&self) -> Option<u64> {
        self.sync_every.filter(|&n| n > 0)
    }

    /// Sets the block size.
    pub fn with_block_size(mut self, block_size: u64) -> Self {
        self.block_size = block_size;
        self
    }

    /// Sets the destination start offset.
    pub fn with_seek_position(mut self, seek_position: u64) -> Self {
        self.seek_position = seek_position;
        self
    }

    /// Sets the source byte limit.
    pub fn with_max_bytes(mut self, max_bytes: Option<u64>) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Sets the periodic flush threshold.
    pub fn with_sync_every(mut self, sync_every: Option<u64>) -> Self {
        self.sync_every = sync_every;
        self
    }

    /// Sets overlay mode.
    pub fn with_overlay_existing(mut self, overlay: bool) -> Self {
        self.overlay_existing = overlay;
        self
    }

    /// Disables or enables the destination consistency check.
    pub fn with_skip_consistency_check(mut self, skip: bool) -> Self {
        self.skip_consistency_check = skip;
        self
    }

    /// Enables the initial first-block zero check.
    pub fn with_verify_first_block_zero(mut self, verify: bool) -> Self {
        self.verify_first_block_zero = verify;
        self
    }

    /// Sets quiet mode.
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Enables progress reporting.
    pub fn with_show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Fails the transfer when input remains beyond `max_bytes`.
    pub fn with_error_on_remainder(mut self, error: bool) -> Self {
        self.error_on_remainder = error;
        self
    }

    /// Requests an explicit final destination size.
    pub fn with_final_size(mut self, final_size: Option<u64>) -> Self {
        self.final_size = final_size;
        self
    }
}
