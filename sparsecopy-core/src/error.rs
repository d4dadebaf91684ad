//! Error types for sparse transfer operations.
//!
//! Every fatal condition the engine can hit has its own variant, so a
//! front-end can tell a failed destination read apart from a failed write
//! without inspecting message strings. [`SparseCopyError::exit_code`] gives
//! the process exit status conventionally used for each kind.

use std::io;
use thiserror::Error;

/// Result type alias using `SparseCopyError`.
pub type Result<T> = std::result::Result<T, SparseCopyError>;

/// Coarse classification of a [`SparseCopyError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A configuration value or argument was rejected.
    BadArgument,
    /// The source could not be opened.
    SourceOpenFailed,
    /// The destination could not be opened or created.
    DestinationOpenFailed,
    /// A seek on either stream failed.
    SeekFailed,
    /// The block buffers could not be allocated.
    AllocationFailed,
    /// Reading back destination content failed.
    DestinationReadFailed,
    /// Reading from the source failed.
    SourceReadFailed,
    /// Writing to the destination failed or was short.
    WriteFailed,
    /// The first destination block was not zero.
    InitialZeroCheckFailed,
    /// Setting the final destination length failed.
    TruncateFailed,
    /// The source held more data than the configured maximum.
    RemainderExceedsLimit,
    /// The destination's file type could not be determined.
    StatFailed,
}

impl ErrorKind {
    /// Process exit status for this kind of failure.
    pub fn exit_code(self) -> u8 {
        match self {
            Self::BadArgument => 1,
            Self::SourceOpenFailed => 2,
            Self::DestinationOpenFailed => 3,
            Self::SeekFailed => 4,
            Self::AllocationFailed => 5,
            Self::DestinationReadFailed => 6,
            Self::SourceReadFailed => 8,
            Self::WriteFailed => 9,
            Self::TruncateFailed => 10,
            Self::InitialZeroCheckFailed => 11,
            Self::RemainderExceedsLimit => 12,
            Self::StatFailed => 13,
        }
    }
}

/// Errors that abort a sparse transfer.
#[derive(Error, Debug)]
pub enum SparseCopyError {
    /// A configuration value was rejected before any I/O took place.
    #[error("bad argument: {0}")]
    BadArgument(String),

    /// The source could not be opened.
    #[error("could not open source file: {0}")]
    SourceOpen(#[source] io::Error),

    /// The destination could not be opened.
    #[error("could not open destination file: {0}")]
    DestinationOpen(#[source] io::Error),

    /// A seek failed. `context` names the stream and purpose.
    #[error("seek failed ({context}): {source}")]
    Seek {
        /// What the seek was for.
        context: &'static str,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The block buffer could not be allocated.
    #[error("could not allocate a {size} byte block buffer")]
    Allocation {
        /// Requested buffer size in bytes.
        size: usize,
    },

    /// Reading destination content for a zero check failed.
    #[error("check read of destination failed: {0}")]
    DestinationRead(#[source] io::Error),

    /// Reading from the source failed.
    #[error("read of source failed: {0}")]
    SourceRead(#[source] io::Error),

    /// Writing to the destination failed.
    #[error("write to destination failed: {0}")]
    Write(#[source] io::Error),

    /// The first destination block contained non-zero data.
    #[error("destination file failed initial zero block check")]
    InitialZeroCheck,

    /// Setting the destination length failed.
    #[error("truncate of destination to {length} bytes failed: {source}")]
    Truncate {
        /// Length that was requested.
        length: u64,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// More input was available than `max_bytes` permits.
    #[error("more data supplied than maximum permissible ({limit} bytes)")]
    RemainderExceedsLimit {
        /// The configured byte limit.
        limit: u64,
    },

    /// The destination could not be stat'ed.
    #[error("stat of destination failed: {0}")]
    Stat(#[source] io::Error),
}

impl SparseCopyError {
    /// Shorthand for a failed seek.
    pub(crate) fn seek(context: &'static str, source: io::Error) -> Self {
        Self::Seek { context, source }
    }

    /// Returns the [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BadArgument(_) => ErrorKind::BadArgument,
            Self::SourceOpen(_) => ErrorKind::SourceOpenFailed,
            Self::DestinationOpen(_) => ErrorKind::DestinationOpenFailed,
            Self::Seek { .. } => ErrorKind::SeekFailed,
            Self::Allocation { .. } => ErrorKind::AllocationFailed,
            Self::DestinationRead(_) => ErrorKind::DestinationReadFailed,
            Self::SourceRead(_) => ErrorKind::SourceReadFailed,
            Self::Write(_) => ErrorKind::WriteFailed,
            Self::InitialZeroCheck => ErrorKind::InitialZeroCheckFailed,
            Self::Truncate { .. } => ErrorKind::TruncateFailed,
            Self::RemainderExceedsLimit { .. } => ErrorKind::RemainderExceedsLimit,
            Self::Stat(_) => ErrorKind::StatFailed,
        }
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        self.kind().exit_code()
    }

    /// Returns `true` if the error reports a violated caller precondition
    /// rather than an operating-system failure.
    pub fn is_consistency_violation(&self) -> bool {
        matches!(
            self,
            Self::InitialZeroCheck | Self::RemainderExceedsLimit { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        let kinds = [
            ErrorKind::BadArgument,
            ErrorKind::SourceOpenFailed,
            ErrorKind::DestinationOpenFailed,
            ErrorKind::SeekFailed,
            ErrorKind::AllocationFailed,
            ErrorKind::DestinationReadFailed,
            ErrorKind::SourceReadFailed,
            ErrorKind::WriteFailed,
            ErrorKind::InitialZeroCheckFailed,
            ErrorKind::TruncateFailed,
            ErrorKind::RemainderExceedsLimit,
            ErrorKind::StatFailed,
        ];
        let mut codes: Vec<u8> = kinds.iter().map(|k| k.exit_code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
        assert!(!codes.contains(&0));
    }

    #[test]
    fn test_consistency_violations() {
        assert!(SparseCopyError::InitialZeroCheck.is_consistency_violation());
        assert!(SparseCopyError::RemainderExceedsLimit { limit: 10 }.is_consistency_violation());
        let io_err = io::Error::other("disk on fire");
        assert!(!SparseCopyError::Write(io_err).is_consistency_violation());
    }

    #[test]
    fn test_seek_error_display_names_context() {
        let err = SparseCopyError::seek("sparse skip", io::Error::other("boom"));
        assert_eq!(err.kind(), ErrorKind::SeekFailed);
        assert!(err.to_string().contains("sparse skip"));
    }
}
