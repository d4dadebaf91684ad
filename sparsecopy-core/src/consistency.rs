//! Destination consistency checking.
//!
//! Skipping a zero block leaves whatever the destination already holds at
//! that position. That is only correct if the destination is already zero
//! there, so before a skip inside the destination's original extent the
//! checker reads the region back and looks.
use crate::engine::alloc_block;
use crate::error::Result;
use crate::stream::{Destination, DestinationStream};
use crate::zero::is_zero;

/// Whether a zero source block may be skipped instead of written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipSafety {
    /// The destination already reads as zero here (or checking is off).
    Safe,
    /// The destination holds non-zero data here; the block must be written.
    Unsafe,
}

/// Probes the destination before a hole is left in it.
#[derive(Debug)]
pub(crate) struct ConsistencyChecker {
    enabled: bool,
    scratch: Vec<u8>,
}

impl ConsistencyChecker {
    /// Creates a checker able to probe up to `block_size` bytes at a time.
    /// When `skip_check` is set no buffer is allocated and every skip is safe.
    pub(crate) fn new(block_size: usize, skip_check: bool) -> Result<Self> {
        let scratch = if skip_check {
            Vec::new()
        } else {
            alloc_block(block_size)?
        };
        Ok(Self {
            enabled: !skip_check,
            scratch,
        })
    }

    /// Decides whether `len` bytes at `position` may be skipped.
    ///
    /// The probe reads at most `len` bytes and restores the cursor to
    /// `position` before returning. If the destination ends inside the span,
    /// only the bytes that exist are classified.
    pub(crate) fn check<D: Destination>(
        &mut self,
        destination: &mut DestinationStream<D>,
        position: u64,
        len: usize,
    ) -> Result<SkipSafety> {
        if !self.enabled || position >= destination.original_extent() {
            return Ok(SkipSafety::Safe);
        }

        let probe = &mut self.scratch[..len];
        let read = destination.read_probe(probe)?;
        destination.seek_to(position, "restore destination position")?;

        if is_zero(&probe[..read]) {
            Ok(SkipSafety::Safe)
        } else {
            Ok(SkipSafety::Unsafe)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn destination(content: Vec<u8>, at: u64) -> DestinationStream<Cursor<Vec<u8>>> {
        DestinationStream::new(Cursor::new(content), at).unwrap()
    }

    #[test]
    fn test_zero_region_is_safe() {
        let mut dest = destination(vec![0u8; 1024], 512);
        let mut checker = ConsistencyChecker::new(512, false).unwrap();
        assert_eq!(checker.check(&mut dest, 512, 512).unwrap(), SkipSafety::Safe);
        assert_eq!(dest.position().unwrap(), 512);
    }

    #[test]
    fn test_nonzero_region_is_unsafe_and_cursor_restored() {
        let mut content = vec![0u8; 1024];
        content[700] = 0xff;
        let mut dest = destination(content, 512);
        let mut checker = ConsistencyChecker::new(512, false).unwrap();
        assert_eq!(checker.check(&mut dest, 512, 512).unwrap(), SkipSafety::Unsafe);
        assert_eq!(dest.position().unwrap(), 512);
    }

    #[test]
    fn test_skip_check_is_always_safe() {
        let mut dest = destination(vec![1u8; 1024], 0);
        let mut checker = ConsistencyChecker::new(512, true).unwrap();
        assert_eq!(checker.check(&mut dest, 0, 512).unwrap(), SkipSafety::Safe);
    }

    #[test]
    fn test_beyond_original_extent_is_safe() {
        let mut dest = destination(vec![1u8; 512], 512);
        let mut checker = ConsistencyChecker::new(512, false).unwrap();
        assert_eq!(checker.check(&mut dest, 512, 512).unwrap(), SkipSafety::Safe);
    }

    #[test]
    fn test_probe_only_covers_candidate_length() {
        let mut content = vec![0u8; 512];
        content[300] = 1;
        let mut dest = destination(content, 0);
        let mut checker = ConsistencyChecker::new(512, false).unwrap();
        assert_eq!(checker.check(&mut dest, 0, 300).unwrap(), SkipSafety::Safe);
        assert_eq!(checker.check(&mut dest, 0, 301).unwrap(), SkipSafety::Unsafe);
    }

    #[test]
    fn test_short_destination_classifies_available_bytes() {
        let mut dest = destination(vec![0u8; 100], 0);
        let mut checker = ConsistencyChecker::new(512, false).unwrap();
        assert_eq!(checker.check(&mut dest, 0, 512).unwrap(), SkipSafety::Safe);
        assert_eq!(dest.position().unwrap(), 0);
    }
}
