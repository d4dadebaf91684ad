const WORD: usize = std::mem::size_of::<u64>();

/// Returns `true` if every byte of `data` is zero.
///
/// Callers pass exactly the bytes they read, so a short final block is never
/// compared against stale buffer contents. An empty slice is all-zero.
pub fn is_zero(data: &[u8]) -> bool {
    let chunks = data.chunks_exact(WORD);
    let tail = chunks.remainder();
    chunks
        .map(|c| u64::from_ne_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
        .all(|w| w == 0)
        && tail.iter().all(|&b| b == 0)
}
