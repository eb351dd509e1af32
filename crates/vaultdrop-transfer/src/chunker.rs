//! Fixed-size chunking.

use crate::CHUNK_SIZE;

/// Number of chunks needed for `size` bytes.
///
/// An empty file has zero chunks.
#[must_use]
pub fn chunk_count(size: u64) -> u64 {
    size.div_ceil(CHUNK_SIZE as u64)
}

/// Iterate over `data` in send order, pairing each chunk with its index.
///
/// Every chunk is `CHUNK_SIZE` bytes except possibly the last.
pub fn chunks(data: &[u8]) -> impl ExactSizeIterator<Item = (u64, &[u8])> {
    data.chunks(CHUNK_SIZE)
        .enumerate()
        .map(|(index, chunk)| (index as u64, chunk))
}
