use crate::TransferError;

/// A single planned transfer unit: one contiguous byte range of the source
/// file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDescriptor {
    /// 0-based position in the upload sequence.
    pub index: u64,
    /// Inclusive start offset into the source file.
    pub start: u64,
    /// Exclusive end offset into the source file.
    pub end: u64,
    /// Transmission attempts made so far for this chunk.
    pub attempt: u32,
}

impl ChunkDescriptor {
    /// Length of the byte range in bytes.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Returns `true` for the zero-length chunk of an empty file.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Computes the ordered chunk sequence for a file of `total_size` bytes.
///
/// Ranges are contiguous, disjoint, and cover exactly `[0, total_size)`.
/// An empty file still produces one zero-length chunk so the session goes
/// through the full init → chunk → finalize exchange.
pub fn plan(total_size: u64, chunk_size: u64) -> Result<Vec<ChunkDescriptor>, TransferError> {
    if chunk_size == 0 {
        return Err(TransferError::InvalidChunkSize);
    }

    if total_size == 0 {
        return Ok(vec![ChunkDescriptor {
            index: 0,
            start: 0,
            end: 0,
            attempt: 0,
        }]);
    }

    let count = total_size.div_ceil(chunk_size);
    let mut chunks = Vec::with_capacity(count as usize);
    for index in 0..count {
        let start = index * chunk_size;
        let end = std::cmp::min(start + chunk_size, total_size);
        chunks.push(ChunkDescriptor {
            index,
            start,
            end,
            attempt: 0,
        });
    }
    Ok(chunks)
}
