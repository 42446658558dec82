use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::TransferError;
use crate::plan::ChunkDescriptor;

/// Random-access reader for planned byte ranges of the source file.
///
/// Ranges are read on demand so that only in-flight chunks hold buffers;
/// peak memory stays at one buffer per concurrent transmission rather than
/// the whole file.
pub struct SliceReader {
    file: std::fs::File,
    file_size: u64,
}

impl SliceReader {
    /// Opens `path` for range reads.
    pub fn open(path: &Path) -> Result<Self, TransferError> {
        let file = std::fs::File::open(path)?;
        let file_size = file.metadata()?.len();
        Ok(Self { file, file_size })
    }

    /// Total file size in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Reads the bytes covered by `chunk`.
    ///
    /// The planned range must lie within the file; a file that shrank
    /// between planning and reading surfaces as [`TransferError::ShortRead`].
    pub fn read_range(&mut self, chunk: &ChunkDescriptor) -> Result<Vec<u8>, TransferError> {
        let len = chunk.len() as usize;
        if len == 0 {
            return Ok(Vec::new());
        }

        self.file.seek(SeekFrom::Start(chunk.start))?;
        let mut buf = vec![0u8; len];
        let mut read = 0usize;
        while read < len {
            let n = self.file.read(&mut buf[read..])?;
            if n == 0 {
                break;
            }
            read += n;
        }
        if read != len {
            return Err(TransferError::ShortRead {
                expected: len,
                actual: read,
            });
        }
        Ok(buf)
    }
}
