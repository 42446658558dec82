//! Chunk planning, integrity hashing, and upload session state.

mod digest;
mod plan;
mod session;
mod slice;

pub use digest::{digest_bytes, digest_file};
pub use plan::{ChunkDescriptor, plan};
pub use session::UploadSession;
pub use slice::SliceReader;

/// Default chunk size: 1 MiB.
///
/// Smaller chunks lower peak memory and retry cost, larger chunks reduce
/// per-chunk overhead (SHA-256, ACKs, HTTP round trips). Callers tune this
/// through the client's configuration surface.
pub const DEFAULT_CHUNK_SIZE: u64 = 1024 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,

    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },
}
