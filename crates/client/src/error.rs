//! Upload error types.

/// Errors produced during a chunked upload.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("an upload is already in progress")]
    UploadAlreadyInProgress,

    #[error("session initialization failed: {0}")]
    SessionInitFailed(String),

    #[error("chunk {index} failed after {attempts} attempts: {source}")]
    ChunkTransmitFailed {
        index: u64,
        attempts: u32,
        #[source]
        source: Box<UploadError>,
    },

    #[error("upload cancelled")]
    Cancelled,

    #[error("finalize failed: {0}")]
    FinalizeFailed(String),

    #[error("no file held from a failed upload to retry")]
    NoFileToRetry,

    #[error("service error: {0}")]
    Service(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transfer error: {0}")]
    Transfer(#[from] ferry_transfer::TransferError),
}
