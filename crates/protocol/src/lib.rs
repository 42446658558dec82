//! Wire protocol types for Ferry client / assembly service communication.
//!
//! All payloads serialize as camelCase JSON. Chunk bytes are base64-encoded
//! in JSON, matching the service's `[]byte` handling.

pub mod messages;
pub mod types;

pub use messages::{
    CancelUploadRequest, FinalizeUploadRequest, InitUploadRequest, InitUploadResponse,
    UploadChunkRequest, UploadChunkResponse,
};
pub use types::{ProgressSnapshot, UploadState};
