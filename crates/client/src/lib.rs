//! Ferry upload client: chunked file upload with bounded concurrency,
//! per-chunk retry, and end-to-end integrity verification.
//!
//! This crate implements the **business logic** of the upload client. It is
//! a library crate with no transport dependency — callers provide an
//! [`AssemblyService`] implementation that bridges to the actual HTTP
//! client.
//!
//! # Pipeline
//!
//! 1. **Init** — open an upload session on the assembly service
//! 2. **Plan** — compute the ordered chunk ranges
//! 3. **Transmit** — send chunks with a sliding concurrency window
//! 4. **Finalize** — verify the whole-file digest and assemble the artifact

pub mod controller;
pub mod error;
pub mod options;
pub mod scheduler;
pub mod service;
pub mod transmit;

// Re-export primary types for convenience.
pub use controller::UploadController;
pub use error::UploadError;
pub use options::{
    DEFAULT_MAX_CONCURRENCY, DEFAULT_MAX_RETRIES, CompleteCallback, ErrorCallback,
    ProgressCallback, UploadOptions,
};
pub use scheduler::ChunkAck;
pub use service::{AssemblyService, ServiceFuture};
pub use transmit::TransmitResult;
