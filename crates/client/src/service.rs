//! Assembly service trait: the remote collaborator boundary.

use std::future::Future;
use std::pin::Pin;

use ferry_protocol::messages::{
    CancelUploadRequest, FinalizeUploadRequest, InitUploadRequest, InitUploadResponse,
    UploadChunkRequest, UploadChunkResponse,
};

use crate::error::UploadError;

/// Boxed future returned by [`AssemblyService`] methods.
pub type ServiceFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, UploadError>> + Send + 'a>>;

/// Abstract connection to the remote assembly service.
///
/// Callers implement this on top of their actual HTTP client. Using a
/// trait keeps upload logic decoupled from transport and testable with
/// mocks. Implementations map transport failures to
/// [`UploadError::Service`]; the client treats those as retryable at the
/// chunk level.
pub trait AssemblyService: Send + Sync {
    /// Opens an upload session for one file.
    fn init_upload(&self, req: InitUploadRequest) -> ServiceFuture<'_, InitUploadResponse>;

    /// Sends one chunk for ingestion.
    ///
    /// Chunks may arrive out of order; the service reassembles by
    /// `chunk_number`.
    fn upload_chunk(&self, req: UploadChunkRequest) -> ServiceFuture<'_, UploadChunkResponse>;

    /// Assembles all received chunks into the final artifact and verifies
    /// the whole-file digest.
    ///
    /// The result payload is opaque to the client and passed through to
    /// the caller.
    fn finalize_upload(&self, req: FinalizeUploadRequest) -> ServiceFuture<'_, serde_json::Value>;

    /// Tears down a session. Best-effort: the client logs failures here
    /// and never surfaces them.
    fn cancel_upload(&self, req: CancelUploadRequest) -> ServiceFuture<'_, ()>;
}
