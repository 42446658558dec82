//! Single-chunk transmission with bounded retry and exponential backoff.

use std::time::Duration;

use ferry_protocol::messages::UploadChunkRequest;
use ferry_transfer::{ChunkDescriptor, digest_bytes};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::UploadError;
use crate::service::AssemblyService;

/// Remote acknowledgment state after one chunk is persisted.
///
/// `is_complete` is a hint only; authoritative completion is decided by
/// finalize.
#[derive(Debug, Clone, PartialEq)]
pub struct TransmitResult {
    pub chunks_received: u64,
    pub progress: f64,
    pub is_complete: bool,
}

/// Uploads one chunk, retrying transient failures with `2^attempt` second
/// backoff up to `max_retries` additional attempts.
///
/// Cancellation fails immediately with [`UploadError::Cancelled`] and is
/// never retried. The function mutates no shared state; the result is
/// returned for the session controller to fold in.
pub async fn send_chunk(
    service: &dyn AssemblyService,
    upload_id: &str,
    chunk: &ChunkDescriptor,
    data: Vec<u8>,
    max_retries: u32,
    cancel: &CancellationToken,
) -> Result<TransmitResult, UploadError> {
    let chunk_hash = digest_bytes(&data);
    let req = UploadChunkRequest {
        upload_id: upload_id.to_string(),
        chunk_number: chunk.index,
        chunk_hash,
        data,
    };

    let mut attempt = chunk.attempt;
    loop {
        if cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }

        let outcome = tokio::select! {
            _ = cancel.cancelled() => return Err(UploadError::Cancelled),
            result = service.upload_chunk(req.clone()) => result,
        };

        match outcome {
            Ok(resp) => {
                debug!(chunk = chunk.index, attempt, "chunk acknowledged");
                return Ok(TransmitResult {
                    chunks_received: resp.chunks_received,
                    progress: resp.progress,
                    is_complete: resp.is_complete,
                });
            }
            Err(UploadError::Cancelled) => return Err(UploadError::Cancelled),
            Err(err) if attempt < max_retries => {
                let delay = Duration::from_secs(1u64 << attempt);
                warn!(
                    chunk = chunk.index,
                    attempt,
                    delay_secs = delay.as_secs(),
                    error = %err,
                    "chunk transmission failed, backing off"
                );
                tokio::select! {
                    _ = cancel.cancelled() => return Err(UploadError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
                attempt += 1;
            }
            Err(err) => {
                return Err(UploadError::ChunkTransmitFailed {
                    index: chunk.index,
                    attempts: attempt + 1,
                    source: Box::new(err),
                });
            }
        }
    }
}
