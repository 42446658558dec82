//! Client configuration surface.

use ferry_protocol::types::ProgressSnapshot;
use ferry_transfer::DEFAULT_CHUNK_SIZE;

use crate::error::UploadError;

/// Default per-chunk retry ceiling.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default number of simultaneously in-flight chunk transmissions.
pub const DEFAULT_MAX_CONCURRENCY: usize = 3;

/// Callback invoked with a fresh snapshot after every state change.
pub type ProgressCallback = Box<dyn Fn(ProgressSnapshot) + Send + Sync>;

/// Callback invoked exactly once with the service's finalize payload.
pub type CompleteCallback = Box<dyn Fn(&serde_json::Value) + Send + Sync>;

/// Callback invoked exactly once with the user-facing error message.
pub type ErrorCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Tuning knobs and caller callbacks for an [`UploadController`].
///
/// [`UploadController`]: crate::controller::UploadController
pub struct UploadOptions {
    /// Chunk granularity in bytes; trades memory for per-chunk overhead.
    pub chunk_size: u64,
    /// Per-chunk retry ceiling for transient failures.
    pub max_retries: u32,
    /// Concurrency ceiling for in-flight chunk transmissions.
    pub max_concurrency: usize,
    pub on_progress: Option<ProgressCallback>,
    pub on_complete: Option<CompleteCallback>,
    pub on_error: Option<ErrorCallback>,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            on_progress: None,
            on_complete: None,
            on_error: None,
        }
    }
}

impl UploadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_on_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn with_on_complete(mut self, callback: CompleteCallback) -> Self {
        self.on_complete = Some(callback);
        self
    }

    pub fn with_on_error(mut self, callback: ErrorCallback) -> Self {
        self.on_error = Some(callback);
        self
    }

    /// Rejects configurations that cannot produce a valid upload plan.
    pub(crate) fn validate(&self) -> Result<(), UploadError> {
        if self.chunk_size == 0 {
            return Err(UploadError::InvalidConfiguration(
                "chunk size must be greater than zero".into(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(UploadError::InvalidConfiguration(
                "concurrency ceiling must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
