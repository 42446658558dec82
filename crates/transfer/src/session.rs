use std::sync::RwLock;

use ferry_protocol::types::{ProgressSnapshot, UploadState};

/// Tracks one upload session (thread-safe).
///
/// The session controller is the only writer; callers may hold a clone of
/// the `Arc` and read a live [`ProgressSnapshot`] at any time.
pub struct UploadSession {
    inner: RwLock<SessionInner>,
}

struct SessionInner {
    session_id: Option<String>,
    file_name: String,
    total_size: u64,
    chunk_size: u64,
    total_chunks: u64,
    chunks_acknowledged: u64,
    state: UploadState,
    error: Option<String>,
}

impl UploadSession {
    /// Creates a new idle session for one source file.
    pub fn new(file_name: String, total_size: u64, chunk_size: u64, total_chunks: u64) -> Self {
        Self {
            inner: RwLock::new(SessionInner {
                session_id: None,
                file_name,
                total_size,
                chunk_size,
                total_chunks,
                chunks_acknowledged: 0,
                state: UploadState::Idle,
                error: None,
            }),
        }
    }

    /// Marks the session as waiting on the remote session-open call.
    pub fn initializing(&self) {
        let mut s = self.inner.write().unwrap();
        s.state = UploadState::Initializing;
    }

    /// Records the remote-issued session id and enters chunk transmission.
    ///
    /// The id is immutable once assigned.
    pub fn transmitting(&self, session_id: String) {
        let mut s = self.inner.write().unwrap();
        if s.session_id.is_none() {
            s.session_id = Some(session_id);
        }
        s.state = UploadState::Transmitting;
    }

    /// Folds a cumulative chunk count acknowledged by the remote side.
    ///
    /// Acknowledgments may settle out of order; the count never decreases.
    pub fn acknowledge(&self, chunks_received: u64) {
        let mut s = self.inner.write().unwrap();
        s.chunks_acknowledged = s.chunks_acknowledged.max(chunks_received);
    }

    /// Marks the session as waiting on final assembly.
    pub fn finalizing(&self) {
        let mut s = self.inner.write().unwrap();
        s.state = UploadState::Finalizing;
    }

    /// Marks the session as completed.
    pub fn complete(&self) {
        let mut s = self.inner.write().unwrap();
        s.state = UploadState::Complete;
    }

    /// Marks the session as failed with an error message.
    pub fn fail(&self, err: &str) {
        let mut s = self.inner.write().unwrap();
        s.state = UploadState::Failed;
        s.error = Some(err.to_string());
    }

    /// Marks the session as cancelled.
    pub fn cancel(&self) {
        let mut s = self.inner.write().unwrap();
        s.state = UploadState::Cancelled;
        s.error = Some("upload cancelled".to_string());
    }

    /// Returns the remote-issued session id, if the session was opened.
    pub fn session_id(&self) -> Option<String> {
        let s = self.inner.read().unwrap();
        s.session_id.clone()
    }

    /// Returns the current state.
    pub fn state(&self) -> UploadState {
        let s = self.inner.read().unwrap();
        s.state.clone()
    }

    /// Returns `true` while the session still has work in flight.
    pub fn is_active(&self) -> bool {
        let s = self.inner.read().unwrap();
        s.state.is_active()
    }

    /// Name of the source file.
    pub fn file_name(&self) -> String {
        let s = self.inner.read().unwrap();
        s.file_name.clone()
    }

    /// Total size of the source file in bytes.
    pub fn total_size(&self) -> u64 {
        let s = self.inner.read().unwrap();
        s.total_size
    }

    /// Configured chunk size in bytes.
    pub fn chunk_size(&self) -> u64 {
        let s = self.inner.read().unwrap();
        s.chunk_size
    }

    /// Total number of planned chunks.
    pub fn total_chunks(&self) -> u64 {
        let s = self.inner.read().unwrap();
        s.total_chunks
    }

    /// Count of chunks the remote side has confirmed persisted.
    pub fn chunks_acknowledged(&self) -> u64 {
        let s = self.inner.read().unwrap();
        s.chunks_acknowledged
    }

    /// Produces an immutable point-in-time view of the session.
    pub fn snapshot(&self) -> ProgressSnapshot {
        let s = self.inner.read().unwrap();
        let percent = if s.total_chunks == 0 {
            0.0
        } else {
            s.chunks_acknowledged as f64 / s.total_chunks as f64 * 100.0
        };
        ProgressSnapshot {
            session_id: s.session_id.clone().unwrap_or_default(),
            file_name: s.file_name.clone(),
            total_size: s.total_size,
            chunks_uploaded: s.chunks_acknowledged,
            total_chunks: s.total_chunks,
            percent_complete: percent,
            is_complete: s.state == UploadState::Complete,
            error: s.error.clone(),
        }
    }
}
