//! Upload session controller: lifecycle state machine, progress
//! aggregation, cancellation, and cleanup.
//!
//! The controller is the single owner of session state. Chunk transmitters
//! report completions as messages; the controller folds them sequentially,
//! so no counter is ever mutated from two chunk completions at once.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use ferry_protocol::messages::{CancelUploadRequest, FinalizeUploadRequest, InitUploadRequest};
use ferry_transfer::{ChunkDescriptor, SliceReader, UploadSession, digest_file, plan};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::UploadError;
use crate::options::UploadOptions;
use crate::scheduler;
use crate::service::AssemblyService;

/// Drives one upload at a time through the full
/// init → transmit → finalize pipeline.
///
/// Exactly one upload is active per controller; a second
/// [`upload`](Self::upload) call while one is running is rejected with
/// [`UploadError::UploadAlreadyInProgress`]. Every accepted `upload` call
/// ends in exactly one of the `on_complete` / `on_error` callbacks.
pub struct UploadController {
    service: Arc<dyn AssemblyService>,
    options: UploadOptions,
    inner: Mutex<ControllerInner>,
}

struct ControllerInner {
    session: Option<Arc<UploadSession>>,
    cancel: CancellationToken,
    /// Source path retained from a failed attempt for `retry()`.
    /// Cleared on success and on explicit `cancel()`.
    source: Option<PathBuf>,
    last_error: Option<String>,
    busy: bool,
}

impl UploadController {
    /// Creates a controller bound to an assembly service.
    pub fn new(service: Arc<dyn AssemblyService>, options: UploadOptions) -> Self {
        Self {
            service,
            options,
            inner: Mutex::new(ControllerInner {
                session: None,
                cancel: CancellationToken::new(),
                source: None,
                last_error: None,
                busy: false,
            }),
        }
    }

    /// Uploads one file and returns the service's finalize payload.
    ///
    /// Rejected synchronously (no I/O, no network, no callbacks) with
    /// [`UploadError::UploadAlreadyInProgress`] while another upload is
    /// running, or [`UploadError::InvalidConfiguration`] for an unusable
    /// chunk size or concurrency ceiling.
    pub async fn upload(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<serde_json::Value, UploadError> {
        let path = path.as_ref().to_path_buf();

        self.options.validate()?;
        let cancel = {
            let mut inner = self.inner.lock().unwrap();
            if inner.busy {
                return Err(UploadError::UploadAlreadyInProgress);
            }
            inner.busy = true;
            inner.last_error = None;
            inner.source = Some(path.clone());
            inner.cancel = CancellationToken::new();
            inner.cancel.clone()
        };

        let prepared = self.prepare(&path).await;
        let (session, descriptors) = match prepared {
            Ok(prepared) => prepared,
            Err(err) => return self.settle_before_session(err),
        };

        let result = self.drive(&session, descriptors, &path, &cancel).await;
        self.settle(&session, result).await
    }

    /// Signals cancellation to the active upload.
    ///
    /// Cooperative: chunks already on the wire may still complete, but
    /// their results are discarded once the controller leaves the
    /// transmitting state. Cancelling also drops the retained source path,
    /// so a subsequent [`retry`](Self::retry) fails with
    /// [`UploadError::NoFileToRetry`].
    pub fn cancel(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.source = None;
        inner.cancel.cancel();
        info!("upload cancellation requested");
    }

    /// Replays the last failed upload with the source path retained from
    /// that attempt.
    pub async fn retry(&self) -> Result<serde_json::Value, UploadError> {
        let path = {
            let inner = self.inner.lock().unwrap();
            inner.source.clone()
        };
        match path {
            Some(path) => self.upload(path).await,
            None => Err(UploadError::NoFileToRetry),
        }
    }

    /// Returns a live snapshot of the most recent session, if any.
    pub fn snapshot(&self) -> Option<ferry_protocol::types::ProgressSnapshot> {
        let inner = self.inner.lock().unwrap();
        inner.session.as_ref().map(|s| s.snapshot())
    }

    /// Returns the message of the last surfaced error, if any.
    pub fn last_error(&self) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner.last_error.clone()
    }

    /// Returns the cancellation token of the current upload.
    pub fn cancel_token(&self) -> CancellationToken {
        let inner = self.inner.lock().unwrap();
        inner.cancel.clone()
    }

    /// Stats the source file and plans the chunk sequence.
    async fn prepare(
        &self,
        path: &Path,
    ) -> Result<(Arc<UploadSession>, Vec<ChunkDescriptor>), UploadError> {
        let meta = tokio::fs::metadata(path).await?;
        let total_size = meta.len();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let descriptors = plan(total_size, self.options.chunk_size)?;
        let session = Arc::new(UploadSession::new(
            file_name,
            total_size,
            self.options.chunk_size,
            descriptors.len() as u64,
        ));
        {
            let mut inner = self.inner.lock().unwrap();
            inner.session = Some(Arc::clone(&session));
        }
        Ok((session, descriptors))
    }

    /// Runs init → transmit → finalize for one session.
    async fn drive(
        &self,
        session: &Arc<UploadSession>,
        descriptors: Vec<ChunkDescriptor>,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<serde_json::Value, UploadError> {
        session.initializing();
        self.emit_progress(session);

        let init_req = InitUploadRequest {
            file_name: session.file_name(),
            total_size: session.total_size(),
            chunk_size: self.options.chunk_size,
        };
        let init = tokio::select! {
            _ = cancel.cancelled() => Err(UploadError::Cancelled),
            resp = self.service.init_upload(init_req) => resp,
        }
        .map_err(|err| match err {
            UploadError::Cancelled => UploadError::Cancelled,
            other => UploadError::SessionInitFailed(other.to_string()),
        })?;

        info!(
            session = %init.upload_id,
            chunks = descriptors.len(),
            bytes = session.total_size(),
            "upload session opened"
        );
        if init.total_chunks != descriptors.len() as u64 {
            warn!(
                session = %init.upload_id,
                remote = init.total_chunks,
                local = descriptors.len(),
                "remote chunk count differs from local plan"
            );
        }

        session.transmitting(init.upload_id.clone());
        self.emit_progress(session);

        let reader = {
            let path = path.to_path_buf();
            tokio::task::spawn_blocking(move || SliceReader::open(&path))
                .await
                .map_err(|e| UploadError::Service(format!("open task join error: {e}")))??
        };

        let (tx, mut rx) = mpsc::channel(64);
        let sched = scheduler::run(
            Arc::clone(&self.service),
            &init.upload_id,
            descriptors,
            reader,
            self.options.max_concurrency,
            self.options.max_retries,
            cancel.clone(),
            tx,
        );
        // The controller is the single consumer of completion events;
        // counters are folded here, never from the transmitters.
        let fold = async {
            while let Some(ack) = rx.recv().await {
                session.acknowledge(ack.result.chunks_received);
                self.emit_progress(session);
            }
        };
        let (sched_result, ()) = tokio::join!(sched, fold);
        sched_result?;

        if cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }

        session.finalizing();
        self.emit_progress(session);

        let final_hash = {
            let path = path.to_path_buf();
            tokio::task::spawn_blocking(move || digest_file(&path))
                .await
                .map_err(|e| UploadError::Service(format!("digest task join error: {e}")))??
        };

        let finalize_req = FinalizeUploadRequest {
            upload_id: init.upload_id.clone(),
            final_hash,
        };
        tokio::select! {
            _ = cancel.cancelled() => Err(UploadError::Cancelled),
            resp = self.service.finalize_upload(finalize_req) => resp,
        }
        .map_err(|err| match err {
            UploadError::Cancelled => UploadError::Cancelled,
            other => UploadError::FinalizeFailed(other.to_string()),
        })
    }

    /// Folds the pipeline outcome into session state and fires exactly one
    /// terminal callback.
    async fn settle(
        &self,
        session: &Arc<UploadSession>,
        result: Result<serde_json::Value, UploadError>,
    ) -> Result<serde_json::Value, UploadError> {
        match result {
            Ok(payload) => {
                session.complete();
                self.emit_progress(session);
                info!(
                    session = %session.session_id().unwrap_or_default(),
                    "upload complete"
                );
                if let Some(cb) = &self.options.on_complete {
                    cb(&payload);
                }
                let mut inner = self.inner.lock().unwrap();
                inner.busy = false;
                inner.source = None;
                inner.last_error = None;
                Ok(payload)
            }
            Err(err) => {
                let msg = err.to_string();
                let cancelled = matches!(err, UploadError::Cancelled);
                if cancelled {
                    session.cancel();
                    info!("upload cancelled");
                } else {
                    session.fail(&msg);
                    error!(error = %msg, "upload failed");
                }
                self.emit_progress(session);

                // Only a session the remote side opened has anything to
                // clean up; init failures skip this.
                if let Some(id) = session.session_id() {
                    self.cleanup_remote(&id).await;
                }

                if let Some(cb) = &self.options.on_error {
                    cb(&msg);
                }
                let mut inner = self.inner.lock().unwrap();
                inner.busy = false;
                inner.last_error = Some(msg);
                Err(err)
            }
        }
    }

    /// Terminal path for failures before a session object exists
    /// (unreadable source file).
    fn settle_before_session(&self, err: UploadError) -> Result<serde_json::Value, UploadError> {
        let msg = err.to_string();
        error!(error = %msg, "upload failed before session creation");
        if let Some(cb) = &self.options.on_error {
            cb(&msg);
        }
        let mut inner = self.inner.lock().unwrap();
        inner.busy = false;
        inner.last_error = Some(msg);
        Err(err)
    }

    /// Best-effort remote session teardown; failures are logged, never
    /// surfaced.
    async fn cleanup_remote(&self, upload_id: &str) {
        let req = CancelUploadRequest {
            upload_id: upload_id.to_string(),
        };
        if let Err(err) = self.service.cancel_upload(req).await {
            warn!(session = %upload_id, error = %err, "remote cleanup failed");
        }
    }

    fn emit_progress(&self, session: &UploadSession) {
        if let Some(cb) = &self.options.on_progress {
            cb(session.snapshot());
        }
    }
}
