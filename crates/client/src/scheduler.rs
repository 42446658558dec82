//! Sliding-window scheduler for concurrent chunk transmissions.

use std::sync::Arc;

use ferry_transfer::{ChunkDescriptor, SliceReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::UploadError;
use crate::service::AssemblyService;
use crate::transmit::{TransmitResult, send_chunk};

/// Successful chunk acknowledgment forwarded to the session controller.
///
/// Acknowledgments arrive in completion order, which is not index order;
/// the controller folds them sequentially.
#[derive(Debug, Clone)]
pub struct ChunkAck {
    pub index: u64,
    pub result: TransmitResult,
}

/// Drives all `descriptors` to completion with at most `max_concurrency`
/// in-flight transmissions.
///
/// Chunks are started in index order; byte ranges are read lazily when a
/// window slot frees, so at most `max_concurrency` chunk buffers exist at
/// once. On a fatal chunk error no new chunks are admitted; transmissions
/// already in flight settle before the error is returned (in-flight calls
/// are interrupted only through the shared cancellation token). The first
/// fatal error wins; later failures from the draining window are logged.
pub async fn run(
    service: Arc<dyn AssemblyService>,
    upload_id: &str,
    descriptors: Vec<ChunkDescriptor>,
    mut reader: SliceReader,
    max_concurrency: usize,
    max_retries: u32,
    cancel: CancellationToken,
    acks: mpsc::Sender<ChunkAck>,
) -> Result<(), UploadError> {
    let mut window: JoinSet<(u64, Result<TransmitResult, UploadError>)> = JoinSet::new();
    let mut pending = descriptors.into_iter();
    let mut fatal: Option<UploadError> = None;

    loop {
        // Admit chunks in index order until the window is full.
        while fatal.is_none() && window.len() < max_concurrency {
            if cancel.is_cancelled() {
                fatal = Some(UploadError::Cancelled);
                break;
            }
            let Some(desc) = pending.next() else { break };

            // Lazy read: the buffer is created only once a slot is free.
            let range = desc.clone();
            let (returned, read) = tokio::task::spawn_blocking(move || {
                let mut r = reader;
                let read = r.read_range(&range);
                (r, read)
            })
            .await
            .map_err(|e| UploadError::Service(format!("read task join error: {e}")))?;
            reader = returned;

            let data = match read {
                Ok(data) => data,
                Err(err) => {
                    fatal = Some(err.into());
                    break;
                }
            };

            debug!(chunk = desc.index, bytes = data.len(), "admitting chunk");
            let service = Arc::clone(&service);
            let token = cancel.clone();
            let id = upload_id.to_string();
            window.spawn(async move {
                let result =
                    send_chunk(service.as_ref(), &id, &desc, data, max_retries, &token).await;
                (desc.index, result)
            });
        }

        let Some(joined) = window.join_next().await else {
            break;
        };
        let (index, result) =
            joined.map_err(|e| UploadError::Service(format!("chunk task panicked: {e}")))?;

        match result {
            Ok(result) => {
                let _ = acks.send(ChunkAck { index, result }).await;
            }
            Err(err) => {
                if fatal.is_none() {
                    fatal = Some(err);
                } else {
                    debug!(chunk = index, error = %err, "secondary failure while draining window");
                }
            }
        }
    }

    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ServiceFuture;
    use ferry_protocol::messages::{
        CancelUploadRequest, FinalizeUploadRequest, InitUploadRequest, InitUploadResponse,
        UploadChunkRequest, UploadChunkResponse,
    };
    use ferry_transfer::plan;
    use std::collections::HashMap;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Mock service that tracks in-flight counts and can reject chosen
    /// chunks a fixed number of times. Rejections settle immediately;
    /// successes take `delay`.
    struct WindowService {
        total_chunks: u64,
        delay: Duration,
        received: Mutex<Vec<u64>>,
        fail_chunks: Mutex<HashMap<u64, u32>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        acknowledged: AtomicU64,
    }

    impl WindowService {
        fn new(total_chunks: u64, delay: Duration) -> Self {
            Self {
                total_chunks,
                delay,
                received: Mutex::new(Vec::new()),
                fail_chunks: Mutex::new(HashMap::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                acknowledged: AtomicU64::new(0),
            }
        }

        fn fail_chunk(&self, index: u64, times: u32) {
            self.fail_chunks.lock().unwrap().insert(index, times);
        }
    }

    impl AssemblyService for WindowService {
        fn init_upload(&self, _req: InitUploadRequest) -> ServiceFuture<'_, InitUploadResponse> {
            Box::pin(async { Err(UploadError::Service("not used".into())) })
        }

        fn upload_chunk(
            &self,
            req: UploadChunkRequest,
        ) -> ServiceFuture<'_, UploadChunkResponse> {
            Box::pin(async move {
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_in_flight.fetch_max(now, Ordering::SeqCst);
                self.received.lock().unwrap().push(req.chunk_number);

                let should_fail = {
                    let mut failures = self.fail_chunks.lock().unwrap();
                    match failures.get_mut(&req.chunk_number) {
                        Some(remaining) if *remaining > 0 => {
                            *remaining -= 1;
                            true
                        }
                        _ => false,
                    }
                };
                if should_fail {
                    self.in_flight.fetch_sub(1, Ordering::SeqCst);
                    return Err(UploadError::Service(format!(
                        "chunk {} rejected",
                        req.chunk_number
                    )));
                }

                tokio::time::sleep(self.delay).await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);

                let count = self.acknowledged.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(UploadChunkResponse {
                    chunks_received: count,
                    progress: count as f64 / self.total_chunks as f64 * 100.0,
                    is_complete: count == self.total_chunks,
                })
            })
        }

        fn finalize_upload(
            &self,
            _req: FinalizeUploadRequest,
        ) -> ServiceFuture<'_, serde_json::Value> {
            Box::pin(async { Err(UploadError::Service("not used".into())) })
        }

        fn cancel_upload(&self, _req: CancelUploadRequest) -> ServiceFuture<'_, ()> {
            Box::pin(async { Ok(()) })
        }
    }

    fn create_test_file(dir: &Path, size: usize) -> PathBuf {
        let path = dir.join("source.bin");
        let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(&data).unwrap();
        path
    }

    async fn run_with(
        service: Arc<WindowService>,
        path: &Path,
        total_size: u64,
        chunk_size: u64,
        max_concurrency: usize,
        max_retries: u32,
        cancel: CancellationToken,
    ) -> (Result<(), UploadError>, Vec<ChunkAck>) {
        let descriptors = plan(total_size, chunk_size).unwrap();
        let reader = SliceReader::open(path).unwrap();
        let (tx, mut rx) = mpsc::channel(64);

        let sched = run(
            service,
            "u1",
            descriptors,
            reader,
            max_concurrency,
            max_retries,
            cancel,
            tx,
        );
        let fold = async {
            let mut acks = Vec::new();
            while let Some(ack) = rx.recv().await {
                acks.push(ack);
            }
            acks
        };
        tokio::join!(sched, fold)
    }

    #[tokio::test]
    async fn window_never_exceeds_ceiling() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), 100);
        let service = Arc::new(WindowService::new(10, Duration::from_millis(20)));

        let (result, acks) = run_with(
            Arc::clone(&service),
            &path,
            100,
            10,
            3,
            3,
            CancellationToken::new(),
        )
        .await;

        result.unwrap();
        assert_eq!(acks.len(), 10);
        assert!(service.max_in_flight.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn chunks_start_in_index_order() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), 80);
        let service = Arc::new(WindowService::new(8, Duration::from_millis(5)));

        let (result, _) = run_with(
            Arc::clone(&service),
            &path,
            80,
            10,
            3,
            3,
            CancellationToken::new(),
        )
        .await;

        result.unwrap();
        let received = service.received.lock().unwrap();
        let mut sorted = received.clone();
        sorted.sort_unstable();
        assert_eq!(*received, sorted, "initiation must follow index order");
    }

    #[tokio::test]
    async fn wall_clock_bounded_by_window_count() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), 100);
        let delay = Duration::from_millis(100);
        let service = Arc::new(WindowService::new(10, delay));

        let started = std::time::Instant::now();
        let (result, _) = run_with(
            Arc::clone(&service),
            &path,
            100,
            10,
            3,
            3,
            CancellationToken::new(),
        )
        .await;
        result.unwrap();

        // 10 chunks at 3 concurrent, 100ms each: ceil(10/3) = 4 windows,
        // nowhere near the 1s a serial upload would take.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(390), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(850), "elapsed {elapsed:?}");
    }

    #[tokio::test]
    async fn fatal_chunk_stops_admission() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), 100);
        let service = Arc::new(WindowService::new(10, Duration::from_millis(20)));
        service.fail_chunk(2, 1);

        // max_retries = 0: the first rejection is fatal.
        let (result, _) = run_with(
            Arc::clone(&service),
            &path,
            100,
            10,
            3,
            0,
            CancellationToken::new(),
        )
        .await;

        let err = result.unwrap_err();
        assert!(matches!(
            err,
            UploadError::ChunkTransmitFailed {
                index: 2,
                attempts: 1,
                ..
            }
        ));

        // Only the window holding the failure was admitted; the rejection
        // settles before chunks 0 and 1, so nothing past index 2 starts.
        let received = service.received.lock().unwrap();
        assert_eq!(*received, vec![0, 1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_admission() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), 100);
        let service = Arc::new(WindowService::new(10, Duration::from_secs(5)));
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let (result, acks) = run_with(Arc::clone(&service), &path, 100, 10, 3, 3, cancel).await;

        assert!(matches!(result.unwrap_err(), UploadError::Cancelled));
        assert!(acks.is_empty());
        // At most the first window was ever admitted.
        assert!(service.received.lock().unwrap().len() <= 3);
    }

    #[tokio::test]
    async fn empty_file_single_chunk() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), 0);
        let service = Arc::new(WindowService::new(1, Duration::ZERO));

        let (result, acks) = run_with(
            Arc::clone(&service),
            &path,
            0,
            1024,
            3,
            3,
            CancellationToken::new(),
        )
        .await;

        result.unwrap();
        assert_eq!(acks.len(), 1);
        assert_eq!(acks[0].index, 0);
        assert!(acks[0].result.is_complete);
    }
}
