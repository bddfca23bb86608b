use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::backend::{CaptureDevice, CaptureError, CaptureProvider, CaptureRequest, MediaChunk};

/// Future resolving to a freshly acquired stream
pub type PendingAcquire = BoxFuture<'static, Result<MediaHandle, CaptureError>>;

/// Future resolving to everything the recorder buffered
pub type PendingCapture = BoxFuture<'static, Result<RawCapture, CaptureError>>;

/// Media drained from a finished recorder
#[derive(Debug, Clone, Default)]
pub struct RawCapture {
    pub chunks: Vec<MediaChunk>,
    pub mime_type: String,
}

impl RawCapture {
    pub fn byte_len(&self) -> usize {
        self.chunks.iter().map(|c| c.data.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.byte_len() == 0
    }

    /// Concatenate chunks in arrival order
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.byte_len());
        for chunk in &self.chunks {
            bytes.extend_from_slice(&chunk.data);
        }
        bytes
    }
}

/// Ownership handle for an open camera+microphone stream
///
/// Dropping an unreleased handle stops its tracks.
pub struct MediaHandle {
    id: Uuid,
    device: Box<dyn CaptureDevice>,
    released: bool,
}

impl MediaHandle {
    fn new(device: Box<dyn CaptureDevice>) -> Self {
        Self {
            id: Uuid::new_v4(),
            device,
            released: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.device.stop();
        self.device.stop_tracks();
        self.released = true;
        info!("Capture stream {} released", self.id);
    }
}

impl Drop for MediaHandle {
    fn drop(&mut self) {
        if !self.released {
            warn!("Capture stream {} dropped while open, stopping tracks", self.id);
            self.release();
        }
    }
}

/// Sole owner of capture hardware for one SOS session
///
/// Holds at most one stream. Recorder output is accumulated by a background
/// task and only handed out once `stop_recording` finalizes it.
pub struct CaptureSessionManager {
    provider: Arc<dyn CaptureProvider>,
    request: CaptureRequest,
    handle: Option<MediaHandle>,
    acquiring: bool,
    buffer_task: Option<JoinHandle<Vec<MediaChunk>>>,
}

impl CaptureSessionManager {
    pub fn new(provider: Arc<dyn CaptureProvider>, request: CaptureRequest) -> Self {
        Self {
            provider,
            request,
            handle: None,
            acquiring: false,
            buffer_task: None,
        }
    }

    /// Request camera+microphone and wait for the result
    pub async fn acquire(&mut self) -> Result<(), CaptureError> {
        let pending = self.begin_acquire()?;
        let result = pending.await;
        self.finish_acquire(result)
    }

    /// Start acquiring without borrowing the manager across the wait
    ///
    /// The caller must hand the result back through `finish_acquire`.
    pub fn begin_acquire(&mut self) -> Result<PendingAcquire, CaptureError> {
        if self.handle.is_some() || self.acquiring {
            return Err(CaptureError::Busy);
        }
        self.acquiring = true;

        let provider = Arc::clone(&self.provider);
        let request = self.request.clone();
        info!(
            "Requesting capture from {} ({:?} camera, audio={})",
            provider.name(),
            request.facing,
            request.audio
        );

        Ok(async move {
            let device = provider.acquire(&request).await?;
            Ok(MediaHandle::new(device))
        }
        .boxed())
    }

    /// Adopt the outcome of `begin_acquire`
    pub fn finish_acquire(
        &mut self,
        result: Result<MediaHandle, CaptureError>,
    ) -> Result<(), CaptureError> {
        self.acquiring = false;
        match result {
            Ok(handle) => {
                if self.handle.is_some() {
                    // Dropping the extra handle stops its tracks
                    warn!("Discarding second capture stream {}", handle.id());
                    return Err(CaptureError::Busy);
                }
                info!("Capture stream {} acquired", handle.id());
                self.handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                warn!("Capture acquisition failed: {}", e);
                Err(e)
            }
        }
    }

    /// Start the recorder and begin buffering its chunks
    pub fn start_recording(&mut self) -> Result<(), CaptureError> {
        let handle = self.handle.as_mut().ok_or(CaptureError::NotAcquired)?;
        if self.buffer_task.is_some() {
            debug!("Recorder already running");
            return Ok(());
        }

        let audio_rx = handle.device.start()?;
        self.buffer_task = Some(tokio::spawn(buffer_chunks(audio_rx)));

        info!("Recording started on stream {}", handle.id());
        Ok(())
    }

    /// Stop the recorder; the returned future yields every buffered chunk
    pub fn stop_recording(&mut self) -> Result<PendingCapture, CaptureError> {
        let handle = self.handle.as_mut().ok_or(CaptureError::NotAcquired)?;
        let task = self.buffer_task.take().ok_or(CaptureError::NotRecording)?;

        handle.device.stop();
        let mime_type = handle.device.mime_type().to_string();
        info!("Recording stopped on stream {}", handle.id());

        Ok(async move {
            let chunks = task
                .await
                .map_err(|e| CaptureError::DeviceError(format!("buffer task failed: {}", e)))?;
            Ok(RawCapture { chunks, mime_type })
        }
        .boxed())
    }

    /// Stop the recorder and wait for the drained capture
    pub async fn finish_recording(&mut self) -> Result<RawCapture, CaptureError> {
        self.stop_recording()?.await
    }

    /// Stop all tracks and discard the stream
    ///
    /// Idempotent: returns `false` when nothing was open.
    pub fn release(&mut self) -> bool {
        // A detached buffer task ends on its own once the tracks stop
        self.buffer_task = None;
        match self.handle.take() {
            Some(mut handle) => {
                handle.release();
                true
            }
            None => false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    pub fn is_acquiring(&self) -> bool {
        self.acquiring
    }

    pub fn is_recording(&self) -> bool {
        self.buffer_task.is_some()
    }
}

impl Drop for CaptureSessionManager {
    fn drop(&mut self) {
        self.release();
    }
}

async fn buffer_chunks(mut media_rx: mpsc::Receiver<MediaChunk>) -> Vec<MediaChunk> {
    let mut chunks = Vec::new();

    while let Some(chunk) = media_rx.recv().await {
        if chunk.data.is_empty() {
            continue;
        }
        debug!(
            "Buffered chunk at {}ms ({} bytes)",
            chunk.timestamp_ms,
            chunk.data.len()
        );
        chunks.push(chunk);
    }

    debug!("Recorder channel closed after {} chunks", chunks.len());
    chunks
}
