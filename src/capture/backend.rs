use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

/// Which camera the capture session should open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraFacing {
    /// Front-facing ("user") camera
    Front,
    /// Rear-facing ("environment") camera
    Rear,
}

/// One buffer of encoded media emitted by an active recorder
#[derive(Debug, Clone)]
pub struct MediaChunk {
    /// Encoded container bytes
    pub data: Vec<u8>,
    /// Timestamp in milliseconds since the recorder started
    pub timestamp_ms: u64,
}

/// What to ask the platform for when acquiring a capture stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRequest {
    pub facing: CameraFacing,
    /// Also capture the microphone
    pub audio: bool,
    /// Container format the recorder should produce
    pub mime_type: String,
}

impl Default for CaptureRequest {
    fn default() -> Self {
        Self {
            facing: CameraFacing::Front,
            audio: true,
            mime_type: "video/webm".to_string(),
        }
    }
}

/// Capture hardware failures
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum CaptureError {
    /// The user or platform refused camera/microphone access
    PermissionDenied,
    /// Recording is not available on this platform
    Unsupported,
    /// The device failed while opening or recording
    DeviceError(String),
    /// A capture stream is already open (or being opened) for this session
    Busy,
    /// Operation needs an open stream but none is held
    NotAcquired,
    /// Operation needs an active recorder but none is running
    NotRecording,
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::PermissionDenied => write!(f, "camera/microphone permission denied"),
            CaptureError::Unsupported => write!(f, "media recording is not supported"),
            CaptureError::DeviceError(msg) => write!(f, "capture device error: {}", msg),
            CaptureError::Busy => write!(f, "a capture stream is already open"),
            CaptureError::NotAcquired => write!(f, "no capture stream is open"),
            CaptureError::NotRecording => write!(f, "recorder is not running"),
        }
    }
}

impl std::error::Error for CaptureError {}

/// An acquired camera+microphone stream with an attached recorder
///
/// All methods are synchronous: they only flip hardware state. Media arrives
/// asynchronously on the receiver returned by `start`.
pub trait CaptureDevice: Send {
    /// Start the recorder
    ///
    /// Returns a channel receiver that will receive media chunks. The sender
    /// side is closed once the recorder has flushed its last chunk.
    fn start(&mut self) -> Result<mpsc::Receiver<MediaChunk>, CaptureError>;

    /// Stop the recorder (flushes a final chunk, then closes the channel)
    fn stop(&mut self);

    /// Stop all hardware tracks
    fn stop_tracks(&mut self);

    /// Check if hardware tracks are still running
    fn is_live(&self) -> bool;

    /// Container format of the produced chunks
    fn mime_type(&self) -> &str;
}

/// Platform capture provider
///
/// Implementations:
/// - Platform media APIs (outside this crate)
/// - `SimulatedCaptureProvider`: deterministic grant/deny/failure for tests and demos
#[async_trait::async_trait]
pub trait CaptureProvider: Send + Sync {
    /// Request camera and microphone access
    async fn acquire(&self, request: &CaptureRequest)
        -> Result<Box<dyn CaptureDevice>, CaptureError>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
