pub mod backend;
pub mod encoder;
pub mod manager;
pub mod simulated;

pub use backend::{
    CameraFacing, CaptureDevice, CaptureError, CaptureProvider, CaptureRequest, MediaChunk,
};
pub use encoder::{DataUriEncoder, PayloadEncoder};
pub use manager::{CaptureSessionManager, MediaHandle, PendingAcquire, PendingCapture, RawCapture};
pub use simulated::{
    SimulatedBehavior, SimulatedCaptureProvider, SimulatedConfig, SimulatedStats,
};
