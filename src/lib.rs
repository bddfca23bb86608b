pub mod alert;
pub mod capture;
pub mod config;
pub mod gesture;
pub mod sos;
pub mod timer;

pub use alert::ActivationRecord;
pub use capture::{
    CaptureError, CaptureProvider, CaptureRequest, CaptureSessionManager, DataUriEncoder,
    PayloadEncoder, RawCapture, SimulatedCaptureProvider,
};
pub use config::Config;
pub use gesture::{HoldDetector, HoldSignal};
pub use sos::{
    ActivationHandler, Collaborators, InitialState, LifecycleState, RecordingState,
    SessionConfig, SessionEvent, SessionOutcome, SosSession,
};
pub use timer::Countdown;
