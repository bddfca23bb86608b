//! Emergency (SOS) activation state machine
//!
//! This module provides the `SosSession` abstraction that drives:
//! - Hold-to-activate gesture detection
//! - The confirmation countdown (skippable by external triggers)
//! - Evidence capture with a hard recording cap
//! - Degraded activation when capture or encoding fails
//! - Exactly-once dispatch of the activation callback
//! - Hardware release on every exit path

mod config;
mod hooks;
mod session;
mod state;

pub use config::SessionConfig;
pub use hooks::{
    ActivationHandler, CloseHandler, Collaborators, Haptics, LogNotifier, NoHaptics, NoopClose,
    Notifier,
};
pub use session::SosSession;
pub use state::{
    DegradeReason, InitialState, LifecycleState, RecordingState, SessionEvent, SessionOutcome,
    SessionSnapshot, SosState,
};
