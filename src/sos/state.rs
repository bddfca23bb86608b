use serde::{Deserialize, Serialize};

use crate::capture::CaptureError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Waiting for a press
    Idle,
    /// Press in progress, threshold not reached
    Holding,
    /// Confirmation countdown running
    Countdown,
    /// SOS raised; no way back
    Activated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingState {
    NotStarted,
    Recording,
    Processing,
    Finished,
}

/// Where a session starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialState {
    /// Hold-to-activate entry point
    #[default]
    Idle,
    /// External trigger (e.g. shake) that skips the hold
    Countdown,
}

/// Mutable state of one emergency flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SosState {
    pub lifecycle: LifecycleState,
    pub recording: RecordingState,
    pub pre_activation_secs_remaining: u32,
    pub recording_secs_remaining: u32,
    /// Set once at `Processing -> Finished`; empty when capture degraded
    pub captured_payload: Option<String>,
}

impl SosState {
    pub fn new(initial: InitialState, confirm_secs: u32, recording_secs: u32) -> Self {
        let lifecycle = match initial {
            InitialState::Idle => LifecycleState::Idle,
            InitialState::Countdown => LifecycleState::Countdown,
        };

        Self {
            lifecycle,
            recording: RecordingState::NotStarted,
            pre_activation_secs_remaining: confirm_secs,
            recording_secs_remaining: recording_secs,
            captured_payload: None,
        }
    }

    pub fn is_activated(&self) -> bool {
        self.lifecycle == LifecycleState::Activated
    }

    pub fn is_recording(&self) -> bool {
        self.is_activated() && self.recording == RecordingState::Recording
    }
}

/// Why the SOS went out without (complete) evidence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "error", rename_all = "snake_case")]
pub enum DegradeReason {
    CaptureUnavailable(CaptureError),
    EncodingFailure(String),
    /// Recording ended before any media was captured
    NoMedia,
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SessionOutcome {
    /// User cancelled before activation
    Dismissed,
    /// Host tore the session down before activation
    Abandoned,
    /// SOS was raised and the activation callback ran
    Raised { degraded: bool },
}

/// Point-in-time view of a session for the host UI
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub state: SosState,
    pub capture_open: bool,
    pub activation_dispatched: bool,
    pub ended: bool,
}

/// Progress feed for the host UI
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    StateChanged {
        lifecycle: LifecycleState,
        recording: RecordingState,
    },
    CountdownTick {
        remaining: u32,
    },
    RecordingTick {
        remaining: u32,
    },
    CaptureDegraded {
        reason: DegradeReason,
    },
    Activated {
        payload_bytes: usize,
        degraded: bool,
    },
    Ended {
        outcome: SessionOutcome,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_from_triggered_entry() {
        let state = SosState::new(InitialState::Countdown, 3, 60);
        assert_eq!(state.lifecycle, LifecycleState::Countdown);
        assert_eq!(state.recording, RecordingState::NotStarted);
        assert_eq!(state.pre_activation_secs_remaining, 3);
        assert!(state.captured_payload.is_none());
        assert!(!state.is_recording());
    }

    #[test]
    fn test_event_serialization() {
        let event = SessionEvent::CaptureDegraded {
            reason: DegradeReason::CaptureUnavailable(CaptureError::PermissionDenied),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"capture_degraded\""));
        assert!(json.contains("capture_unavailable"));
        assert!(json.contains("permission_denied"));
    }
}
