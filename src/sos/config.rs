use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::state::InitialState;
use crate::capture::CaptureRequest;
use crate::config::Config;

/// Configuration for one SOS session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier (e.g., "sos-5b0c...")
    pub session_id: String,

    /// Hold entry or externally triggered countdown entry
    pub initial_state: InitialState,

    /// How long a press must last to confirm
    /// Default: 1000 ms
    pub hold_threshold: Duration,

    /// Confirmation countdown before activation
    /// Default: 3 seconds
    pub confirm_secs: u32,

    /// Recording cap after activation
    /// Default: 60 seconds
    pub recording_secs: u32,

    /// Countdown tick length
    pub tick_interval: Duration,

    pub capture: CaptureRequest,

    /// Vibration pattern requested on activation
    pub haptic_pattern_ms: Vec<u64>,
}

impl SessionConfig {
    pub fn from_settings(settings: &Config, initial_state: InitialState) -> Self {
        Self {
            initial_state,
            hold_threshold: Duration::from_millis(settings.hold.threshold_ms),
            confirm_secs: settings.countdown.confirm_secs,
            recording_secs: settings.countdown.recording_secs,
            capture: CaptureRequest {
                facing: settings.capture.facing,
                audio: settings.capture.audio,
                mime_type: settings.capture.mime_type.clone(),
            },
            haptic_pattern_ms: settings.haptics.pattern_ms.clone(),
            ..Self::default()
        }
    }

    pub fn with_initial_state(mut self, initial_state: InitialState) -> Self {
        self.initial_state = initial_state;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("sos-{}", uuid::Uuid::new_v4()),
            initial_state: InitialState::Idle,
            hold_threshold: Duration::from_millis(1000),
            confirm_secs: 3,
            recording_secs: 60,
            tick_interval: Duration::from_secs(1),
            capture: CaptureRequest::default(),
            haptic_pattern_ms: vec![200, 100, 200],
        }
    }
}
