use anyhow::{Context, Result};
use serde::Deserialize;

use crate::capture::CameraFacing;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub hold: HoldConfig,
    pub countdown: CountdownConfig,
    pub capture: CaptureConfig,
    pub haptics: HapticsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HoldConfig {
    pub threshold_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CountdownConfig {
    /// Confirmation window before the SOS is raised
    pub confirm_secs: u32,
    /// Hard cap on evidence recording
    pub recording_secs: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    pub facing: CameraFacing,
    pub audio: bool,
    pub mime_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HapticsConfig {
    /// Vibration pattern in milliseconds (on, off, on, ...)
    pub pattern_ms: Vec<u64>,
}

impl Config {
    /// Load configuration from `path` (optional, any format `config` knows)
    /// layered over built-in defaults, then `SOS__*` environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = Self::builder()?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("SOS").separator("__"))
            .build()
            .with_context(|| format!("Failed to load config from {}", path))?;

        settings
            .try_deserialize()
            .context("Invalid SOS configuration")
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(config::Config::builder()
            .set_default("hold.threshold_ms", 1000)?
            .set_default("countdown.confirm_secs", 3)?
            .set_default("countdown.recording_secs", 60)?
            .set_default("capture.facing", "front")?
            .set_default("capture.audio", true)?
            .set_default("capture.mime_type", "video/webm")?
            .set_default("haptics.pattern_ms", vec![200, 100, 200])?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hold: HoldConfig { threshold_ms: 1000 },
            countdown: CountdownConfig {
                confirm_secs: 3,
                recording_secs: 60,
            },
            capture: CaptureConfig {
                facing: CameraFacing::Front,
                audio: true,
                mime_type: "video/webm".to_string(),
            },
            haptics: HapticsConfig {
                pattern_ms: vec![200, 100, 200],
            },
        }
    }
}
