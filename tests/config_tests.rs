// Integration tests for configuration loading

use anyhow::Result;
use sos_guard::capture::CameraFacing;
use sos_guard::{Config, InitialState, SessionConfig};
use std::fs;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

// Tests that read the environment must not overlap with one that sets it
static ENV_LOCK: Mutex<()> = Mutex::new(());

#[test]
fn test_missing_file_falls_back_to_defaults() -> Result<()> {
    let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("absent");

    let cfg = Config::load(path.to_str().unwrap())?;

    assert_eq!(cfg.hold.threshold_ms, 1000);
    assert_eq!(cfg.countdown.confirm_secs, 3);
    assert_eq!(cfg.countdown.recording_secs, 60);
    assert_eq!(cfg.capture.facing, CameraFacing::Front);
    assert!(cfg.capture.audio);
    assert_eq!(cfg.capture.mime_type, "video/webm");
    assert_eq!(cfg.haptics.pattern_ms, vec![200, 100, 200]);

    Ok(())
}

#[test]
fn test_file_overrides_defaults() -> Result<()> {
    let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("sos.toml");
    fs::write(
        &path,
        r#"
[hold]
threshold_ms = 1500

[countdown]
recording_secs = 30

[capture]
facing = "rear"
mime_type = "video/mp4"
"#,
    )?;

    let cfg = Config::load(path.to_str().unwrap())?;

    assert_eq!(cfg.hold.threshold_ms, 1500);
    assert_eq!(cfg.countdown.recording_secs, 30);
    // Untouched keys keep their defaults
    assert_eq!(cfg.countdown.confirm_secs, 3);
    assert_eq!(cfg.capture.facing, CameraFacing::Rear);
    assert_eq!(cfg.capture.mime_type, "video/mp4");
    assert!(cfg.capture.audio);

    Ok(())
}

#[test]
fn test_invalid_value_is_rejected() -> Result<()> {
    let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("bad.toml");
    fs::write(&path, "[capture]\nfacing = \"sideways\"\n")?;

    assert!(Config::load(path.to_str().unwrap()).is_err());

    Ok(())
}

#[test]
fn test_environment_overrides_file() -> Result<()> {
    let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("sos.toml");
    fs::write(&path, "[hold]\nthreshold_ms = 1500\n")?;

    std::env::set_var("SOS__HOLD__THRESHOLD_MS", "750");
    std::env::set_var("SOS__CAPTURE__FACING", "rear");
    let loaded = Config::load(path.to_str().unwrap());
    std::env::remove_var("SOS__HOLD__THRESHOLD_MS");
    std::env::remove_var("SOS__CAPTURE__FACING");

    let cfg = loaded?;
    assert_eq!(cfg.hold.threshold_ms, 750);
    assert_eq!(cfg.capture.facing, CameraFacing::Rear);
    assert_eq!(cfg.countdown.confirm_secs, 3);

    Ok(())
}

#[test]
fn test_session_config_from_settings() {
    let mut cfg = Config::default();
    cfg.hold.threshold_ms = 800;
    cfg.countdown.recording_secs = 45;

    let session = SessionConfig::from_settings(&cfg, InitialState::Countdown);

    assert_eq!(session.initial_state, InitialState::Countdown);
    assert_eq!(session.hold_threshold, Duration::from_millis(800));
    assert_eq!(session.confirm_secs, 3);
    assert_eq!(session.recording_secs, 45);
    assert_eq!(session.tick_interval, Duration::from_secs(1));
    assert!(session.session_id.starts_with("sos-"));
}

#[test]
fn test_session_ids_are_unique() {
    let a = SessionConfig::default();
    let b = SessionConfig::default();
    assert_ne!(a.session_id, b.session_id);
}
