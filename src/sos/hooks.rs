use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, warn};

/// Receives the finished evidence payload; called exactly once per raised SOS
///
/// Persisting and transmitting the alert (location, timestamp, payload) is the
/// implementor's job.
#[async_trait::async_trait]
pub trait ActivationHandler: Send + Sync {
    async fn on_activate(&self, payload: String) -> Result<()>;
}

/// Non-blocking user-facing warning (toast)
pub trait Notifier: Send + Sync {
    fn warn(&self, message: &str);
}

/// Best-effort haptic cue
pub trait Haptics: Send + Sync {
    fn vibrate(&self, pattern_ms: &[u64]) -> Result<()>;
}

/// Invoked when the user dismisses the SOS UI
pub trait CloseHandler: Send + Sync {
    fn on_close(&self);
}

/// Notifier that only logs
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn warn(&self, message: &str) {
        warn!("User warning: {}", message);
    }
}

/// Haptics for platforms without a vibration motor
pub struct NoHaptics;

impl Haptics for NoHaptics {
    fn vibrate(&self, pattern_ms: &[u64]) -> Result<()> {
        debug!("Vibration unavailable, skipping pattern {:?}", pattern_ms);
        Ok(())
    }
}

pub struct NoopClose;

impl CloseHandler for NoopClose {
    fn on_close(&self) {}
}

/// External collaborators the state machine talks to
#[derive(Clone)]
pub struct Collaborators {
    pub activation: Arc<dyn ActivationHandler>,
    pub notifier: Arc<dyn Notifier>,
    pub haptics: Arc<dyn Haptics>,
    pub close: Arc<dyn CloseHandler>,
}

impl Collaborators {
    pub fn new(activation: Arc<dyn ActivationHandler>) -> Self {
        Self {
            activation,
            notifier: Arc::new(LogNotifier),
            haptics: Arc::new(NoHaptics),
            close: Arc::new(NoopClose),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_haptics(mut self, haptics: Arc<dyn Haptics>) -> Self {
        self.haptics = haptics;
        self
    }

    pub fn with_close(mut self, close: Arc<dyn CloseHandler>) -> Self {
        self.close = close;
        self
    }
}
