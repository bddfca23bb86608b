use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Identifies one press; signals from a superseded press can be discarded
pub type HoldId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldSignal {
    /// Press lasted the full threshold
    Confirmed(HoldId),
    /// Press released before the threshold
    Aborted(HoldId),
}

impl HoldSignal {
    pub fn id(&self) -> HoldId {
        match self {
            HoldSignal::Confirmed(id) | HoldSignal::Aborted(id) => *id,
        }
    }
}

struct Armed {
    id: HoldId,
    token: CancellationToken,
}

/// Turns a sustained press into a single `Confirmed` signal
///
/// Every armed press ends in exactly one signal: `Confirmed` when the
/// threshold timer wins, `Aborted` when the press is released first.
pub struct HoldDetector {
    threshold: Duration,
    signal: Arc<dyn Fn(HoldSignal) + Send + Sync>,
    armed: Arc<Mutex<Option<Armed>>>,
    next_id: HoldId,
}

impl HoldDetector {
    pub fn new<F>(threshold: Duration, signal: F) -> Self
    where
        F: Fn(HoldSignal) + Send + Sync + 'static,
    {
        Self {
            threshold,
            signal: Arc::new(signal),
            armed: Arc::new(Mutex::new(None)),
            next_id: 0,
        }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Arm the threshold timer
    ///
    /// Returns `None` while a previous press is still armed.
    pub fn on_press_start(&mut self) -> Option<HoldId> {
        let mut armed = self.armed.lock().unwrap_or_else(|e| e.into_inner());
        if armed.is_some() {
            debug!("Press start ignored, hold already armed");
            return None;
        }

        self.next_id += 1;
        let id = self.next_id;
        let token = CancellationToken::new();
        *armed = Some(Armed {
            id,
            token: token.clone(),
        });

        let threshold = self.threshold;
        let signal = Arc::clone(&self.signal);
        let slot = Arc::clone(&self.armed);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(threshold) => {}
            }

            let mut armed = slot.lock().unwrap_or_else(|e| e.into_inner());
            if armed.as_ref().map(|a| a.id) == Some(id) {
                *armed = None;
                signal(HoldSignal::Confirmed(id));
            }
        });

        debug!("Hold {} armed ({}ms)", id, threshold.as_millis());
        Some(id)
    }

    /// Release the press; aborts the hold if the threshold has not fired
    ///
    /// Safe to call repeatedly or without a matching press start. Returns the
    /// id of the aborted press, `None` if nothing was armed.
    pub fn on_press_end(&mut self) -> Option<HoldId> {
        let mut armed = self.armed.lock().unwrap_or_else(|e| e.into_inner());
        let press = armed.take()?;
        press.token.cancel();
        debug!("Hold {} aborted", press.id);
        (self.signal)(HoldSignal::Aborted(press.id));
        Some(press.id)
    }

    /// Disarm without emitting a signal
    pub fn cancel(&mut self) {
        let mut armed = self.armed.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(press) = armed.take() {
            press.token.cancel();
            debug!("Hold {} cancelled", press.id);
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

impl Drop for HoldDetector {
    fn drop(&mut self) {
        self.cancel();
    }
}
