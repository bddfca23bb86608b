use super::config::SessionConfig;
use super::hooks::Collaborators;
use super::state::{
    DegradeReason, LifecycleState, RecordingState, SessionEvent, SessionOutcome, SessionSnapshot,
    SosState,
};
use crate::capture::{
    CaptureError, CaptureProvider, CaptureSessionManager, MediaHandle, PayloadEncoder,
};
use crate::gesture::{HoldDetector, HoldId, HoldSignal};
use crate::timer::Countdown;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Confirm,
    Recording,
}

/// Everything the driver reacts to: user commands, timer callbacks and
/// completions of background capture work
enum Input {
    PressStart,
    PressEnd,
    Cancel,
    ImSafe,
    Teardown,
    Hold(HoldSignal),
    Tick { phase: Phase, remaining: u32 },
    Elapsed(Phase),
    CaptureAcquired(Result<MediaHandle, CaptureError>),
    PayloadReady(Result<String, DegradeReason>),
}

/// Handle to a running SOS session
///
/// The state machine runs on its own task; this handle feeds it user input.
/// Dropping the handle tears the session down.
pub struct SosSession {
    session_id: String,
    input_tx: mpsc::UnboundedSender<Input>,
    state_rx: watch::Receiver<SessionSnapshot>,
    driver: Option<JoinHandle<SessionOutcome>>,
}

impl SosSession {
    /// Start a session and return it with its event feed
    pub fn spawn(
        config: SessionConfig,
        provider: Arc<dyn CaptureProvider>,
        encoder: Arc<dyn PayloadEncoder>,
        hooks: Collaborators,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let session_id = config.session_id.clone();
        let driver = SessionDriver::new(config, provider, encoder, hooks, input_tx.clone(), event_tx);
        let state_rx = driver.state_tx.subscribe();
        let handle = tokio::spawn(driver.run(input_rx));

        (
            Self {
                session_id,
                input_tx,
                state_rx,
                driver: Some(handle),
            },
            event_rx,
        )
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn press_start(&self) {
        self.send(Input::PressStart);
    }

    pub fn press_end(&self) {
        self.send(Input::PressEnd);
    }

    /// Dismiss before activation; ignored once the SOS is raised
    pub fn cancel(&self) {
        self.send(Input::Cancel);
    }

    /// End the session after activation
    pub fn im_safe(&self) {
        self.send(Input::ImSafe);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state_rx.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.state_rx.clone()
    }

    /// Wait for the session to end on its own (cancel or "I'm safe")
    pub async fn join(mut self) -> Result<SessionOutcome> {
        let driver = self.driver.take().context("Session already joined")?;
        driver.await.context("SOS driver task panicked")
    }

    /// Tear the session down and wait until every resource is released
    pub async fn close(mut self) -> Result<SessionOutcome> {
        self.send(Input::Teardown);
        let driver = self.driver.take().context("Session already joined")?;
        driver.await.context("SOS driver task panicked")
    }

    fn send(&self, input: Input) {
        if self.input_tx.send(input).is_err() {
            debug!("Session {} already ended", self.session_id);
        }
    }
}

impl Drop for SosSession {
    fn drop(&mut self) {
        if self.driver.is_some() {
            self.send(Input::Teardown);
        }
    }
}

struct SessionDriver {
    /// Session configuration
    config: SessionConfig,
    /// Lifecycle and recording state
    state: SosState,
    /// Sole owner of the camera and microphone
    capture: CaptureSessionManager,
    /// Turns the drained capture into the alert payload
    encoder: Arc<dyn PayloadEncoder>,
    /// Activation, notification, haptics and close collaborators
    hooks: Collaborators,
    /// Hold gesture detector
    hold: HoldDetector,
    /// Press currently being held; signals for any other id are stale
    hold_id: Option<HoldId>,
    /// Confirm or recording countdown, whichever is running
    countdown: Option<Countdown>,
    /// In-flight capture acquisition, aborted on shutdown
    acquire_task: Option<JoinHandle<()>>,
    /// Loopback for timer, hold and background task results
    input_tx: mpsc::UnboundedSender<Input>,
    /// Event feed for the session owner
    event_tx: mpsc::UnboundedSender<SessionEvent>,
    /// Latest snapshot for watchers
    state_tx: watch::Sender<SessionSnapshot>,
    /// Set once the activation handler has been called
    activation_dispatched: bool,
    /// Alert goes out without video
    degraded: bool,
    /// "I'm safe" or teardown arrived; end as soon as the alert is dispatched
    closing: bool,
}

impl SessionDriver {
    fn new(
        config: SessionConfig,
        provider: Arc<dyn CaptureProvider>,
        encoder: Arc<dyn PayloadEncoder>,
        hooks: Collaborators,
        input_tx: mpsc::UnboundedSender<Input>,
        event_tx: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        let state = SosState::new(
            config.initial_state,
            config.confirm_secs,
            config.recording_secs,
        );
        let capture = CaptureSessionManager::new(provider, config.capture.clone());

        let hold_tx = input_tx.clone();
        let hold = HoldDetector::new(config.hold_threshold, move |signal| {
            let _ = hold_tx.send(Input::Hold(signal));
        });

        let (state_tx, _) = watch::channel(SessionSnapshot {
            session_id: config.session_id.clone(),
            state: state.clone(),
            capture_open: false,
            activation_dispatched: false,
            ended: false,
        });

        Self {
            config,
            state,
            capture,
            encoder,
            hooks,
            hold,
            hold_id: None,
            countdown: None,
            acquire_task: None,
            input_tx,
            event_tx,
            state_tx,
            activation_dispatched: false,
            degraded: false,
            closing: false,
        }
    }

    async fn run(mut self, mut input_rx: mpsc::UnboundedReceiver<Input>) -> SessionOutcome {
        info!(
            "SOS session {} started in {:?}",
            self.config.session_id, self.state.lifecycle
        );

        if self.state.lifecycle == LifecycleState::Countdown {
            self.start_confirm_countdown();
        }
        self.publish(false);

        let outcome = loop {
            let input = input_rx.recv().await.unwrap_or(Input::Teardown);
            if let Some(outcome) = self.handle(input).await {
                break outcome;
            }
            self.publish(false);
        };

        self.shutdown();
        self.publish(true);
        self.emit(SessionEvent::Ended { outcome });
        info!("SOS session {} ended: {:?}", self.config.session_id, outcome);
        outcome
    }

    async fn handle(&mut self, input: Input) -> Option<SessionOutcome> {
        match input {
            Input::PressStart => self.on_press_start(),
            Input::PressEnd => self.on_press_end(),
            Input::Hold(signal) => self.on_hold_signal(signal),
            Input::Tick { phase, remaining } => self.on_tick(phase, remaining),
            Input::Elapsed(phase) => self.on_elapsed(phase),
            Input::CaptureAcquired(result) => self.on_capture_acquired(result),
            Input::PayloadReady(result) => return self.on_payload_ready(result).await,
            Input::Cancel => return self.on_cancel(),
            Input::ImSafe => return self.on_im_safe(),
            Input::Teardown => return self.on_teardown(),
        }
        None
    }

    fn on_press_start(&mut self) {
        if self.state.lifecycle != LifecycleState::Idle {
            debug!("Press ignored in {:?}", self.state.lifecycle);
            return;
        }
        if let Some(id) = self.hold.on_press_start() {
            self.hold_id = Some(id);
            self.set_lifecycle(LifecycleState::Holding);
        }
    }

    /// Back to Idle right away so a quick re-press is not lost; the queued
    /// `Aborted` signal is then stale
    fn on_press_end(&mut self) {
        let aborted = self.hold.on_press_end();
        if aborted.is_some() && aborted == self.hold_id {
            self.hold_id = None;
            info!("Hold released early");
            self.set_lifecycle(LifecycleState::Idle);
        }
    }

    fn on_hold_signal(&mut self, signal: HoldSignal) {
        let current = self.hold_id == Some(signal.id())
            && self.state.lifecycle == LifecycleState::Holding;

        match signal {
            HoldSignal::Confirmed(_) if current => {
                self.hold_id = None;
                info!("Hold confirmed, starting confirmation countdown");
                self.set_lifecycle(LifecycleState::Countdown);
                self.start_confirm_countdown();
            }
            // Aborts are applied in on_press_end
            _ => debug!("Hold signal {:?} already handled", signal),
        }
    }

    fn on_tick(&mut self, phase: Phase, remaining: u32) {
        match phase {
            Phase::Confirm if self.state.lifecycle == LifecycleState::Countdown => {
                self.state.pre_activation_secs_remaining = remaining;
                if remaining > 0 {
                    self.emit(SessionEvent::CountdownTick { remaining });
                } else {
                    self.activate();
                }
            }
            Phase::Recording if self.state.is_recording() => {
                self.state.recording_secs_remaining = remaining;
                if remaining > 0 {
                    self.emit(SessionEvent::RecordingTick { remaining });
                } else {
                    info!("Recording cap of {}s reached", self.config.recording_secs);
                    self.finish_recording();
                }
            }
            _ => debug!("Stale {:?} tick ({})", phase, remaining),
        }
    }

    /// Zero-length countdowns complete without ticking
    fn on_elapsed(&mut self, phase: Phase) {
        match phase {
            Phase::Confirm if self.state.lifecycle == LifecycleState::Countdown => {
                self.state.pre_activation_secs_remaining = 0;
                self.activate();
            }
            Phase::Recording if self.state.is_recording() => {
                self.state.recording_secs_remaining = 0;
                self.finish_recording();
            }
            _ => {}
        }
    }

    fn start_confirm_countdown(&mut self) {
        let secs = self.config.confirm_secs;
        self.state.pre_activation_secs_remaining = secs;
        if secs > 0 {
            self.emit(SessionEvent::CountdownTick { remaining: secs });
        }
        self.start_countdown(Phase::Confirm, secs);
    }

    fn start_countdown(&mut self, phase: Phase, secs: u32) {
        self.cancel_countdown();

        let tick_tx = self.input_tx.clone();
        let done_tx = self.input_tx.clone();
        self.countdown = Some(Countdown::start_with_interval(
            secs,
            self.config.tick_interval,
            move |remaining| {
                let _ = tick_tx.send(Input::Tick { phase, remaining });
            },
            move || {
                let _ = done_tx.send(Input::Elapsed(phase));
            },
        ));
    }

    fn cancel_countdown(&mut self) {
        if let Some(countdown) = self.countdown.take() {
            countdown.cancel();
        }
    }

    /// Countdown reached zero: raise the SOS and start gathering evidence
    fn activate(&mut self) {
        self.cancel_countdown();
        self.state.lifecycle = LifecycleState::Activated;
        self.state.recording = RecordingState::Recording;
        self.state.recording_secs_remaining = self.config.recording_secs;
        self.emit_state();

        warn!("SOS activated for session {}", self.config.session_id);

        if let Err(e) = self.hooks.haptics.vibrate(&self.config.haptic_pattern_ms) {
            debug!("Haptic cue failed: {}", e);
        }

        if self.config.recording_secs > 0 {
            self.emit(SessionEvent::RecordingTick {
                remaining: self.config.recording_secs,
            });
        }
        self.start_countdown(Phase::Recording, self.config.recording_secs);

        match self.capture.begin_acquire() {
            Ok(pending) => {
                let input_tx = self.input_tx.clone();
                self.acquire_task = Some(tokio::spawn(async move {
                    let result = pending.await;
                    // If the driver is gone the handle drops here and stops its tracks
                    let _ = input_tx.send(Input::CaptureAcquired(result));
                }));
            }
            Err(e) => self.degrade_capture(e),
        }
    }

    fn on_capture_acquired(&mut self, result: Result<MediaHandle, CaptureError>) {
        self.acquire_task = None;
        let wanted = self.state.is_recording();

        match self.capture.finish_acquire(result) {
            Ok(()) if wanted => {
                if let Err(e) = self.capture.start_recording() {
                    self.capture.release();
                    self.degrade_capture(e);
                }
            }
            Ok(()) => {
                info!("Capture granted after recording window closed, releasing");
                self.capture.release();
            }
            Err(e) if wanted => self.degrade_capture(e),
            Err(e) => debug!("Late capture failure ignored: {}", e),
        }
    }

    fn degrade_capture(&mut self, error: CaptureError) {
        warn!("Capture unavailable, raising SOS without video: {}", error);
        self.hooks.notifier.warn(&format!(
            "Camera unavailable ({}). Your SOS is being sent without video.",
            error
        ));
        self.degraded = true;
        self.emit(SessionEvent::CaptureDegraded {
            reason: DegradeReason::CaptureUnavailable(error),
        });
        self.finish_recording();
    }

    /// Recording -> Processing: stop the recorder, release hardware, encode
    /// in the background
    fn finish_recording(&mut self) {
        if !self.state.is_recording() {
            return;
        }
        self.cancel_countdown();
        self.state.recording = RecordingState::Processing;
        self.emit_state();

        let pending = if self.capture.is_recording() {
            match self.capture.stop_recording() {
                Ok(pending) => Some(pending),
                Err(e) => {
                    warn!("Failed to stop recorder: {}", e);
                    None
                }
            }
        } else {
            None
        };

        self.capture.release();

        let input_tx = self.input_tx.clone();
        match pending {
            Some(pending) => {
                let encoder = Arc::clone(&self.encoder);
                tokio::spawn(async move {
                    let result = match pending.await {
                        Ok(raw) if raw.is_empty() => Err(DegradeReason::NoMedia),
                        Ok(raw) => encoder
                            .encode(raw)
                            .await
                            .map_err(|e| DegradeReason::EncodingFailure(format!("{:#}", e))),
                        Err(e) => Err(DegradeReason::EncodingFailure(e.to_string())),
                    };
                    let _ = input_tx.send(Input::PayloadReady(result));
                });
            }
            None => {
                let result = if self.degraded {
                    Ok(String::new())
                } else {
                    Err(DegradeReason::NoMedia)
                };
                let _ = input_tx.send(Input::PayloadReady(result));
            }
        }
    }

    /// Processing -> Finished: store the payload and raise the alert
    async fn on_payload_ready(
        &mut self,
        result: Result<String, DegradeReason>,
    ) -> Option<SessionOutcome> {
        if self.state.recording != RecordingState::Processing {
            debug!("Payload arrived outside processing, ignored");
            return None;
        }

        let payload = match result {
            Ok(payload) => payload,
            Err(reason) => {
                warn!("Evidence unavailable, sending empty payload: {:?}", reason);
                self.degraded = true;
                self.emit(SessionEvent::CaptureDegraded { reason });
                String::new()
            }
        };

        self.state.captured_payload = Some(payload.clone());
        self.state.recording = RecordingState::Finished;
        self.emit_state();

        self.dispatch_activation(payload).await;

        if self.closing {
            return Some(self.raised());
        }
        None
    }

    async fn dispatch_activation(&mut self, payload: String) {
        if self.activation_dispatched {
            error!("Activation already dispatched, refusing a second call");
            return;
        }
        self.activation_dispatched = true;

        let payload_bytes = payload.len();
        info!(
            "Dispatching SOS activation ({} bytes, degraded={})",
            payload_bytes, self.degraded
        );
        if let Err(e) = self.hooks.activation.on_activate(payload).await {
            error!("Activation handler failed: {:#}", e);
        }

        self.emit(SessionEvent::Activated {
            payload_bytes,
            degraded: self.degraded,
        });
    }

    fn on_cancel(&mut self) -> Option<SessionOutcome> {
        if self.state.is_activated() {
            warn!("Cancel ignored: SOS already raised");
            return None;
        }
        info!("SOS dismissed by user in {:?}", self.state.lifecycle);
        self.return_to_idle();
        self.hooks.close.on_close();
        Some(SessionOutcome::Dismissed)
    }

    fn on_im_safe(&mut self) -> Option<SessionOutcome> {
        if !self.state.is_activated() {
            debug!("\"I'm safe\" ignored before activation");
            return None;
        }
        if self.closing {
            debug!("\"I'm safe\" already received, waiting for the alert to go out");
            return None;
        }
        info!("User reported safe");
        self.hooks.close.on_close();
        self.wind_down()
    }

    fn on_teardown(&mut self) -> Option<SessionOutcome> {
        info!("Tearing down session in {:?}", self.state.lifecycle);
        if !self.state.is_activated() {
            self.return_to_idle();
            return Some(SessionOutcome::Abandoned);
        }
        self.wind_down()
    }

    /// End an activated session as soon as the alert has gone out
    fn wind_down(&mut self) -> Option<SessionOutcome> {
        self.closing = true;
        match self.state.recording {
            RecordingState::Recording => {
                self.finish_recording();
                None
            }
            RecordingState::Processing => None,
            RecordingState::Finished | RecordingState::NotStarted => Some(self.raised()),
        }
    }

    /// Pre-activation exits always end in Idle
    fn return_to_idle(&mut self) {
        self.hold.cancel();
        self.hold_id = None;
        self.cancel_countdown();
        if self.state.lifecycle != LifecycleState::Idle {
            self.set_lifecycle(LifecycleState::Idle);
        }
    }

    fn raised(&self) -> SessionOutcome {
        SessionOutcome::Raised {
            degraded: self.degraded,
        }
    }

    /// Runs on every exit path
    fn shutdown(&mut self) {
        self.hold.cancel();
        self.hold_id = None;
        self.cancel_countdown();
        if let Some(task) = self.acquire_task.take() {
            task.abort();
        }
        self.capture.release();
    }

    fn set_lifecycle(&mut self, lifecycle: LifecycleState) {
        self.state.lifecycle = lifecycle;
        self.emit_state();
    }

    fn emit_state(&self) {
        self.emit(SessionEvent::StateChanged {
            lifecycle: self.state.lifecycle,
            recording: self.state.recording,
        });
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.event_tx.send(event);
    }

    fn publish(&self, ended: bool) {
        self.state_tx.send_replace(SessionSnapshot {
            session_id: self.config.session_id.clone(),
            state: self.state.clone(),
            capture_open: self.capture.is_open(),
            activation_dispatched: self.activation_dispatched,
            ended,
        });
    }
}
