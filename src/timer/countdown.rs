use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Cancellable once-per-interval countdown
///
/// `on_tick(remaining)` fires after each interval with `remaining` strictly
/// decreasing to 0, then `on_complete()` fires once. Callbacks run without any
/// internal lock held, so they may cancel the countdown themselves. Once
/// `cancel` returns no new callback starts; one already running finishes.
pub struct Countdown {
    token: CancellationToken,
    live: Arc<Mutex<bool>>,
    task: Option<JoinHandle<()>>,
}

impl Countdown {
    /// Tick once per second; callbacks must not block
    pub fn start<T, C>(seconds: u32, on_tick: T, on_complete: C) -> Self
    where
        T: FnMut(u32) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        Self::start_with_interval(seconds, Duration::from_secs(1), on_tick, on_complete)
    }

    pub fn start_with_interval<T, C>(
        seconds: u32,
        interval: Duration,
        mut on_tick: T,
        on_complete: C,
    ) -> Self
    where
        T: FnMut(u32) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        let token = CancellationToken::new();
        let live = Arc::new(Mutex::new(true));

        let task_token = token.clone();
        let task_live = Arc::clone(&live);
        let task = tokio::spawn(async move {
            // Deadlines are anchored to the start so ticks don't drift
            let started = Instant::now();

            for elapsed in 1..=seconds {
                let deadline = started + interval * elapsed;
                tokio::select! {
                    _ = task_token.cancelled() => return,
                    _ = time::sleep_until(deadline) => {}
                }

                if !*task_live.lock().unwrap_or_else(|e| e.into_inner()) {
                    return;
                }
                on_tick(seconds - elapsed);
            }

            {
                let mut live = task_live.lock().unwrap_or_else(|e| e.into_inner());
                if !*live {
                    return;
                }
                *live = false;
            }
            on_complete();
            debug!("Countdown of {}s complete", seconds);
        });

        Self {
            token,
            live,
            task: Some(task),
        }
    }

    /// Stop all future ticks and completion; no-op if already stopped
    pub fn cancel(&self) {
        let mut live = self.live.lock().unwrap_or_else(|e| e.into_inner());
        if *live {
            *live = false;
            self.token.cancel();
            debug!("Countdown cancelled");
        }
    }

    /// Check if ticks or completion are still pending
    pub fn is_running(&self) -> bool {
        *self.live.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Wait until the countdown completes or is cancelled
    pub async fn finished(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.cancel();
    }
}
