// Simulated capture provider
//
// Stands in for the platform media API: grants, denies or fails acquisition
// deterministically and produces synthetic chunks on a fixed cadence. Keeps
// counters of opened and released streams so callers can check that no
// stream outlives its session.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::backend::{CaptureDevice, CaptureError, CaptureProvider, CaptureRequest, MediaChunk};

/// How the simulated platform answers an acquisition request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulatedBehavior {
    Grant,
    Deny,
    Unsupported,
    DeviceError(String),
}

#[derive(Debug, Clone)]
pub struct SimulatedConfig {
    pub behavior: SimulatedBehavior,
    /// Delay before acquisition resolves
    pub acquire_delay: Duration,
    /// Time between chunks while recording
    pub chunk_interval: Duration,
    /// Bytes per chunk
    pub chunk_size: usize,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            behavior: SimulatedBehavior::Grant,
            acquire_delay: Duration::from_millis(50),
            chunk_interval: Duration::from_millis(1000),
            chunk_size: 256,
        }
    }
}

/// Stream accounting shared by a provider and every device it hands out
#[derive(Debug, Default)]
pub struct SimulatedStats {
    acquire_calls: AtomicUsize,
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl SimulatedStats {
    pub fn acquire_calls(&self) -> usize {
        self.acquire_calls.load(Ordering::SeqCst)
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Streams whose tracks are still running
    pub fn open_streams(&self) -> usize {
        self.acquired().saturating_sub(self.released())
    }
}

pub struct SimulatedCaptureProvider {
    config: SimulatedConfig,
    stats: Arc<SimulatedStats>,
}

impl SimulatedCaptureProvider {
    pub fn new(config: SimulatedConfig) -> Self {
        Self {
            config,
            stats: Arc::new(SimulatedStats::default()),
        }
    }

    pub fn granting() -> Self {
        Self::new(SimulatedConfig::default())
    }

    pub fn with_behavior(behavior: SimulatedBehavior) -> Self {
        Self::new(SimulatedConfig {
            behavior,
            ..SimulatedConfig::default()
        })
    }

    pub fn stats(&self) -> Arc<SimulatedStats> {
        Arc::clone(&self.stats)
    }
}

#[async_trait::async_trait]
impl CaptureProvider for SimulatedCaptureProvider {
    async fn acquire(
        &self,
        request: &CaptureRequest,
    ) -> Result<Box<dyn CaptureDevice>, CaptureError> {
        self.stats.acquire_calls.fetch_add(1, Ordering::SeqCst);

        if !self.config.acquire_delay.is_zero() {
            tokio::time::sleep(self.config.acquire_delay).await;
        }

        match &self.config.behavior {
            SimulatedBehavior::Grant => {
                self.stats.acquired.fetch_add(1, Ordering::SeqCst);
                info!(
                    "Simulated capture granted ({:?} camera, audio={})",
                    request.facing, request.audio
                );
                Ok(Box::new(SimulatedDevice::new(
                    self.config.clone(),
                    request.mime_type.clone(),
                    Arc::clone(&self.stats),
                )))
            }
            SimulatedBehavior::Deny => Err(CaptureError::PermissionDenied),
            SimulatedBehavior::Unsupported => Err(CaptureError::Unsupported),
            SimulatedBehavior::DeviceError(msg) => Err(CaptureError::DeviceError(msg.clone())),
        }
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

struct SimulatedDevice {
    config: SimulatedConfig,
    mime_type: String,
    stats: Arc<SimulatedStats>,
    live: bool,
    recorder_token: Option<CancellationToken>,
}

impl SimulatedDevice {
    fn new(config: SimulatedConfig, mime_type: String, stats: Arc<SimulatedStats>) -> Self {
        Self {
            config,
            mime_type,
            stats,
            live: true,
            recorder_token: None,
        }
    }
}

impl CaptureDevice for SimulatedDevice {
    fn start(&mut self) -> Result<mpsc::Receiver<MediaChunk>, CaptureError> {
        if !self.live {
            return Err(CaptureError::DeviceError("tracks already stopped".to_string()));
        }
        if self.recorder_token.is_some() {
            return Err(CaptureError::Busy);
        }

        let (media_tx, media_rx) = mpsc::channel(64);
        let token = CancellationToken::new();
        let interval = self.config.chunk_interval;
        let chunk_size = self.config.chunk_size;

        let producer_token = token.clone();
        tokio::spawn(async move {
            let mut sequence: u64 = 0;
            loop {
                tokio::select! {
                    _ = producer_token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
                sequence += 1;
                if media_tx.send(synthetic_chunk(sequence, interval, chunk_size)).await.is_err() {
                    return;
                }
            }

            // Flush whatever the recorder held when it was stopped
            sequence += 1;
            let _ = media_tx
                .send(synthetic_chunk(sequence, interval, chunk_size))
                .await;
            debug!("Simulated recorder flushed after {} chunks", sequence);
        });

        self.recorder_token = Some(token);
        Ok(media_rx)
    }

    fn stop(&mut self) {
        if let Some(token) = &self.recorder_token {
            // The producer exits after its final flush
            token.cancel();
        }
    }

    fn stop_tracks(&mut self) {
        if !self.live {
            return;
        }
        self.stop();
        self.live = false;
        self.stats.released.fetch_add(1, Ordering::SeqCst);
        debug!("Simulated tracks stopped");
    }

    fn is_live(&self) -> bool {
        self.live
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

fn synthetic_chunk(sequence: u64, interval: Duration, chunk_size: usize) -> MediaChunk {
    MediaChunk {
        data: vec![(sequence % 251) as u8; chunk_size],
        timestamp_ms: sequence * interval.as_millis() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_chunk_is_deterministic() {
        let a = synthetic_chunk(3, Duration::from_millis(500), 8);
        let b = synthetic_chunk(3, Duration::from_millis(500), 8);
        assert_eq!(a.data, b.data);
        assert_eq!(a.timestamp_ms, 1500);
        assert_eq!(a.data.len(), 8);
    }

    #[test]
    fn test_open_streams_never_underflows() {
        let stats = SimulatedStats::default();
        stats.released.fetch_add(1, Ordering::SeqCst);
        assert_eq!(stats.open_streams(), 0);
    }
}
