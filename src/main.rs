// Run one SOS activation end-to-end against the simulated capture provider
//
// Usage: cargo run -- --entry hold --hold-ms 1200 --capture grant --safe-after 10
//
// The activation record is printed as JSON once the SOS is raised.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use sos_guard::capture::{SimulatedBehavior, SimulatedCaptureProvider};
use sos_guard::sos::ActivationHandler;
use sos_guard::{
    ActivationRecord, Collaborators, Config, DataUriEncoder, InitialState, LifecycleState,
    SessionConfig, SessionEvent, SosSession,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{info, warn, Level};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Entry {
    /// Press and hold
    Hold,
    /// External trigger, straight into the countdown
    Triggered,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CaptureMode {
    Grant,
    Deny,
    Unsupported,
    Error,
}

#[derive(Parser)]
#[command(name = "sos-guard")]
#[command(about = "Simulate an SOS activation with evidence capture")]
struct Args {
    /// Config file (extension optional)
    #[arg(short, long, default_value = "config/sos-guard")]
    config: String,

    #[arg(short, long, value_enum, default_value = "hold")]
    entry: Entry,

    /// How long to hold the button, in milliseconds
    #[arg(long, default_value = "1200")]
    hold_ms: u64,

    #[arg(long, value_enum, default_value = "grant")]
    capture: CaptureMode,

    /// Report safe this many seconds after activation
    #[arg(long)]
    safe_after: Option<u64>,

    /// Override the recording cap in seconds
    #[arg(long)]
    recording_secs: Option<u32>,
}

struct PrintingActivation {
    session_id: String,
}

#[async_trait::async_trait]
impl ActivationHandler for PrintingActivation {
    async fn on_activate(&self, payload: String) -> Result<()> {
        let mut record = ActivationRecord::new(self.session_id.clone(), payload);
        if record.payload.len() > 64 {
            record.payload.truncate(64);
            record.payload.push_str("...");
        }
        println!("{}", serde_json::to_string_pretty(&record)?);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    let initial = match args.entry {
        Entry::Hold => InitialState::Idle,
        Entry::Triggered => InitialState::Countdown,
    };
    let mut session_config = SessionConfig::from_settings(&cfg, initial);
    if let Some(secs) = args.recording_secs {
        session_config.recording_secs = secs;
    }

    let behavior = match args.capture {
        CaptureMode::Grant => SimulatedBehavior::Grant,
        CaptureMode::Deny => SimulatedBehavior::Deny,
        CaptureMode::Unsupported => SimulatedBehavior::Unsupported,
        CaptureMode::Error => SimulatedBehavior::DeviceError("camera busy".to_string()),
    };
    let provider = Arc::new(SimulatedCaptureProvider::with_behavior(behavior));
    let stats = provider.stats();

    info!("SOS Guard v0.1.0");
    info!("Session: {}", session_config.session_id);
    info!(
        "Hold {}ms, confirm {}s, record up to {}s",
        session_config.hold_threshold.as_millis(),
        session_config.confirm_secs,
        session_config.recording_secs
    );

    let hooks = Collaborators::new(Arc::new(PrintingActivation {
        session_id: session_config.session_id.clone(),
    }));
    let (session, mut events) =
        SosSession::spawn(session_config, provider, Arc::new(DataUriEncoder), hooks);

    if let Entry::Hold = args.entry {
        session.press_start();
        sleep(Duration::from_millis(args.hold_ms)).await;
        session.press_end();
    }

    let safe_after = args.safe_after.map(Duration::from_secs);
    let mut safe_deadline: Option<Instant> = None;
    let mut interrupted = false;

    loop {
        let safe_timer = async move {
            match safe_deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                info!("Event: {}", serde_json::to_string(&event)?);

                match event {
                    SessionEvent::StateChanged { lifecycle: LifecycleState::Idle, .. } => {
                        info!("Hold released early, dismissing");
                        session.cancel();
                    }
                    SessionEvent::StateChanged { lifecycle: LifecycleState::Activated, .. } => {
                        if let Some(after) = safe_after {
                            safe_deadline = Some(Instant::now() + after);
                        }
                    }
                    SessionEvent::Activated { .. } if safe_after.is_none() => session.im_safe(),
                    SessionEvent::Ended { .. } => break,
                    _ => {}
                }
            }
            _ = safe_timer => {
                safe_deadline = None;
                session.im_safe();
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, tearing session down");
                interrupted = true;
                break;
            }
        }
    }

    let outcome = if interrupted {
        session.close().await?
    } else {
        session.join().await?
    };

    info!("Outcome: {}", serde_json::to_string(&outcome)?);
    info!(
        "Capture streams: {} acquired, {} released",
        stats.acquired(),
        stats.released()
    );

    Ok(())
}
