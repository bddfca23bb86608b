// Integration tests for the cancellable countdown timer

use anyhow::Result;
use sos_guard::timer::Countdown;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, Instant};

struct Recorder {
    ticks: Arc<Mutex<Vec<u32>>>,
    completions: Arc<AtomicUsize>,
}

impl Recorder {
    fn new() -> Self {
        Self {
            ticks: Arc::new(Mutex::new(Vec::new())),
            completions: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn start(&self, seconds: u32) -> Countdown {
        let ticks = Arc::clone(&self.ticks);
        let completions = Arc::clone(&self.completions);
        Countdown::start(
            seconds,
            move |remaining| ticks.lock().unwrap().push(remaining),
            move || {
                completions.fetch_add(1, Ordering::SeqCst);
            },
        )
    }

    fn ticks(&self) -> Vec<u32> {
        self.ticks.lock().unwrap().clone()
    }

    fn completions(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }
}

#[tokio::test(start_paused = true)]
async fn test_countdown_ticks_down_then_completes_once() -> Result<()> {
    let recorder = Recorder::new();
    let mut countdown = recorder.start(3);

    let started = Instant::now();
    countdown.finished().await;

    // Verify: one tick per second, strictly decreasing to 0
    assert_eq!(recorder.ticks(), vec![2, 1, 0]);
    assert_eq!(recorder.completions(), 1);
    assert_eq!(started.elapsed(), Duration::from_secs(3));
    assert!(!countdown.is_running());

    // Nothing more after completion
    sleep(Duration::from_secs(5)).await;
    assert_eq!(recorder.ticks().len(), 3);
    assert_eq!(recorder.completions(), 1);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_future_ticks_and_completion() -> Result<()> {
    let recorder = Recorder::new();
    let countdown = recorder.start(60);

    sleep(Duration::from_millis(2500)).await;
    countdown.cancel();

    sleep(Duration::from_secs(120)).await;

    assert_eq!(recorder.ticks(), vec![59, 58]);
    assert_eq!(recorder.completions(), 0);
    assert!(!countdown.is_running());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_tick_callback_can_cancel_its_own_countdown() -> Result<()> {
    let ticks = Arc::new(Mutex::new(Vec::new()));
    let completions = Arc::new(AtomicUsize::new(0));
    let slot: Arc<Mutex<Option<Countdown>>> = Arc::new(Mutex::new(None));

    let tick_log = Arc::clone(&ticks);
    let tick_slot = Arc::clone(&slot);
    let done = Arc::clone(&completions);
    let countdown = Countdown::start(
        3,
        move |remaining| {
            tick_log.lock().unwrap().push(remaining);
            if remaining == 1 {
                if let Some(countdown) = tick_slot.lock().unwrap().as_ref() {
                    countdown.cancel();
                }
            }
        },
        move || {
            done.fetch_add(1, Ordering::SeqCst);
        },
    );
    *slot.lock().unwrap() = Some(countdown);

    sleep(Duration::from_secs(10)).await;

    assert_eq!(*ticks.lock().unwrap(), vec![2, 1]);
    assert_eq!(completions.load(Ordering::SeqCst), 0);
    let is_running = slot.lock().unwrap().as_ref().map(|c| c.is_running());
    assert_eq!(is_running, Some(false));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_cancel_is_idempotent_and_safe_after_completion() -> Result<()> {
    let recorder = Recorder::new();
    let mut countdown = recorder.start(1);
    countdown.finished().await;

    countdown.cancel();
    countdown.cancel();

    assert_eq!(recorder.ticks(), vec![0]);
    assert_eq!(recorder.completions(), 1);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_zero_second_countdown_completes_without_ticks() -> Result<()> {
    let recorder = Recorder::new();
    let mut countdown = recorder.start(0);
    countdown.finished().await;

    assert!(recorder.ticks().is_empty());
    assert_eq!(recorder.completions(), 1);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_independent_instances_do_not_interfere() -> Result<()> {
    let first = Recorder::new();
    let second = Recorder::new();

    let a = first.start(3);
    let mut b = second.start(2);

    sleep(Duration::from_millis(1500)).await;
    a.cancel();
    b.finished().await;

    assert_eq!(first.ticks(), vec![2]);
    assert_eq!(first.completions(), 0);
    assert_eq!(second.ticks(), vec![1, 0]);
    assert_eq!(second.completions(), 1);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_dropping_countdown_cancels_it() -> Result<()> {
    let recorder = Recorder::new();
    {
        let _countdown = recorder.start(5);
        sleep(Duration::from_millis(1500)).await;
    }

    sleep(Duration::from_secs(10)).await;
    assert_eq!(recorder.ticks(), vec![4]);
    assert_eq!(recorder.completions(), 0);

    Ok(())
}
