// Integration tests for the hold gesture detector
//
// Time is paused so the 1000ms threshold is hit exactly.

use anyhow::Result;
use sos_guard::gesture::{HoldDetector, HoldSignal};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;

fn detector() -> (HoldDetector, mpsc::UnboundedReceiver<HoldSignal>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let detector = HoldDetector::new(Duration::from_millis(1000), move |signal| {
        let _ = tx.send(signal);
    });
    (detector, rx)
}

#[tokio::test(start_paused = true)]
async fn test_hold_past_threshold_confirms_once() -> Result<()> {
    let (mut detector, mut rx) = detector();

    let id = detector.on_press_start().expect("press should arm");
    sleep(Duration::from_millis(1200)).await;

    // Verify: exactly one confirmation
    assert_eq!(rx.try_recv()?, HoldSignal::Confirmed(id));
    assert!(rx.try_recv().is_err());
    assert!(!detector.is_armed());

    // Releasing after confirmation is a no-op
    detector.on_press_end();
    sleep(Duration::from_secs(2)).await;
    assert!(rx.try_recv().is_err());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_early_release_aborts_and_timer_never_fires() -> Result<()> {
    let (mut detector, mut rx) = detector();

    let id = detector.on_press_start().expect("press should arm");
    sleep(Duration::from_millis(400)).await;
    detector.on_press_end();

    assert_eq!(rx.try_recv()?, HoldSignal::Aborted(id));

    // Verify: nothing fires after the threshold would have elapsed
    sleep(Duration::from_secs(3)).await;
    assert!(rx.try_recv().is_err());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_release_without_press_is_noop() -> Result<()> {
    let (mut detector, mut rx) = detector();

    detector.on_press_end();
    detector.on_press_end();

    sleep(Duration::from_secs(2)).await;
    assert!(rx.try_recv().is_err());
    assert!(!detector.is_armed());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_second_press_while_armed_is_ignored() -> Result<()> {
    let (mut detector, mut rx) = detector();

    let first = detector.on_press_start();
    assert!(first.is_some());
    sleep(Duration::from_millis(500)).await;
    assert!(detector.on_press_start().is_none());

    // The original press still confirms at 1000ms
    sleep(Duration::from_millis(600)).await;
    assert_eq!(rx.try_recv()?, HoldSignal::Confirmed(first.unwrap()));
    assert!(rx.try_recv().is_err());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_new_press_gets_new_id() -> Result<()> {
    let (mut detector, mut rx) = detector();

    let first = detector.on_press_start().unwrap();
    detector.on_press_end();
    let second = detector.on_press_start().unwrap();
    assert_ne!(first, second);

    sleep(Duration::from_millis(1100)).await;
    assert_eq!(rx.try_recv()?, HoldSignal::Aborted(first));
    assert_eq!(rx.try_recv()?, HoldSignal::Confirmed(second));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_cancel_disarms_silently() -> Result<()> {
    let (mut detector, mut rx) = detector();

    detector.on_press_start();
    detector.cancel();

    sleep(Duration::from_secs(2)).await;
    assert!(rx.try_recv().is_err());
    assert!(!detector.is_armed());

    Ok(())
}
