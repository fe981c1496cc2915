use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use scalepos_hardware::error::HwError;
use scalepos_hardware::util::wait_until_ready;

#[test]
fn wait_until_ready_success_path() {
    let busy = Arc::new(AtomicBool::new(true));
    let busy_bg = busy.clone();
    // Chip reports ready after a short delay
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(3));
        busy_bg.store(false, Ordering::Relaxed);
    });

    let res = wait_until_ready(
        || busy.load(Ordering::Relaxed),
        Duration::from_millis(200),
        Duration::from_micros(200),
    );
    assert!(res.is_ok(), "expected success, got {res:?}");
}

#[test]
fn wait_until_ready_timeout_path() {
    let busy = Arc::new(AtomicBool::new(true));

    let err = wait_until_ready(
        || busy.load(Ordering::Relaxed),
        Duration::from_millis(5),
        Duration::from_micros(200),
    )
    .expect_err("expected timeout error");

    match err {
        HwError::DataReadyTimeout => {}
        other => panic!("unexpected error: {other:?}"),
    }
}
