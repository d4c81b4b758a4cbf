use std::sync::{Arc, atomic::{AtomicBool, Ordering}};
use std::thread;
use std::time::Duration;

use waterer_hardware::error::HwError;
use waterer_hardware::util::{wait_for_path, wait_until_with_timeout};

#[test]
fn wait_until_ready_success_path() {
    let ready = Arc::new(AtomicBool::new(false));
    let ready_bg = ready.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(3));
        ready_bg.store(true, Ordering::Relaxed);
    });

    let res = wait_until_with_timeout(
        || ready.load(Ordering::Relaxed),
        Duration::from_millis(500),
        Duration::from_micros(200),
    );
    assert!(res.is_ok(), "expected success, got {res:?}");
}

#[test]
fn wait_until_ready_timeout_path() {
    let err = wait_until_with_timeout(
        || false,
        Duration::from_millis(5),
        Duration::from_micros(200),
    )
    .expect_err("expected timeout error");

    match err {
        HwError::WaitTimeout => {}
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn wait_for_missing_device_node_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hidraw0");
    let err = wait_for_path(&path, Duration::from_millis(5), Duration::from_millis(1))
        .expect_err("node does not exist");
    assert!(matches!(err, HwError::WaitTimeout));
}

#[test]
fn wait_for_device_node_that_appears() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ttyUSB0");
    let node = path.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(3));
        std::fs::write(node, b"").unwrap();
    });
    wait_for_path(&path, Duration::from_millis(500), Duration::from_millis(1))
        .expect("node appears");
}
