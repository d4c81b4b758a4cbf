mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use common::harness;
use rstest::rstest;
use tempfile::tempdir;
use waterer_core::mocks::{MockStation, PumpCall, PumpOp, RecordingPump, ScriptedScanner, SeqScale};
use waterer_core::{ControllerCfg, ControllerState, ControllerStatus, WaterError};
use waterer_traits::Cue;

#[rstest]
fn protocol_error_halts_and_releases_pump() {
    let dir = tempdir().unwrap();
    let pump = RecordingPump::new().failing_on(PumpOp::Go);
    let station = MockStation::new(
        ScriptedScanner::new(["7"]),
        SeqScale::constant(130.0, 1),
        pump.clone(),
    );
    let mut h = harness(dir.path(), station, ControllerCfg::default(), Arc::default());

    let err = h.controller.run().expect_err("protocol errors are fatal");
    match err.downcast_ref::<WaterError>() {
        Some(WaterError::Protocol(_)) => {}
        other => panic!("expected Protocol, got: {other:?}"),
    }
    assert_eq!(
        pump.calls(),
        vec![
            PumpCall::SetMotorSpeed(70.0),
            PumpCall::SetRevolutions(23.53),
            PumpCall::Go,
            PumpCall::Halt,
            PumpCall::Cancel,
        ]
    );
    // Nothing is recorded for a dose that failed.
    assert!(h.log.read_all().unwrap().is_empty());
    assert_eq!(*h.controller.state(), ControllerState::Stopped);
}

#[rstest]
fn release_is_attempted_even_if_halt_fails() {
    let dir = tempdir().unwrap();
    let pump = RecordingPump::new().failing_on(PumpOp::Halt);
    let station = MockStation::new(
        ScriptedScanner::new(["7"]),
        SeqScale::constant(130.0, 1),
        pump.clone(),
    );
    let cfg = ControllerCfg {
        max_decisions: Some(1),
        ..ControllerCfg::default()
    };
    let mut h = harness(dir.path(), station, cfg, Arc::default());
    h.controller.run().unwrap();

    let calls = pump.calls();
    assert_eq!(&calls[calls.len() - 2..], &[PumpCall::Halt, PumpCall::Cancel]);
}

#[rstest]
fn shutdown_before_devices_skips_pump_cleanup() {
    let dir = tempdir().unwrap();
    let pump = RecordingPump::new();
    let shutdown = Arc::new(AtomicBool::new(true));
    let station = MockStation::new(
        ScriptedScanner::new(["7"]),
        SeqScale::constant(130.0, 1),
        pump.clone(),
    );
    let mut h = harness(dir.path(), station, ControllerCfg::default(), shutdown);

    assert!(matches!(h.controller.step(), ControllerStatus::Stopped));
    assert!(pump.calls().is_empty());
}

#[rstest]
fn shutdown_waits_for_the_dose_to_be_recorded() {
    let dir = tempdir().unwrap();
    let pump = RecordingPump::new();
    let station = MockStation::new(
        ScriptedScanner::new(["7"]),
        SeqScale::constant(130.0, 1),
        pump.clone(),
    );
    let mut h = harness(dir.path(), station, ControllerCfg::default(), Arc::default());

    // devices, barcode, weight
    for _ in 0..3 {
        assert!(matches!(h.controller.step(), ControllerStatus::Running));
    }
    assert!(matches!(h.controller.state(), ControllerState::Dosing { .. }));

    h.shutdown.store(true, Ordering::Relaxed);
    // dosing, recording
    assert!(matches!(h.controller.step(), ControllerStatus::Running));
    assert!(matches!(h.controller.step(), ControllerStatus::Running));
    assert!(matches!(h.controller.step(), ControllerStatus::Stopped));

    assert_eq!(h.log.read_all().unwrap().len(), 1);
    assert_eq!(
        pump.calls(),
        vec![
            PumpCall::SetMotorSpeed(70.0),
            PumpCall::SetRevolutions(23.53),
            PumpCall::Go,
            PumpCall::Halt,
            PumpCall::Cancel,
        ]
    );
}

#[rstest]
fn unwritable_log_aborts() {
    let dir = tempdir().unwrap();
    let pump = RecordingPump::new();
    let station = MockStation::new(
        ScriptedScanner::new(["7"]),
        SeqScale::constant(130.0, 1),
        pump.clone(),
    );
    let log_dir = dir.path().join("missing-dir");
    let mut h = harness(&log_dir, station, ControllerCfg::default(), Arc::default());

    let err = h.controller.run().expect_err("log append fails");
    assert!(matches!(
        err.downcast_ref::<WaterError>(),
        Some(WaterError::Io(_))
    ));
    assert_eq!(pump.calls().last(), Some(&PumpCall::Cancel));
}

#[rstest]
fn shutdown_while_waiting_for_a_barcode_halts_and_releases_pump() {
    let dir = tempdir().unwrap();
    let pump = RecordingPump::new();
    let station = MockStation::new(
        ScriptedScanner::default().then_idle(100),
        SeqScale::default(),
        pump.clone(),
    );
    let mut h = harness(dir.path(), station, ControllerCfg::default(), Arc::default());

    // Devices come up, then the scanner sits idle.
    for _ in 0..3 {
        assert!(matches!(h.controller.step(), ControllerStatus::Running));
    }
    assert_eq!(*h.controller.state(), ControllerState::AwaitingBarcode);
    assert_eq!(h.announcer.cue_count(Cue::WaitingBarcode), 1);

    h.shutdown.store(true, Ordering::Relaxed);
    assert!(matches!(h.controller.step(), ControllerStatus::Stopped));
    assert_eq!(pump.calls(), vec![PumpCall::Halt, PumpCall::Cancel]);
    assert!(h.log.read_all().unwrap().is_empty());
}
