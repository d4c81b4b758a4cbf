#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use waterer_core::mocks::{MockStation, RecordingAnnouncer};
use waterer_core::{
    ControllerCfg, PlantCatalog, PlantRecord, PumpCalibration, Session, WateringController,
    WateringLog,
};
use waterer_traits::ManualClock;

pub fn plant(id: &str, target: f64, description: &str) -> PlantRecord {
    PlantRecord {
        id: id.into(),
        target_weight_g: target,
        description: Some(description.into()),
    }
}

pub fn session() -> Session {
    Session::new(
        PumpCalibration::new(70.0, 0.85).unwrap(),
        PlantCatalog::new(vec![plant("7", 150.0, "Basil"), plant("8", 90.0, "Mint")]).unwrap(),
    )
}

pub struct Harness {
    pub controller: WateringController,
    pub announcer: RecordingAnnouncer,
    pub clock: ManualClock,
    pub log: WateringLog,
    pub shutdown: Arc<AtomicBool>,
}

pub fn harness(
    dir: &Path,
    station: MockStation,
    cfg: ControllerCfg,
    shutdown: Arc<AtomicBool>,
) -> Harness {
    let announcer = RecordingAnnouncer::new();
    let clock = ManualClock::new();
    let log = WateringLog::new(dir.join("watering.csv"));
    let controller = WateringController::builder()
        .with_devices(station)
        .with_announcer(announcer.clone())
        .with_log(log.clone())
        .with_clock(clock.clone())
        .with_config(cfg)
        .with_session(session())
        .with_shutdown_flag(shutdown.clone())
        .build()
        .expect("controller build");
    Harness {
        controller,
        announcer,
        clock,
        log,
        shutdown,
    }
}
