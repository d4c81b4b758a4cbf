//! `waterer run`: startup sync, dataset and calibration loading, then the
//! watering loop.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use eyre::{Result, WrapErr};
use tracing::{info, warn};
use waterer_config::{Config, load_plants, load_pump_data};
use waterer_core::{
    ControllerCfg, PlantCatalog, PumpCalibration, RunSummary, Session, Station, WateringController,
    WateringLog,
};
use waterer_hardware::{DevicePaths, OpenSettings};
use waterer_traits::{Announcer, Cue};

use crate::audio::announcer_for;
use crate::sync::sync_if_configured;

pub fn open_settings(cfg: &Config) -> OpenSettings {
    OpenSettings {
        pump_address: cfg.pump.address,
        pump_response_timeout: Duration::from_millis(cfg.pump.response_timeout_ms),
        hid_first_byte: cfg.devices.hid_first_byte,
        scale_line_ending: cfg.devices.scale_line_ending.byte(),
        ..OpenSettings::default()
    }
}

pub fn device_paths(cfg: &Config) -> DevicePaths {
    DevicePaths {
        barcode: cfg.devices.barcode.clone(),
        pump: cfg.devices.pump.clone(),
        scale: cfg.devices.scale.clone(),
    }
}

#[cfg(feature = "hardware")]
fn station(cfg: &Config, _shutdown: &Arc<AtomicBool>) -> Result<impl Station + 'static> {
    Ok(waterer_hardware::serial::SerialDevices::new(
        device_paths(cfg),
        open_settings(cfg),
    ))
}

/// Simulated station driven by `WATERER_SIM_CODES` (comma separated) and
/// `WATERER_SIM_WEIGHT` (grams). The run ends once the codes are used up.
#[cfg(not(feature = "hardware"))]
fn station(cfg: &Config, shutdown: &Arc<AtomicBool>) -> Result<impl Station + 'static> {
    let codes: Vec<String> = std::env::var("WATERER_SIM_CODES")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect();
    let weight = match std::env::var("WATERER_SIM_WEIGHT") {
        Ok(w) => w
            .trim()
            .parse::<f64>()
            .wrap_err_with(|| format!("WATERER_SIM_WEIGHT={w:?} is not a number"))?,
        Err(_) => 130.0,
    };
    info!(codes = codes.len(), weight_g = weight, "using simulated devices");
    Ok(waterer_hardware::SimulatedDevices::new(codes, weight, open_settings(cfg))
        .with_exhausted_flag(Arc::clone(shutdown)))
}

/// Dataset from disk; on failure the run goes on with no plants.
pub fn load_catalog(cfg: &Config, announcer: &dyn Announcer) -> PlantCatalog {
    let path = cfg.paths.plants_path();
    let loaded = load_plants(&path).and_then(|(plants, dialect)| {
        info!(plants = plants.len(), ?dialect, path = %path.display(), "plant dataset loaded");
        PlantCatalog::new(plants).map_err(eyre::Report::new)
    });
    loaded.unwrap_or_else(|e| {
        warn!(error = %e, path = %path.display(), "plant dataset unusable, continuing without plants");
        announcer.play(Cue::DatasetParseFailed);
        PlantCatalog::default()
    })
}

pub fn run(
    cfg: &Config,
    max_scans: Option<u64>,
    no_sync: bool,
    shutdown: Arc<AtomicBool>,
) -> Result<RunSummary> {
    let announcer = announcer_for(&cfg.audio, cfg.paths.sounds_path());
    announcer.play(Cue::Welcome);

    if no_sync {
        info!("startup sync disabled");
    } else {
        sync_if_configured(cfg, announcer.as_ref());
    }

    let catalog = load_catalog(cfg, announcer.as_ref());
    let calibration =
        PumpCalibration::try_from(&cfg.calibration).wrap_err("invalid [calibration] in config")?;
    let pump_data_path = cfg.paths.pump_data_path();
    let pump_data = pump_data_path
        .exists()
        .then(|| load_pump_data(&pump_data_path))
        .transpose()
        .unwrap_or_else(|e| {
            warn!(error = %e, "ignoring unreadable pump data");
            None
        });

    let devices = station(cfg, &shutdown)?;
    let mut controller = WateringController::builder()
        .with_devices(devices)
        .with_announcer(announcer)
        .with_log(WateringLog::new(cfg.paths.watering_log_path()))
        .with_config(ControllerCfg::from(cfg))
        .with_session(Session::new(calibration, catalog))
        .with_shutdown_flag(shutdown)
        .max_decisions(max_scans)
        .build()?;

    if let Some(data) = pump_data
        && let Err(e) = controller.apply_calibration(data.motor_speed, data.water_per_1_revolution)
    {
        warn!(error = %e, "keeping configured calibration");
    }

    let summary = controller.run()?;
    info!(
        decisions = summary.decisions,
        watered = summary.watered,
        "watering loop finished"
    );
    Ok(summary)
}
