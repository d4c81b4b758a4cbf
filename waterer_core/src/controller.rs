//! The watering control loop.
//!
//! A single-threaded polling state machine:
//!
//! `AwaitingDevices → AwaitingBarcode → ReadingWeight → Dosing → Recording → AwaitingBarcode`
//!
//! with `Aborting` reachable on a fatal error, a shutdown request or the scan
//! limit. Every exit goes through `Aborting`, which halts and releases the
//! pump before the controller reports `Stopped` or `Aborted`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error, info, warn};
use waterer_traits::{Announcer, BarcodeScanner, Clock, Cue, DeviceKind, Pump, Scale};

use crate::Station;
use crate::config::ControllerCfg;
use crate::dosing::{DoseDecision, plan_dose};
use crate::error::{Result, WaterError};
use crate::hw_error::map_hw_error;
use crate::session::{PlantRecord, Session};
use crate::status::{AbortReason, ControllerState, ControllerStatus};
use crate::watering_log::{DoseRecord, WateringEvent, WateringLog};

/// Totals reported when a run ends cleanly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub decisions: u64,
    pub watered: u64,
}

/// Spoken confirmation for a known plant: the code digit by digit, then the description.
pub fn plant_announcement(plant: &PlantRecord) -> String {
    format!(
        "Read plant code {}. The description is {}.",
        spell(&plant.id),
        plant.description.as_deref().unwrap_or("not available")
    )
}

/// Spoken warning for a code missing from the dataset.
pub fn unknown_plant_announcement(code: &str) -> String {
    format!("Warning! Unknown plant code {}.", spell(code))
}

fn spell(code: &str) -> String {
    let mut out = String::with_capacity(code.len() * 2);
    for (i, ch) in code.chars().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}

pub struct WateringController {
    pub(crate) devices: Box<dyn Station>,
    pub(crate) announcer: Box<dyn Announcer>,
    pub(crate) clock: Box<dyn Clock>,
    pub(crate) log: WateringLog,
    pub(crate) cfg: ControllerCfg,
    pub(crate) session: Session,
    pub(crate) shutdown: Arc<AtomicBool>,
    pub(crate) state: ControllerState,
    pub(crate) scanner: Option<Box<dyn BarcodeScanner>>,
    pub(crate) scale: Option<Box<dyn Scale>>,
    pub(crate) pump: Option<Box<dyn Pump>>,
    pub(crate) summary: RunSummary,
    /// The "waiting for barcode" cue has played for the pending scan.
    pub(crate) barcode_prompted: bool,
}

impl core::fmt::Debug for WateringController {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WateringController")
            .field("state", &self.state.name())
            .field("plants", &self.session.plants().len())
            .field("calibration", &self.session.calibration())
            .field("log", &self.log.path())
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}

impl WateringController {
    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    /// Handle to the shutdown flag; setting it stops the loop at the next
    /// iteration boundary.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Validate and apply new calibration values, announcing them if they changed.
    pub fn apply_calibration(&mut self, motor_speed: f64, water_per_revolution: f64) -> Result<bool> {
        let changed = self
            .session
            .apply_calibration_values(motor_speed, water_per_revolution)?;
        if changed {
            self.announcer
                .say(&self.session.calibration().announcement());
        }
        Ok(changed)
    }

    /// Drive the loop until it stops.
    pub fn run(&mut self) -> Result<RunSummary> {
        info!(
            plants = self.session.plants().len(),
            log = ?self.log.path(),
            "watering loop starting"
        );
        loop {
            match self.step() {
                ControllerStatus::Running => {}
                ControllerStatus::Stopped => {
                    info!(
                        decisions = self.summary.decisions,
                        watered = self.summary.watered,
                        "watering loop stopped"
                    );
                    return Ok(self.summary);
                }
                ControllerStatus::Aborted(e) => return Err(eyre::Report::new(e)),
            }
        }
    }

    /// One iteration of the control loop.
    pub fn step(&mut self) -> ControllerStatus {
        if self.state.accepts_shutdown() && self.shutdown.load(Ordering::Relaxed) {
            info!(state = self.state.name(), "shutdown requested");
            self.state = ControllerState::Aborting(AbortReason::Shutdown);
        }

        let state = std::mem::replace(&mut self.state, ControllerState::Stopped);
        debug!(state = state.name(), "step");
        self.state = match state {
            ControllerState::AwaitingDevices => self.await_devices(),
            ControllerState::AwaitingBarcode => self.await_barcode(),
            ControllerState::ReadingWeight { plant, failures } => self.read_weight(plant, failures),
            ControllerState::Dosing { plant, current_g } => self.dose(plant, current_g),
            ControllerState::Recording { event } => self.record(event),
            ControllerState::Aborting(reason) => return self.abort(reason),
            ControllerState::Stopped => ControllerState::Stopped,
        };
        if matches!(self.state, ControllerState::Stopped) {
            ControllerStatus::Stopped
        } else {
            ControllerStatus::Running
        }
    }

    fn is_open(&self, kind: DeviceKind) -> bool {
        match kind {
            DeviceKind::Barcode => self.scanner.is_some(),
            DeviceKind::Pump => self.pump.is_some(),
            DeviceKind::Scale => self.scale.is_some(),
        }
    }

    fn open(&mut self, kind: DeviceKind) -> std::result::Result<(), waterer_traits::BoxError> {
        match kind {
            DeviceKind::Barcode => self.scanner = Some(self.devices.open_scanner()?),
            DeviceKind::Pump => self.pump = Some(self.devices.open_pump()?),
            DeviceKind::Scale => self.scale = Some(self.devices.open_scale()?),
        }
        Ok(())
    }

    fn await_devices(&mut self) -> ControllerState {
        for kind in DeviceKind::ALL {
            if self.is_open(kind) {
                continue;
            }
            if !self.devices.is_present(kind) {
                warn!(device = %kind, "device not present");
                self.announcer.play(kind.connect_cue());
                self.clock.sleep(self.cfg.polling.for_device(kind));
                return ControllerState::AwaitingDevices;
            }
            if let Err(e) = self.open(kind) {
                warn!(device = %kind, error = %e, "failed to open device");
                self.announcer.play(kind.connect_cue());
                self.clock.sleep(self.cfg.polling.for_device(kind));
                return ControllerState::AwaitingDevices;
            }
            info!(device = %kind, "device ready");
        }
        ControllerState::AwaitingBarcode
    }

    fn await_barcode(&mut self) -> ControllerState {
        let Some(scanner) = self.scanner.as_mut() else {
            return ControllerState::AwaitingDevices;
        };
        if !self.barcode_prompted {
            self.announcer.play(Cue::WaitingBarcode);
            self.barcode_prompted = true;
        }
        let polled = scanner.read_code();
        if !matches!(polled, Ok(None)) {
            self.barcode_prompted = false;
        }
        let code = match polled {
            Ok(Some(code)) => code.trim().to_string(),
            // Poll timed out; loop so shutdown is checked between polls.
            Ok(None) => return ControllerState::AwaitingBarcode,
            Err(e) => {
                return match map_hw_error(DeviceKind::Barcode, &*e) {
                    WaterError::Decode(msg) => {
                        warn!(error = %msg, "barcode decode failed");
                        ControllerState::AwaitingBarcode
                    }
                    other => {
                        warn!(error = %other, "barcode scanner lost");
                        self.scanner = None;
                        ControllerState::AwaitingDevices
                    }
                };
            }
        };

        match self.session.plants().get(&code) {
            Some(plant) => {
                let plant = plant.clone();
                info!(plant_id = %plant.id, target_g = plant.target_weight_g, "plant identified");
                self.announcer.say(&plant_announcement(&plant));
                self.announcer.play(Cue::WaitingWeight);
                ControllerState::ReadingWeight { plant, failures: 0 }
            }
            None => {
                warn!(error = %WaterError::UnknownPlant(code.clone()), "unknown plant scanned");
                self.announcer.say(&unknown_plant_announcement(&code));
                ControllerState::AwaitingBarcode
            }
        }
    }

    fn read_weight(&mut self, plant: PlantRecord, failures: u32) -> ControllerState {
        let Some(scale) = self.scale.as_mut() else {
            return ControllerState::AwaitingDevices;
        };
        match scale.read_weight() {
            Ok(Some(current_g)) => {
                info!(plant_id = %plant.id, weight_g = current_g, "scale reading");
                ControllerState::Dosing { plant, current_g }
            }
            Ok(None) => {
                self.announcer.play(Cue::WaitingWeight);
                self.clock.sleep(self.cfg.polling.weight);
                ControllerState::ReadingWeight { plant, failures }
            }
            Err(e) => match map_hw_error(DeviceKind::Scale, &*e) {
                WaterError::MalformedReading(line) => {
                    let failures = failures + 1;
                    let policy = self.cfg.scale_retry;
                    if policy.exhausted(failures) {
                        error!(
                            plant_id = %plant.id,
                            error = %WaterError::ScaleRetriesExhausted { attempts: failures },
                            "giving up on this scan"
                        );
                        return ControllerState::AwaitingBarcode;
                    }
                    let delay = policy.delay_after(failures);
                    warn!(%line, failures, ?delay, "malformed scale reading, retrying");
                    self.clock.sleep(delay);
                    ControllerState::ReadingWeight { plant, failures }
                }
                other => {
                    warn!(error = %other, "scale lost");
                    self.scale = None;
                    ControllerState::AwaitingDevices
                }
            },
        }
    }

    fn dose(&mut self, plant: PlantRecord, current_g: f64) -> ControllerState {
        let calibration = self.session.calibration();
        let decision = plan_dose(
            current_g,
            plant.target_weight_g,
            calibration.water_per_revolution(),
        );
        let dose = match decision {
            DoseDecision::Water {
                delta_g,
                revolutions,
            } => {
                info!(plant_id = %plant.id, delta_g, revolutions, "watering plant");
                let Some(pump) = self.pump.as_mut() else {
                    return ControllerState::Aborting(AbortReason::Fault(
                        WaterError::DeviceNotPresent(DeviceKind::Pump),
                    ));
                };
                let sent = pump
                    .set_motor_speed(calibration.motor_speed())
                    .and_then(|()| pump.set_revolutions(revolutions))
                    .and_then(|()| pump.go());
                if let Err(e) = sent {
                    return ControllerState::Aborting(AbortReason::Fault(map_hw_error(
                        DeviceKind::Pump,
                        &*e,
                    )));
                }
                Some(DoseRecord {
                    motor_speed: calibration.motor_speed(),
                    revolutions,
                    water_per_revolution: calibration.water_per_revolution(),
                })
            }
            DoseDecision::Skip { excess_g } => {
                info!(plant_id = %plant.id, excess_g, "plant has excess water");
                None
            }
        };
        ControllerState::Recording {
            event: WateringEvent {
                timestamp: chrono::Local::now(),
                plant_id: plant.id,
                current_g,
                desired_g: plant.target_weight_g,
                dose,
            },
        }
    }

    fn record(&mut self, event: WateringEvent) -> ControllerState {
        if let Err(e) = self.log.append(&event) {
            return ControllerState::Aborting(AbortReason::Fault(e));
        }
        self.summary.decisions += 1;
        if event.watered() {
            self.summary.watered += 1;
        }
        if let Some(limit) = self.cfg.max_decisions
            && self.summary.decisions >= limit
        {
            return ControllerState::Aborting(AbortReason::ScanLimit);
        }
        ControllerState::AwaitingBarcode
    }

    fn abort(&mut self, reason: AbortReason) -> ControllerStatus {
        match self.pump.as_mut() {
            Some(pump) => {
                if let Err(e) = pump.halt() {
                    error!(error = %e, "pump halt failed");
                }
                if let Err(e) = pump.cancel() {
                    error!(error = %e, "pump release failed");
                }
            }
            None => debug!("no pump open, nothing to halt"),
        }
        self.state = ControllerState::Stopped;
        match reason {
            AbortReason::Fault(e) => {
                error!(error = %e, "aborting watering loop");
                ControllerStatus::Aborted(e)
            }
            other => {
                info!(reason = ?other, "pump halted and released");
                ControllerStatus::Stopped
            }
        }
    }
}
