//! Controller states and the status returned from each step.

use crate::error::WaterError;
use crate::session::PlantRecord;
use crate::watering_log::WateringEvent;

/// Why the controller is shutting the pump down.
#[derive(Debug, Clone, PartialEq)]
pub enum AbortReason {
    /// External shutdown signal.
    Shutdown,
    /// Configured number of dosing decisions reached.
    ScanLimit,
    /// Unrecoverable error.
    Fault(WaterError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControllerState {
    AwaitingDevices,
    AwaitingBarcode,
    ReadingWeight { plant: PlantRecord, failures: u32 },
    Dosing { plant: PlantRecord, current_g: f64 },
    Recording { event: WateringEvent },
    Aborting(AbortReason),
    /// Terminal; pump has been halted and released.
    Stopped,
}

impl ControllerState {
    pub fn name(&self) -> &'static str {
        match self {
            ControllerState::AwaitingDevices => "awaiting_devices",
            ControllerState::AwaitingBarcode => "awaiting_barcode",
            ControllerState::ReadingWeight { .. } => "reading_weight",
            ControllerState::Dosing { .. } => "dosing",
            ControllerState::Recording { .. } => "recording",
            ControllerState::Aborting(_) => "aborting",
            ControllerState::Stopped => "stopped",
        }
    }

    /// States where a shutdown request is honored. Dosing and Recording
    /// always run to completion so every started dose is logged.
    pub fn accepts_shutdown(&self) -> bool {
        matches!(
            self,
            ControllerState::AwaitingDevices
                | ControllerState::AwaitingBarcode
                | ControllerState::ReadingWeight { .. }
        )
    }
}

/// Public status of a single controller step.
#[derive(Debug)]
pub enum ControllerStatus {
    /// Keep stepping.
    Running,
    /// Clean stop; pump already halted and released.
    Stopped,
    /// Stopped on a fatal error; pump has been asked to halt and release.
    Aborted(WaterError),
}
