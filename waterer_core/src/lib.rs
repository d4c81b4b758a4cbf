#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core watering logic (hardware-agnostic).
//!
//! All hardware interactions go through the `waterer_traits` seams
//! (`DeviceLocator`, `DeviceOpener`, `BarcodeScanner`, `Scale`, `Pump`,
//! `Announcer`, `Clock`).
//!
//! ## Architecture
//!
//! - **Session**: plant catalog and pump calibration (`session`, `calibration`)
//! - **Dosing**: revolutions needed to reach a target weight (`dosing`)
//! - **Control loop**: polling state machine (`controller`, `status`)
//! - **Watering log**: append-only CSV record of every decision (`watering_log`)
//! - **Retry**: bounded backoff for malformed scale readings (`retry`)

pub mod builder;
pub mod calibration;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod dosing;
pub mod error;
pub mod hw_error;
pub mod mocks;
pub mod retry;
pub mod session;
pub mod status;
pub mod watering_log;

pub use builder::ControllerBuilder;
pub use calibration::PumpCalibration;
pub use config::{ControllerCfg, PollingCfg};
pub use controller::{RunSummary, WateringController};
pub use dosing::{DoseDecision, plan_dose};
pub use error::{BuildError, WaterError};
pub use retry::RetryPolicy;
pub use session::{PlantCatalog, PlantRecord, Session};
pub use status::{AbortReason, ControllerState, ControllerStatus};
pub use watering_log::{DoseRecord, WateringEvent, WateringLog};

use waterer_traits::{DeviceLocator, DeviceOpener};

/// Everything the controller needs from the station: presence checks and
/// device opening.
pub trait Station: DeviceLocator + DeviceOpener {}

impl<T: DeviceLocator + DeviceOpener> Station for T {}
