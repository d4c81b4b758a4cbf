//! Device protocols for the watering station: barcode HID decoding, pump
//! framing, scale line parsing, plus simulated devices for dry runs.
//!
//! Real serial ports are only opened with the `hardware` feature.

pub mod error;
pub mod hid;
pub mod locator;
pub mod pump;
pub mod scale;
#[cfg(feature = "hardware")]
pub mod serial;
pub mod util;

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info};
use waterer_traits::{
    BarcodeScanner, BoxError, DeviceKind, DeviceLocator, DeviceOpener, Pump, Scale,
};

use crate::error::{DecodeError, HwError};
use crate::pump::PumpCommand;

pub use hid::{HidDecoder, HidScanner, PolledHidScanner};
pub use locator::{DevicePaths, PathLocator};
pub use pump::{PumpProtocol, PumpResponse};
pub use scale::LineScale;

/// Per-station knobs needed when opening devices.
#[derive(Debug, Clone)]
pub struct OpenSettings {
    pub pump_address: u8,
    pub pump_response_timeout: Duration,
    pub hid_first_byte: usize,
    pub scale_line_ending: u8,
    /// Longest a barcode poll blocks before reporting "no code yet".
    pub scanner_poll: Duration,
}

impl Default for OpenSettings {
    fn default() -> Self {
        Self {
            pump_address: 1,
            pump_response_timeout: Duration::from_millis(500),
            hid_first_byte: 0,
            scale_line_ending: b'\n',
            scanner_poll: Duration::from_millis(250),
        }
    }
}

/// Scanner that replays a fixed list of codes.
///
/// Once the list is exhausted it raises `on_exhausted` (if any) and reports
/// end of stream, which lets a simulated run wind down.
pub struct SimulatedScanner {
    codes: VecDeque<String>,
    on_exhausted: Option<Arc<AtomicBool>>,
}

impl SimulatedScanner {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codes: codes.into_iter().map(Into::into).collect(),
            on_exhausted: None,
        }
    }

    pub fn with_exhausted_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.on_exhausted = Some(flag);
        self
    }
}

impl BarcodeScanner for SimulatedScanner {
    fn read_code(&mut self) -> Result<Option<String>, BoxError> {
        match self.codes.pop_front() {
            Some(code) => {
                info!(%code, "barcode scanned (simulated)");
                Ok(Some(code))
            }
            None => {
                if let Some(flag) = &self.on_exhausted {
                    flag.store(true, Ordering::Relaxed);
                }
                Err(HwError::from(DecodeError::EndOfStream).into())
            }
        }
    }
}

/// Scale that reports nothing for `warmup_polls` polls, then a constant weight.
pub struct SimulatedScale {
    weight: f64,
    warmup_polls: u32,
}

impl SimulatedScale {
    pub fn new(weight: f64) -> Self {
        Self {
            weight,
            warmup_polls: 0,
        }
    }

    pub fn with_warmup(mut self, polls: u32) -> Self {
        self.warmup_polls = polls;
        self
    }
}

impl Scale for SimulatedScale {
    fn read_weight(&mut self) -> Result<Option<f64>, BoxError> {
        if self.warmup_polls > 0 {
            self.warmup_polls -= 1;
            return Ok(None);
        }
        debug!(weight_g = self.weight, "scale reading (simulated)");
        Ok(Some(self.weight))
    }
}

/// Pump that encodes every command (so invalid values still fail) and logs the frame.
#[derive(Debug, Default)]
pub struct SimulatedPump {
    address: u8,
    commands: Vec<PumpCommand>,
}

impl SimulatedPump {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[PumpCommand] {
        &self.commands
    }

    fn record(&mut self, command: PumpCommand) -> Result<(), BoxError> {
        let frame = command.encode(self.address).map_err(HwError::from)?;
        info!(?command, frame = ?frame, "pump command (simulated)");
        self.commands.push(command);
        Ok(())
    }
}

impl Pump for SimulatedPump {
    fn set_motor_speed(&mut self, percent: f64) -> Result<(), BoxError> {
        self.record(PumpCommand::SetSpeed(percent))
    }
    fn set_revolutions(&mut self, count: f64) -> Result<(), BoxError> {
        self.record(PumpCommand::SetRevolutions(count))
    }
    fn go(&mut self) -> Result<(), BoxError> {
        self.record(PumpCommand::Start)
    }
    fn halt(&mut self) -> Result<(), BoxError> {
        self.record(PumpCommand::Stop)
    }
    fn cancel(&mut self) -> Result<(), BoxError> {
        self.record(PumpCommand::Reset)
    }
}

/// Always-present simulated station.
pub struct SimulatedDevices {
    codes: Vec<String>,
    weight: f64,
    settings: OpenSettings,
    on_exhausted: Option<Arc<AtomicBool>>,
}

impl SimulatedDevices {
    pub fn new(codes: Vec<String>, weight: f64, settings: OpenSettings) -> Self {
        Self {
            codes,
            weight,
            settings,
            on_exhausted: None,
        }
    }

    pub fn with_exhausted_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.on_exhausted = Some(flag);
        self
    }
}

impl DeviceLocator for SimulatedDevices {
    fn is_present(&self, _device: DeviceKind) -> bool {
        true
    }
}

impl DeviceOpener for SimulatedDevices {
    fn open_scanner(&mut self) -> Result<Box<dyn BarcodeScanner>, BoxError> {
        // Codes are handed out once; a reopened scanner starts empty.
        let mut scanner = SimulatedScanner::new(std::mem::take(&mut self.codes));
        if let Some(flag) = &self.on_exhausted {
            scanner = scanner.with_exhausted_flag(flag.clone());
        }
        Ok(Box::new(scanner))
    }

    fn open_scale(&mut self) -> Result<Box<dyn Scale>, BoxError> {
        Ok(Box::new(SimulatedScale::new(self.weight)))
    }

    fn open_pump(&mut self) -> Result<Box<dyn Pump>, BoxError> {
        Ok(Box::new(SimulatedPump::new(self.settings.pump_address)))
    }
}
