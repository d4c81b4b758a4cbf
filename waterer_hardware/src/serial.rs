//! Serial and hidraw device opening for real stations.

use std::fs::File;
use std::path::Path;
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::info;
use waterer_traits::{BarcodeScanner, BoxError, DeviceKind, DeviceLocator, DeviceOpener, Pump, Scale};

use crate::error::{HwError, Result};
use crate::hid::{HidDecoder, PolledHidScanner};
use crate::locator::{DevicePaths, PathLocator};
use crate::pump::{PUMP_BAUD_RATE, PumpProtocol};
use crate::scale::{LineScale, SCALE_BAUD_RATE};
use crate::OpenSettings;

/// Pump UART: 4800 baud, 7 data bits, odd parity, 1 stop bit, no flow control.
/// Reads give up after `response_timeout`, which ends a response frame.
pub fn open_pump_port(path: &Path, response_timeout: Duration) -> Result<Box<dyn SerialPort>> {
    let port = serialport::new(path.to_string_lossy(), PUMP_BAUD_RATE)
        .data_bits(DataBits::Seven)
        .parity(Parity::Odd)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(response_timeout)
        .open()?;
    info!(path = %path.display(), baud = PUMP_BAUD_RATE, "pump port open");
    Ok(port)
}

/// Scale UART: 9600 baud 8N1, zero read timeout so polls never block.
pub fn open_scale_port(path: &Path) -> Result<Box<dyn SerialPort>> {
    let port = serialport::new(path.to_string_lossy(), SCALE_BAUD_RATE)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(Duration::ZERO)
        .open()?;
    info!(path = %path.display(), baud = SCALE_BAUD_RATE, "scale port open");
    Ok(port)
}

/// Finds devices by node path and opens the hidraw node and both serial ports.
pub struct SerialDevices {
    paths: DevicePaths,
    locator: PathLocator,
    settings: OpenSettings,
}

impl SerialDevices {
    pub fn new(paths: DevicePaths, settings: OpenSettings) -> Self {
        Self {
            locator: PathLocator::new(paths.clone()),
            paths,
            settings,
        }
    }
}

impl DeviceLocator for SerialDevices {
    fn is_present(&self, device: DeviceKind) -> bool {
        self.locator.is_present(device)
    }
}

impl DeviceOpener for SerialDevices {
    fn open_scanner(&mut self) -> std::result::Result<Box<dyn BarcodeScanner>, BoxError> {
        let node = File::open(&self.paths.barcode).map_err(HwError::from)?;
        info!(path = %self.paths.barcode.display(), "barcode scanner open");
        Ok(Box::new(PolledHidScanner::spawn(
            node,
            HidDecoder::new(self.settings.hid_first_byte),
            self.settings.scanner_poll,
        )))
    }

    fn open_scale(&mut self) -> std::result::Result<Box<dyn Scale>, BoxError> {
        let port = open_scale_port(&self.paths.scale)?;
        Ok(Box::new(LineScale::with_line_ending(
            port,
            self.settings.scale_line_ending,
        )))
    }

    fn open_pump(&mut self) -> std::result::Result<Box<dyn Pump>, BoxError> {
        let port = open_pump_port(&self.paths.pump, self.settings.pump_response_timeout)?;
        let pump = PumpProtocol::new(port, self.settings.pump_address).map_err(HwError::from)?;
        Ok(Box::new(pump))
    }
}
