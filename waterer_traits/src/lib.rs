//! Device and collaborator seams shared by the watering station crates.
//!
//! Hardware-facing traits return `Box<dyn Error + Send + Sync>` so drivers can
//! surface their own error types; `waterer_core` maps them back to typed errors.

pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

use std::fmt;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The three devices a station needs before it can water anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Barcode,
    Pump,
    Scale,
}

impl DeviceKind {
    /// Polling order used while waiting for devices.
    pub const ALL: [DeviceKind; 3] = [DeviceKind::Barcode, DeviceKind::Pump, DeviceKind::Scale];

    pub fn as_str(self) -> &'static str {
        match self {
            DeviceKind::Barcode => "barcode",
            DeviceKind::Pump => "pump",
            DeviceKind::Scale => "scale",
        }
    }

    /// Cue played while this device is missing.
    pub fn connect_cue(self) -> Cue {
        match self {
            DeviceKind::Barcode => Cue::ConnectBarcode,
            DeviceKind::Pump => Cue::ConnectPump,
            DeviceKind::Scale => Cue::ConnectScale,
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answers whether a device is currently attached (e.g. its node exists).
pub trait DeviceLocator {
    fn is_present(&self, device: DeviceKind) -> bool;
}

/// Opens attached devices. Called once all of them are present.
pub trait DeviceOpener {
    fn open_scanner(&mut self) -> Result<Box<dyn BarcodeScanner>, BoxError>;
    fn open_scale(&mut self) -> Result<Box<dyn Scale>, BoxError>;
    fn open_pump(&mut self) -> Result<Box<dyn Pump>, BoxError>;
}

pub trait BarcodeScanner {
    /// One poll of the scanner: `Ok(None)` means no complete code arrived
    /// within the scanner's poll interval.
    fn read_code(&mut self) -> Result<Option<String>, BoxError>;
}

pub trait Scale {
    /// One poll of the scale: `Ok(None)` means no reading is available yet.
    fn read_weight(&mut self) -> Result<Option<f64>, BoxError>;
}

pub trait Pump {
    fn set_motor_speed(&mut self, percent: f64) -> Result<(), BoxError>;
    fn set_revolutions(&mut self, count: f64) -> Result<(), BoxError>;
    fn go(&mut self) -> Result<(), BoxError>;
    fn halt(&mut self) -> Result<(), BoxError>;
    /// Release the pump from remote control.
    fn cancel(&mut self) -> Result<(), BoxError>;
}

impl<P: Pump + ?Sized> Pump for Box<P> {
    fn set_motor_speed(&mut self, percent: f64) -> Result<(), BoxError> {
        (**self).set_motor_speed(percent)
    }
    fn set_revolutions(&mut self, count: f64) -> Result<(), BoxError> {
        (**self).set_revolutions(count)
    }
    fn go(&mut self) -> Result<(), BoxError> {
        (**self).go()
    }
    fn halt(&mut self) -> Result<(), BoxError> {
        (**self).halt()
    }
    fn cancel(&mut self) -> Result<(), BoxError> {
        (**self).cancel()
    }
}

/// Pre-rendered audio prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cue {
    Welcome,
    ConnectBarcode,
    ConnectPump,
    ConnectScale,
    WaitingBarcode,
    WaitingWeight,
    DatasetDownloaded,
    DatasetDownloadFailed,
    DatasetParseFailed,
    CalibrationDownloadFailed,
    LogUploaded,
    LogUploadFailed,
}

impl Cue {
    pub const ALL: [Cue; 12] = [
        Cue::Welcome,
        Cue::ConnectBarcode,
        Cue::ConnectPump,
        Cue::ConnectScale,
        Cue::WaitingBarcode,
        Cue::WaitingWeight,
        Cue::DatasetDownloaded,
        Cue::DatasetDownloadFailed,
        Cue::DatasetParseFailed,
        Cue::CalibrationDownloadFailed,
        Cue::LogUploaded,
        Cue::LogUploadFailed,
    ];

    /// Sound file name inside the sounds directory.
    pub fn file_name(self) -> &'static str {
        match self {
            Cue::Welcome => "welcome-message.riff",
            Cue::ConnectBarcode => "connect-barcode-scanner.riff",
            Cue::ConnectPump => "connect-water-pump.riff",
            Cue::ConnectScale => "connect-plant-scale.riff",
            Cue::WaitingBarcode => "waiting-barcode.riff",
            Cue::WaitingWeight => "waiting-weight.riff",
            Cue::DatasetDownloaded => "download-experiment-data.riff",
            Cue::DatasetDownloadFailed => "no-download-experiment-data.riff",
            Cue::DatasetParseFailed => "error-parsing-experiment-data.riff",
            Cue::CalibrationDownloadFailed => "no-download-pump-data.riff",
            Cue::LogUploaded => "upload-watering.riff",
            Cue::LogUploadFailed => "no-uploading-watering.riff",
        }
    }

    /// Text rendered into the sound file by `waterer setup`.
    pub fn text(self) -> &'static str {
        match self {
            Cue::Welcome => "Welcome to the plant weight water control system.",
            Cue::ConnectBarcode => "Connect barcode scanner.",
            Cue::ConnectPump => "Connect water pump.",
            Cue::ConnectScale => "Connect plant scale.",
            Cue::WaitingBarcode => "Scan the plant barcode.",
            Cue::WaitingWeight => "Place the plant on the scale.",
            Cue::DatasetDownloaded => "Downloaded the experiment data.",
            Cue::DatasetDownloadFailed => "Could not download the experiment data.",
            Cue::DatasetParseFailed => "Error reading the experiment data file.",
            Cue::CalibrationDownloadFailed => "Could not download the pump data.",
            Cue::LogUploaded => "Uploaded the watering records.",
            Cue::LogUploadFailed => "Could not upload the watering records.",
        }
    }
}

/// Audible operator feedback. Best-effort: implementations log their own failures.
pub trait Announcer {
    fn play(&self, cue: Cue);
    fn say(&self, text: &str);
}

impl<A: Announcer + ?Sized> Announcer for Box<A> {
    fn play(&self, cue: Cue) {
        (**self).play(cue);
    }
    fn say(&self, text: &str) {
        (**self).say(text);
    }
}
