use thiserror::Error;
use waterer_traits::DeviceKind;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum WaterError {
    #[error("{0} device not present")]
    DeviceNotPresent(DeviceKind),
    #[error("barcode decode error: {0}")]
    Decode(String),
    #[error("{0} device lost: {1}")]
    DeviceLost(DeviceKind, String),
    #[error("pump protocol error: {0}")]
    Protocol(String),
    #[error("malformed scale reading: {0}")]
    MalformedReading(String),
    #[error("no valid scale reading after {attempts} attempts")]
    ScaleRetriesExhausted { attempts: u32 },
    #[error("unknown plant identifier {0}")]
    UnknownPlant(String),
    #[error("dataset load failure: {0}")]
    DatasetLoad(String),
    #[error("invalid calibration: {0}")]
    InvalidCalibration(String),
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("io error: {0}")]
    Io(String),
}

impl WaterError {
    /// Errors the control loop cannot recover from locally.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            WaterError::Protocol(_) | WaterError::Hardware(_) | WaterError::Io(_)
        )
    }
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing devices")]
    MissingDevices,
    #[error("missing announcer")]
    MissingAnnouncer,
    #[error("missing watering log")]
    MissingLog,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
