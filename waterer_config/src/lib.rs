#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and data-feed parsing for the watering station.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - `PumpData` is the calibration payload (motor speed, water per revolution).
//! - The plant dataset loader tries several CSV dialects in a fixed order,
//!   see [`plants`].
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod plants;

pub use plants::{Dialect, PlantRecord, load_plants, parse_plants};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    #[default]
    Lf,
    Cr,
}

impl LineEnding {
    pub fn byte(self) -> u8 {
        match self {
            LineEnding::Lf => b'\n',
            LineEnding::Cr => b'\r',
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Devices {
    /// hidraw node of the barcode scanner
    pub barcode: PathBuf,
    /// Serial port of the pump controller
    pub pump: PathBuf,
    /// Serial port of the scale
    pub scale: PathBuf,
    /// First byte of each HID report holding key data
    pub hid_first_byte: usize,
    pub scale_line_ending: LineEnding,
}

impl Default for Devices {
    fn default() -> Self {
        Self {
            barcode: PathBuf::from("/dev/hidraw0"),
            pump: PathBuf::from("/dev/ttyUSB0"),
            scale: PathBuf::from("/dev/ttyUSB1"),
            hid_first_byte: 0,
            scale_line_ending: LineEnding::Lf,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PumpCfg {
    /// Two-digit bus address (0..=98; 99 is broadcast)
    pub address: u8,
    /// Quiet time that ends a response frame (ms)
    pub response_timeout_ms: u64,
}

impl Default for PumpCfg {
    fn default() -> Self {
        Self {
            address: 1,
            response_timeout_ms: 500,
        }
    }
}

/// Polling intervals (ms).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Polling {
    pub barcode_ms: u64,
    pub pump_ms: u64,
    pub scale_ms: u64,
    /// Delay between scale polls while no reading is available
    pub weight_ms: u64,
}

impl Default for Polling {
    fn default() -> Self {
        Self {
            barcode_ms: 10_000,
            pump_ms: 10_000,
            scale_ms: 10_000,
            weight_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Retry {
    /// Malformed scale lines tolerated per scan before giving up
    pub scale_max_attempts: u32,
    pub scale_backoff_ms: u64,
    /// Backoff multiplier applied after each failed attempt (1.0 = fixed)
    pub scale_backoff_factor: f64,
}

impl Default for Retry {
    fn default() -> Self {
        Self {
            scale_max_attempts: 5,
            scale_backoff_ms: 1_000,
            scale_backoff_factor: 2.0,
        }
    }
}

/// File locations. Relative names resolve against `data_dir`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DataPaths {
    pub data_dir: PathBuf,
    pub plants: PathBuf,
    pub watering_log: PathBuf,
    pub pump_data: PathBuf,
    pub sounds_dir: Option<PathBuf>,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/home/pi/water-weight-control"),
            plants: PathBuf::from("experiment-data.csv"),
            watering_log: PathBuf::from("watering.csv"),
            pump_data: PathBuf::from("pump-data.txt"),
            sounds_dir: None,
        }
    }
}

impl DataPaths {
    pub fn resolve(&self, p: &Path) -> PathBuf {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.data_dir.join(p)
        }
    }

    pub fn plants_path(&self) -> PathBuf {
        self.resolve(&self.plants)
    }

    pub fn watering_log_path(&self) -> PathBuf {
        self.resolve(&self.watering_log)
    }

    pub fn pump_data_path(&self) -> PathBuf {
        self.resolve(&self.pump_data)
    }

    pub fn sounds_path(&self) -> PathBuf {
        self.sounds_dir
            .as_deref()
            .map_or_else(|| self.data_dir.clone(), |p| self.resolve(p))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Audio {
    /// When false, cues and speech are only logged
    pub enabled: bool,
    pub player: PathBuf,
    pub player_args: Vec<String>,
    pub synthesizer: PathBuf,
    pub voice: String,
}

impl Default for Audio {
    fn default() -> Self {
        Self {
            enabled: true,
            player: PathBuf::from("/usr/bin/omxplayer"),
            player_args: vec!["--no-osd".into(), "--no-keys".into()],
            synthesizer: PathBuf::from("/usr/bin/flite"),
            voice: "slt".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Sync {
    /// Access token of the cloud folder the data feeds come from
    pub token: Option<String>,
    /// Locally mounted mirror of that folder; sync is skipped when unset
    pub remote_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // operational log path
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// Calibration payload: pump speed and grams of water per shaft revolution.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct PumpData {
    /// Motor speed in percent of full scale
    pub motor_speed: f64,
    #[serde(alias = "water_per_revolution")]
    pub water_per_1_revolution: f64,
}

impl Default for PumpData {
    fn default() -> Self {
        Self {
            motor_speed: 70.0,
            water_per_1_revolution: 0.85,
        }
    }
}

impl PumpData {
    pub fn validate(&self) -> eyre::Result<()> {
        if !(self.motor_speed.is_finite() && (0.0..=100.0).contains(&self.motor_speed)) {
            eyre::bail!("motor_speed must be in [0, 100], got {}", self.motor_speed);
        }
        if !(self.water_per_1_revolution.is_finite() && self.water_per_1_revolution > 0.0) {
            eyre::bail!(
                "water_per_1_revolution must be > 0, got {}",
                self.water_per_1_revolution
            );
        }
        Ok(())
    }
}

/// Parse and validate a calibration payload.
pub fn parse_pump_data(s: &str) -> eyre::Result<PumpData> {
    let data: PumpData =
        toml::from_str(s).map_err(|e| eyre::eyre!("invalid pump data: {e}"))?;
    data.validate()?;
    Ok(data)
}

pub fn load_pump_data(path: &Path) -> eyre::Result<PumpData> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read pump data {:?}: {}", path, e))?;
    parse_pump_data(&text)
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub devices: Devices,
    pub pump: PumpCfg,
    pub polling: Polling,
    pub retry: Retry,
    pub paths: DataPaths,
    pub audio: Audio,
    pub sync: Sync,
    pub logging: Logging,
    /// Calibration in effect until a pump data payload is loaded
    pub calibration: PumpData,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

pub fn load_config(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e))?;
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    pub fn to_toml_string(&self) -> eyre::Result<String> {
        toml::to_string_pretty(self).map_err(|e| eyre::eyre!("serialize config: {e}"))
    }

    pub fn validate(&self) -> eyre::Result<()> {
        // Pump
        if self.pump.address >= 99 {
            eyre::bail!("pump.address must be in 0..=98 (99 is broadcast)");
        }
        if self.pump.response_timeout_ms == 0 {
            eyre::bail!("pump.response_timeout_ms must be >= 1");
        }

        // Devices
        if self.devices.hid_first_byte >= 8 {
            eyre::bail!("devices.hid_first_byte must be in 0..8");
        }

        // Polling
        for (name, ms) in [
            ("polling.barcode_ms", self.polling.barcode_ms),
            ("polling.pump_ms", self.polling.pump_ms),
            ("polling.scale_ms", self.polling.scale_ms),
            ("polling.weight_ms", self.polling.weight_ms),
        ] {
            if ms > 60 * 60 * 1000 {
                eyre::bail!("{name} is unreasonably large (>1h)");
            }
        }

        // Retry
        if self.retry.scale_max_attempts == 0 {
            eyre::bail!("retry.scale_max_attempts must be >= 1");
        }
        if !(self.retry.scale_backoff_factor.is_finite() && self.retry.scale_backoff_factor >= 1.0)
        {
            eyre::bail!("retry.scale_backoff_factor must be >= 1.0");
        }

        // Logging
        if let Some(rotation) = self.logging.rotation.as_deref()
            && !matches!(rotation, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        // Calibration
        self.calibration
            .validate()
            .map_err(|e| eyre::eyre!("calibration: {e}"))?;

        Ok(())
    }
}
