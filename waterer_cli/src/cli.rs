//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

pub fn json_mode() -> bool {
    JSON_MODE.get().copied().unwrap_or(false)
}

#[derive(Parser, Debug)]
#[command(name = "waterer", version, about = "Weight-controlled plant watering station")]
pub struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE", default_value = "etc/waterer.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); defaults to the config, then info
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the watering loop until interrupted
    Run {
        /// Stop cleanly after this many dosing decisions
        #[arg(long, value_name = "N")]
        max_scans: Option<u64>,
        /// Skip the startup download/upload
        #[arg(long, action = ArgAction::SetTrue)]
        no_sync: bool,
    },
    /// Write the config file and render the prompt sounds
    Setup {
        /// Access token for the remote store
        #[arg(long)]
        token: String,
        /// Do not render sound files
        #[arg(long, action = ArgAction::SetTrue)]
        no_sounds: bool,
    },
    /// Send ENQ and Identify to the pump and print the replies
    ProbePump {
        /// Pump address for Identify (99 = every pump)
        #[arg(long, default_value_t = 99)]
        address: u8,
    },
    /// Load and validate the config, plant dataset and pump calibration
    CheckConfig,
}
