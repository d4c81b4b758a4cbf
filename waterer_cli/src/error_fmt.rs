//! Human-readable error descriptions and structured JSON error formatting.

use waterer_core::error::{BuildError, WaterError};
use waterer_hardware::error::{HwError, ProtocolError};

fn water_error(err: &eyre::Report) -> Option<&WaterError> {
    err.chain().find_map(|e| e.downcast_ref::<WaterError>())
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingDevices => {
                "What happened: No devices were wired into the watering controller.\nLikely causes: The station could not be assembled.\nHow to fix: Check the [devices] section and rebuild with or without the `hardware` feature as needed.".to_string()
            }
            BuildError::MissingAnnouncer => {
                "What happened: No announcer was provided to the watering controller.\nLikely causes: Audio setup failed before the controller was built.\nHow to fix: Check the [audio] section, or set enabled = false to only log prompts.".to_string()
            }
            BuildError::MissingLog => {
                "What happened: No watering log was configured.\nLikely causes: [paths] could not be resolved.\nHow to fix: Set paths.data_dir and paths.watering_log in the config.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML or on the command line.\nHow to fix: Edit the config file (or the flag), then rerun."
            ),
        };
    }

    if let Some(we) = water_error(err) {
        return match we {
            WaterError::Protocol(msg) => format!(
                "What happened: The pump rejected or garbled a command ({msg}). The pump was halted.\nLikely causes: Wrong pump address, wrong serial settings, or a loose cable.\nHow to fix: Check pump.address and the cable, then run `waterer probe-pump`."
            ),
            WaterError::DeviceNotPresent(kind) => format!(
                "What happened: The {kind} is not connected.\nLikely causes: Unplugged device or a wrong device path.\nHow to fix: Connect it and check devices.{kind} in the config."
            ),
            WaterError::DeviceLost(kind, msg) => format!(
                "What happened: The {kind} stopped responding ({msg}).\nLikely causes: USB disconnect or power loss.\nHow to fix: Reconnect the {kind} and restart the station."
            ),
            WaterError::Io(msg) => format!(
                "What happened: A data file could not be written ({msg}).\nLikely causes: Full disk, read-only mount, or missing permissions on paths.data_dir.\nHow to fix: Free space or fix permissions, then restart."
            ),
            WaterError::DatasetLoad(msg) => format!(
                "What happened: The plant dataset could not be used ({msg}).\nLikely causes: Missing id/weight columns, duplicate ids, or bad numbers.\nHow to fix: Fix the CSV and run `waterer check-config`."
            ),
            WaterError::InvalidCalibration(msg) => format!(
                "What happened: Invalid pump calibration ({msg}).\nLikely causes: motor_speed outside 0..=100 or a non-positive water_per_1_revolution.\nHow to fix: Correct the pump data file or the [calibration] section."
            ),
            WaterError::ScaleRetriesExhausted { attempts } => format!(
                "What happened: The scale sent {attempts} unreadable values in a row.\nLikely causes: Wrong line ending or a noisy serial line.\nHow to fix: Check devices.scale_line_ending and the scale cable."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    if let Some(pe) = err.chain().find_map(|e| e.downcast_ref::<ProtocolError>()) {
        return format!(
            "What happened: Pump exchange failed ({pe}).\nLikely causes: Pump powered off, wrong port, or wrong address.\nHow to fix: Check devices.pump and pump.address, then retry."
        );
    }
    if let Some(HwError::WaitTimeout) = err.chain().find_map(|e| e.downcast_ref::<HwError>()) {
        return "What happened: A device did not appear in time.\nLikely causes: Device unplugged or a wrong path in [devices].\nHow to fix: Connect the device and check its path.".to_string();
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("read config") || lower.contains("no such file") {
        return format!(
            "What happened: {msg}.\nLikely causes: The config file does not exist yet.\nHow to fix: Run `waterer setup --token <TOKEN>` or pass --config <FILE>."
        );
    }

    if lower.contains("parse config") || lower.contains("invalid configuration") {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: A typo or an out-of-range value in the TOML.\nHow to fix: Edit the TOML config and run `waterer check-config`."
        );
    }

    if lower.contains("hardware") && lower.contains("feature") {
        return format!(
            "What happened: {msg}.\nLikely causes: This binary was built for simulation.\nHow to fix: Rebuild with `--features hardware`."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

pub fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "InvalidSetup";
    }
    match water_error(err) {
        Some(WaterError::Protocol(_)) => "Protocol",
        Some(WaterError::DeviceNotPresent(_) | WaterError::DeviceLost(..)) => "Device",
        Some(WaterError::Hardware(_)) => "Hardware",
        Some(WaterError::Io(_)) => "Io",
        Some(WaterError::DatasetLoad(_) | WaterError::InvalidCalibration(_)) => "Data",
        Some(_) => "Watering",
        None => "Error",
    }
}

/// Stable exit codes: 3 pump protocol, 4 device, 5 log I/O, 6 data files, 1 anything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match reason_name(err) {
        "Protocol" => 3,
        "Device" | "Hardware" => 4,
        "Io" => 5,
        "Data" => 6,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
