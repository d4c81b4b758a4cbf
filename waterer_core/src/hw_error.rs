//! Maps `Box<dyn Error>` from trait boundaries to typed `WaterError`.
//!
//! The traits in `waterer_traits` use `Box<dyn Error + Send + Sync>` so any
//! driver can plug in; this module converts those back to our typed error enum,
//! with an optional feature-gated path for `waterer_hardware::HwError`.

use waterer_traits::DeviceKind;

use crate::error::WaterError;

/// Map a trait-boundary error raised by `device` to a typed `WaterError`.
///
/// Errors that already are `WaterError` pass through. Known hardware error
/// types are downcast next, then string heuristics apply.
pub fn map_hw_error(device: DeviceKind, e: &(dyn std::error::Error + 'static)) -> WaterError {
    if let Some(we) = e.downcast_ref::<WaterError>() {
        return we.clone();
    }

    // Feature-gated: try to downcast to HwError for precise mapping
    #[cfg(feature = "hardware-errors")]
    {
        use waterer_hardware::error::{DecodeError, HwError, ScaleError};

        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Decode(DecodeError::UnknownKeycode(_)) => {
                    WaterError::Decode(hw.to_string())
                }
                HwError::Decode(_) => WaterError::DeviceLost(device, hw.to_string()),
                HwError::Protocol(p) => WaterError::Protocol(p.to_string()),
                HwError::Scale(ScaleError::MalformedReading(line)) => {
                    WaterError::MalformedReading(line.clone())
                }
                HwError::Scale(ScaleError::Io(io)) => WaterError::DeviceLost(device, io.to_string()),
                HwError::WaitTimeout => WaterError::DeviceNotPresent(device),
                other => WaterError::Hardware(other.to_string()),
            };
        }
    }

    // Fallback: string-based detection
    let s = e.to_string();
    let lower = s.to_lowercase();
    match device {
        DeviceKind::Pump => WaterError::Protocol(s),
        _ if lower.contains("malformed") => WaterError::MalformedReading(s),
        _ => WaterError::DeviceLost(device, s),
    }
}
