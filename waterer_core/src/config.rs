//! Runtime configuration of the watering controller.
//!
//! Separate from the TOML-deserialized config in `waterer_config`; see
//! `conversions` for the bridge.

use std::time::Duration;

use waterer_traits::DeviceKind;

use crate::retry::RetryPolicy;

#[derive(Debug, Clone, PartialEq)]
pub struct PollingCfg {
    pub barcode: Duration,
    pub pump: Duration,
    pub scale: Duration,
    /// Delay between scale polls while no reading is available.
    pub weight: Duration,
}

impl Default for PollingCfg {
    fn default() -> Self {
        Self {
            barcode: Duration::from_secs(10),
            pump: Duration::from_secs(10),
            scale: Duration::from_secs(10),
            weight: Duration::from_secs(10),
        }
    }
}

impl PollingCfg {
    /// Presence poll interval for a missing device.
    pub fn for_device(&self, kind: DeviceKind) -> Duration {
        match kind {
            DeviceKind::Barcode => self.barcode,
            DeviceKind::Pump => self.pump,
            DeviceKind::Scale => self.scale,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ControllerCfg {
    pub polling: PollingCfg,
    /// Retry policy for malformed scale readings.
    pub scale_retry: RetryPolicy,
    /// Stop cleanly after this many dosing decisions.
    pub max_decisions: Option<u64>,
}
