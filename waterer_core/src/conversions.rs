//! `From` implementations bridging `waterer_config` types to `waterer_core` types.

use std::time::Duration;

use crate::calibration::PumpCalibration;
use crate::config::{ControllerCfg, PollingCfg};
use crate::error::WaterError;
use crate::retry::RetryPolicy;

// ── PollingCfg ───────────────────────────────────────────────────────────────

impl From<&waterer_config::Polling> for PollingCfg {
    fn from(c: &waterer_config::Polling) -> Self {
        Self {
            barcode: Duration::from_millis(c.barcode_ms),
            pump: Duration::from_millis(c.pump_ms),
            scale: Duration::from_millis(c.scale_ms),
            weight: Duration::from_millis(c.weight_ms),
        }
    }
}

// ── RetryPolicy ──────────────────────────────────────────────────────────────

impl From<&waterer_config::Retry> for RetryPolicy {
    fn from(c: &waterer_config::Retry) -> Self {
        let base = Duration::from_millis(c.scale_backoff_ms);
        Self {
            max_attempts: c.scale_max_attempts,
            base_delay: base,
            factor: c.scale_backoff_factor,
            max_delay: base.saturating_mul(c.scale_max_attempts.max(1)).max(base),
        }
    }
}

// ── ControllerCfg ────────────────────────────────────────────────────────────

impl From<&waterer_config::Config> for ControllerCfg {
    fn from(c: &waterer_config::Config) -> Self {
        Self {
            polling: PollingCfg::from(&c.polling),
            scale_retry: RetryPolicy::from(&c.retry),
            max_decisions: None,
        }
    }
}

// ── PumpCalibration ──────────────────────────────────────────────────────────

impl TryFrom<&waterer_config::PumpData> for PumpCalibration {
    type Error = WaterError;

    fn try_from(d: &waterer_config::PumpData) -> Result<Self, Self::Error> {
        PumpCalibration::new(d.motor_speed, d.water_per_1_revolution)
    }
}
