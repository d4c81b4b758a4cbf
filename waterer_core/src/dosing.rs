//! Dosing decision: how many pump revolutions bring a plant to its target.

/// Round to two decimal places, the precision revolutions are logged with.
#[inline]
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DoseDecision {
    /// Plant is below target.
    Water { delta_g: f64, revolutions: f64 },
    /// At or above target ("excess water"); the pump stays idle.
    Skip { excess_g: f64 },
}

impl DoseDecision {
    pub fn is_water(&self) -> bool {
        matches!(self, DoseDecision::Water { .. })
    }
}

/// Decide the dose. Only a strictly positive deficit waters the plant.
///
/// `water_per_revolution` must be > 0 (guaranteed by `PumpCalibration`).
pub fn plan_dose(current_g: f64, desired_g: f64, water_per_revolution: f64) -> DoseDecision {
    let delta_g = desired_g - current_g;
    if delta_g > 0.0 {
        DoseDecision::Water {
            delta_g,
            revolutions: round2(delta_g / water_per_revolution),
        }
    } else {
        DoseDecision::Skip { excess_g: -delta_g }
    }
}
