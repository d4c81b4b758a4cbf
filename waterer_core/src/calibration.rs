use crate::error::WaterError;

/// Pump calibration in effect for a session.
///
/// Fields are private so every instance has passed validation: the motor
/// speed is a percentage in `[0, 100]` and the water per revolution is
/// strictly positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PumpCalibration {
    motor_speed: f64,
    water_per_revolution: f64,
}

impl PumpCalibration {
    pub fn new(motor_speed: f64, water_per_revolution: f64) -> Result<Self, WaterError> {
        if !(motor_speed.is_finite() && (0.0..=100.0).contains(&motor_speed)) {
            return Err(WaterError::InvalidCalibration(format!(
                "motor speed {motor_speed} outside 0..=100"
            )));
        }
        if !(water_per_revolution.is_finite() && water_per_revolution > 0.0) {
            return Err(WaterError::InvalidCalibration(format!(
                "water per revolution {water_per_revolution} must be > 0"
            )));
        }
        Ok(Self {
            motor_speed,
            water_per_revolution,
        })
    }

    pub fn motor_speed(&self) -> f64 {
        self.motor_speed
    }

    /// Grams of water dispensed per pump shaft revolution.
    pub fn water_per_revolution(&self) -> f64 {
        self.water_per_revolution
    }

    /// Operator announcement for newly applied values.
    pub fn announcement(&self) -> String {
        format!(
            "Set the water pump parameters. The motor speed is {}. The water weight per one revolution is {} grams",
            self.motor_speed, self.water_per_revolution
        )
    }
}

impl Default for PumpCalibration {
    fn default() -> Self {
        Self {
            motor_speed: 70.0,
            water_per_revolution: 0.85,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_values() {
        assert!(PumpCalibration::new(101.0, 0.85).is_err());
        assert!(PumpCalibration::new(-1.0, 0.85).is_err());
        assert!(PumpCalibration::new(70.0, 0.0).is_err());
        assert!(PumpCalibration::new(70.0, f64::NAN).is_err());
        assert!(PumpCalibration::new(0.0, 0.01).is_ok());
    }

    #[test]
    fn announcement_names_both_values() {
        let c = PumpCalibration::new(80.0, 0.9).unwrap();
        assert_eq!(
            c.announcement(),
            "Set the water pump parameters. The motor speed is 80. The water weight per one revolution is 0.9 grams"
        );
    }
}
