//! Per-run state: the plant catalog and the calibration in effect.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::calibration::PumpCalibration;
use crate::error::WaterError;

pub use waterer_config::PlantRecord;

/// Plants keyed by identifier. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct PlantCatalog {
    plants: HashMap<String, PlantRecord>,
}

impl PlantCatalog {
    /// Build from records, rejecting duplicate identifiers.
    pub fn new(records: Vec<PlantRecord>) -> Result<Self, WaterError> {
        let mut plants = HashMap::with_capacity(records.len());
        for rec in records {
            let id = rec.id.clone();
            if plants.insert(id.clone(), rec).is_some() {
                return Err(WaterError::DatasetLoad(format!("duplicate plant id {id}")));
            }
        }
        Ok(Self { plants })
    }

    pub fn get(&self, id: &str) -> Option<&PlantRecord> {
        self.plants.get(id)
    }

    pub fn len(&self) -> usize {
        self.plants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plants.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    calibration: PumpCalibration,
    plants: PlantCatalog,
}

impl Session {
    pub fn new(calibration: PumpCalibration, plants: PlantCatalog) -> Self {
        Self {
            calibration,
            plants,
        }
    }

    pub fn calibration(&self) -> PumpCalibration {
        self.calibration
    }

    pub fn plants(&self) -> &PlantCatalog {
        &self.plants
    }

    /// Replace the calibration. Returns whether the values changed.
    pub fn apply_calibration(&mut self, calibration: PumpCalibration) -> bool {
        if calibration == self.calibration {
            return false;
        }
        info!(
            motor_speed = calibration.motor_speed(),
            water_per_revolution = calibration.water_per_revolution(),
            "calibration updated"
        );
        self.calibration = calibration;
        true
    }

    /// Validate raw values, then apply them.
    pub fn apply_calibration_values(
        &mut self,
        motor_speed: f64,
        water_per_revolution: f64,
    ) -> Result<bool, WaterError> {
        let c = PumpCalibration::new(motor_speed, water_per_revolution).inspect_err(|e| {
            warn!(error = %e, "calibration rejected");
        })?;
        Ok(self.apply_calibration(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plant(id: &str, w: f64) -> PlantRecord {
        PlantRecord {
            id: id.into(),
            target_weight_g: w,
            description: None,
        }
    }

    #[test]
    fn catalog_rejects_duplicates() {
        let err = PlantCatalog::new(vec![plant("7", 150.0), plant("7", 90.0)]).unwrap_err();
        assert!(matches!(err, WaterError::DatasetLoad(_)));
    }

    #[test]
    fn catalog_lookup() {
        let c = PlantCatalog::new(vec![plant("7", 150.0)]).unwrap();
        assert_eq!(c.get("7").map(|p| p.target_weight_g), Some(150.0));
        assert!(c.get("8").is_none());
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn apply_reports_changes_only() {
        let mut s = Session::default();
        assert!(!s.apply_calibration(PumpCalibration::default()));
        assert!(s.apply_calibration_values(80.0, 0.85).unwrap());
        assert!(!s.apply_calibration_values(80.0, 0.85).unwrap());
        assert_eq!(s.calibration().motor_speed(), 80.0);
    }

    #[test]
    fn invalid_values_leave_calibration_untouched() {
        let mut s = Session::default();
        assert!(s.apply_calibration_values(80.0, 0.0).is_err());
        assert_eq!(s.calibration(), PumpCalibration::default());
    }
}
