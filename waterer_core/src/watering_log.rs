//! Append-only watering log.
//!
//! One headerless CSV row per dosing decision:
//! `timestamp,plant_id,current,desired,watered,speed,revolutions,water_per_revolution`.
//! The last three columns are blank when the plant was not watered. Rows are
//! only ever appended.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, SecondsFormat};
use tracing::debug;

use crate::error::WaterError;

/// Pump settings used for a watering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoseRecord {
    pub motor_speed: f64,
    pub revolutions: f64,
    pub water_per_revolution: f64,
}

/// One dosing decision. `dose` is `None` when the plant was not watered.
#[derive(Debug, Clone, PartialEq)]
pub struct WateringEvent {
    pub timestamp: DateTime<Local>,
    pub plant_id: String,
    pub current_g: f64,
    pub desired_g: f64,
    pub dose: Option<DoseRecord>,
}

impl WateringEvent {
    pub fn watered(&self) -> bool {
        self.dose.is_some()
    }

    fn to_record(&self) -> [String; 8] {
        let (speed, revolutions, wpr) = match &self.dose {
            Some(d) => (
                d.motor_speed.to_string(),
                format!("{:.2}", d.revolutions),
                d.water_per_revolution.to_string(),
            ),
            None => (String::new(), String::new(), String::new()),
        };
        [
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, false),
            self.plant_id.clone(),
            self.current_g.to_string(),
            self.desired_g.to_string(),
            if self.watered() { "1" } else { "0" }.to_string(),
            speed,
            revolutions,
            wpr,
        ]
    }

    fn from_record(rec: &csv::StringRecord, line: usize) -> Result<Self, WaterError> {
        let bad = |what: &str| WaterError::Io(format!("watering log line {line}: invalid {what}"));
        if rec.len() != 8 {
            return Err(bad("column count"));
        }
        let num = |i: usize, what: &str| rec[i].parse::<f64>().map_err(|_| bad(what));

        let timestamp = DateTime::parse_from_rfc3339(&rec[0])
            .map_err(|_| bad("timestamp"))?
            .with_timezone(&Local);
        let dose = match &rec[4] {
            "1" => Some(DoseRecord {
                motor_speed: num(5, "speed")?,
                revolutions: num(6, "revolutions")?,
                water_per_revolution: num(7, "water per revolution")?,
            }),
            "0" if rec[5].is_empty() && rec[6].is_empty() && rec[7].is_empty() => None,
            _ => return Err(bad("watered flag")),
        };
        Ok(Self {
            timestamp,
            plant_id: rec[1].to_string(),
            current_g: num(2, "current weight")?,
            desired_g: num(3, "desired weight")?,
            dose,
        })
    }
}

#[derive(Debug, Clone)]
pub struct WateringLog {
    path: PathBuf,
}

impl WateringLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row and flush it to disk before returning.
    pub fn append(&self, event: &WateringEvent) -> Result<(), WaterError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| WaterError::Io(format!("open {:?}: {e}", self.path)))?;
        let mut w = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        w.write_record(event.to_record())
            .map_err(|e| WaterError::Io(format!("write {:?}: {e}", self.path)))?;
        let file = w
            .into_inner()
            .map_err(|e| WaterError::Io(format!("flush {:?}: {e}", self.path)))?;
        file.sync_data()
            .map_err(|e| WaterError::Io(format!("sync {:?}: {e}", self.path)))?;
        debug!(plant_id = %event.plant_id, watered = event.watered(), "watering recorded");
        Ok(())
    }

    /// Read every row back, in append order. A missing file is an empty log.
    pub fn read_all(&self) -> Result<Vec<WateringEvent>, WaterError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| WaterError::Io(format!("open {:?}: {e}", self.path)))?;
        rdr.records()
            .enumerate()
            .map(|(i, rec)| {
                let rec = rec.map_err(|e| WaterError::Io(format!("read {:?}: {e}", self.path)))?;
                WateringEvent::from_record(&rec, i + 1)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str, dose: Option<DoseRecord>) -> WateringEvent {
        WateringEvent {
            timestamp: Local::now(),
            plant_id: id.into(),
            current_g: 130.0,
            desired_g: 150.0,
            dose,
        }
    }

    #[test]
    fn skipped_row_has_blank_pump_columns() {
        let rec = event("7", None).to_record();
        assert_eq!(&rec[1..], ["7", "130", "150", "0", "", "", ""]);
    }

    #[test]
    fn watered_row_formats_revolutions_with_two_decimals() {
        let rec = event(
            "7",
            Some(DoseRecord {
                motor_speed: 70.0,
                revolutions: 23.529,
                water_per_revolution: 0.85,
            }),
        )
        .to_record();
        assert_eq!(&rec[4..], ["1", "70", "23.53", "0.85"]);
    }

    #[test]
    fn rejects_skipped_rows_with_pump_values() {
        let rec = csv::StringRecord::from(vec![
            "2026-01-01T10:00:00.000+00:00",
            "7",
            "130",
            "150",
            "0",
            "70",
            "",
            "",
        ]);
        assert!(WateringEvent::from_record(&rec, 1).is_err());
    }
}
