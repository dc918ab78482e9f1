//! Metric Catalog

use serde::{Deserialize, Serialize};
use std::fmt;

/// Vital-sign metrics the pipeline understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    HeartRate,
    Spo2,
    RespiratoryRate,
    SystolicBp,
    DiastolicBp,
    Temperature,
    Glucose,
}

impl Metric {
    /// All known metrics, in catalog order
    pub const ALL: [Metric; 7] = [
        Metric::HeartRate,
        Metric::Spo2,
        Metric::RespiratoryRate,
        Metric::SystolicBp,
        Metric::DiastolicBp,
        Metric::Temperature,
        Metric::Glucose,
    ];

    /// Snake-case wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::HeartRate => "heart_rate",
            Metric::Spo2 => "spo2",
            Metric::RespiratoryRate => "respiratory_rate",
            Metric::SystolicBp => "systolic_bp",
            Metric::DiastolicBp => "diastolic_bp",
            Metric::Temperature => "temperature",
            Metric::Glucose => "glucose",
        }
    }

    /// Physiologically plausible range for this metric.
    ///
    /// Readings outside this range are sensor noise, not patient data,
    /// and are rejected at the ingestion boundary.
    pub fn plausible_range(&self) -> (f64, f64) {
        match self {
            Metric::HeartRate => (1.0, 299.0),
            Metric::Spo2 => (50.0, 100.0),
            Metric::RespiratoryRate => (5.0, 60.0),
            Metric::SystolicBp => (70.0, 250.0),
            Metric::DiastolicBp => (40.0, 150.0),
            Metric::Temperature => (35.0, 42.0),
            Metric::Glucose => (20.0, 600.0),
        }
    }

    /// Unit label for human-readable descriptions
    pub fn unit(&self) -> &'static str {
        match self {
            Metric::HeartRate => "bpm",
            Metric::Spo2 => "%",
            Metric::RespiratoryRate => "breaths/min",
            Metric::SystolicBp | Metric::DiastolicBp => "mmHg",
            Metric::Temperature => "°C",
            Metric::Glucose => "mg/dL",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
