//! Threshold Store Implementation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;
use vitals::{Metric, ValidationError};

/// Configured alerting bounds for one (patient, metric) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Threshold {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub metric: Metric,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Which bound a value broke, and by how much
#[derive(Debug, Clone, Copy)]
pub enum Violation {
    BelowMin { min: f64, excess: f64 },
    AboveMax { max: f64, excess: f64 },
}

impl Threshold {
    /// Check a value against the bounds
    pub fn check(&self, value: f64) -> Option<Violation> {
        if let Some(min) = self.min_value {
            if value < min {
                return Some(Violation::BelowMin {
                    min,
                    excess: min - value,
                });
            }
        }
        if let Some(max) = self.max_value {
            if value > max {
                return Some(Violation::AboveMax {
                    max,
                    excess: value - max,
                });
            }
        }
        None
    }

    /// Width of the allowed band, when both bounds are configured
    pub fn band_width(&self) -> Option<f64> {
        match (self.min_value, self.max_value) {
            (Some(min), Some(max)) => Some(max - min),
            _ => None,
        }
    }
}

/// Store of active thresholds, at most one per (patient, metric)
pub struct ThresholdStore {
    entries: Mutex<HashMap<(Uuid, Metric), Threshold>>,
}

impl ThresholdStore {
    pub fn new() -> Self {
        info!("Creating threshold store");
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Create or replace the active threshold for (patient, metric).
    ///
    /// The id survives replacement so anomaly records keep pointing at
    /// the same logical rule. Rejects inverted bounds and thresholds
    /// with neither bound set.
    pub fn set(
        &self,
        patient_id: Uuid,
        metric: Metric,
        min_value: Option<f64>,
        max_value: Option<f64>,
    ) -> Result<Threshold, ValidationError> {
        match (min_value, max_value) {
            (None, None) => return Err(ValidationError::MissingBounds),
            (Some(min), Some(max)) if min > max => {
                return Err(ValidationError::InvertedBounds { min, max })
            }
            _ => {}
        }

        let now = Utc::now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        let threshold = match entries.get(&(patient_id, metric)) {
            Some(existing) => {
                debug!("Replacing threshold {} for {} {}", existing.id, patient_id, metric);
                Threshold {
                    id: existing.id,
                    patient_id,
                    metric,
                    min_value,
                    max_value,
                    created_at: existing.created_at,
                    updated_at: now,
                }
            }
            None => Threshold {
                id: Uuid::new_v4(),
                patient_id,
                metric,
                min_value,
                max_value,
                created_at: now,
                updated_at: now,
            },
        };

        entries.insert((patient_id, metric), threshold.clone());
        Ok(threshold)
    }

    /// Active threshold for (patient, metric), if one is configured
    pub fn get(&self, patient_id: Uuid, metric: Metric) -> Option<Threshold> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(&(patient_id, metric)).cloned()
    }

    /// All thresholds configured for a patient
    pub fn list(&self, patient_id: Uuid) -> Vec<Threshold> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut rows: Vec<_> = entries
            .values()
            .filter(|t| t.patient_id == patient_id)
            .cloned()
            .collect();
        rows.sort_by_key(|t| t.metric.as_str());
        rows
    }

    /// Total threshold count
    pub fn count(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }
}

impl Default for ThresholdStore {
    fn default() -> Self {
        Self::new()
    }
}
