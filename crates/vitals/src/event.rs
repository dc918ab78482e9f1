//! Vitals Ingestion Event

use crate::metric::Metric;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A single published batch of readings for one patient.
///
/// Immutable once published. The timestamp is authoritative for anomaly
/// reporting even when events arrive out of order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitalsEvent {
    pub patient_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub readings: HashMap<Metric, f64>,
}

impl VitalsEvent {
    /// Create an event with no readings yet
    pub fn new(patient_id: Uuid, timestamp: DateTime<Utc>) -> Self {
        Self {
            patient_id,
            timestamp,
            readings: HashMap::new(),
        }
    }

    /// Add a reading, replacing any prior value for the metric
    pub fn with_reading(mut self, metric: Metric, value: f64) -> Self {
        self.readings.insert(metric, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Stable key identifying this (patient, metric, timestamp) observation.
    ///
    /// Used by the anomaly log to collapse redeliveries of the same event.
    pub fn observation_key(&self, metric: Metric) -> String {
        format!(
            "{}:{}:{}",
            self.patient_id,
            metric,
            self.timestamp.to_rfc3339()
        )
    }
}
