//! Payload Validator for Plausibility Checking

use crate::error::ValidationError;
use crate::event::VitalsEvent;
use crate::metric::Metric;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Validation configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Per-metric overrides of the built-in plausible ranges
    #[serde(default)]
    pub range_overrides: HashMap<Metric, (f64, f64)>,
}

/// Validator for incoming vitals payloads.
///
/// Rejects readings a sensor cannot physically produce so that only
/// patient data reaches the event bus. Clinical judgement (is the value
/// dangerous?) is the evaluator's job, not this one's.
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Create a new validator with given config
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Effective plausible range for a metric
    pub fn range_for(&self, metric: Metric) -> (f64, f64) {
        self.config
            .range_overrides
            .get(&metric)
            .copied()
            .unwrap_or_else(|| metric.plausible_range())
    }

    /// Validate a single reading against its plausible range
    pub fn validate_reading(&self, metric: Metric, value: f64) -> Result<(), ValidationError> {
        let (min, max) = self.range_for(metric);
        if !value.is_finite() || value < min || value > max {
            Err(ValidationError::ImplausibleValue {
                metric,
                value,
                min,
                max,
            })
        } else {
            Ok(())
        }
    }

    /// Validate a whole event before it is published.
    ///
    /// Rules: at least one reading, blood pressure readings arrive in
    /// pairs, every reading within its plausible range.
    pub fn validate_event(&self, event: &VitalsEvent) -> Result<(), ValidationError> {
        if event.is_empty() {
            return Err(ValidationError::EmptyPayload);
        }

        let has_systolic = event.readings.contains_key(&Metric::SystolicBp);
        let has_diastolic = event.readings.contains_key(&Metric::DiastolicBp);
        if has_systolic != has_diastolic {
            return Err(ValidationError::UnpairedBloodPressure);
        }

        for (&metric, &value) in &event.readings {
            self.validate_reading(metric, value)?;
        }

        Ok(())
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}
