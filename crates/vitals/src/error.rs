//! Validation Error Types

use crate::metric::Metric;
use thiserror::Error;

/// Errors during payload and threshold validation
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    /// Value outside the physiologically plausible range
    #[error("{metric} value {value} is outside the plausible range [{min}, {max}]")]
    ImplausibleValue {
        metric: Metric,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Event carried no readings at all
    #[error("payload must contain at least one vital sign reading")]
    EmptyPayload,

    /// Systolic and diastolic blood pressure must arrive together
    #[error("systolic and diastolic blood pressure must be provided together")]
    UnpairedBloodPressure,

    /// Threshold bounds crossed over
    #[error("min_value {min} is greater than max_value {max}")]
    InvertedBounds { min: f64, max: f64 },

    /// Threshold with neither bound configured
    #[error("threshold must define min_value, max_value, or both")]
    MissingBounds,

    /// Missing required field
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Invalid field content
    #[error("invalid field: {0}")]
    InvalidField(String),
}
