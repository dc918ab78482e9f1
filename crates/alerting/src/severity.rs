//! Severity Policy

use serde::Deserialize;
use storage::Severity;
use thresholds::{Threshold, Violation};

/// Maps how far a value broke its bound onto a severity.
///
/// Any violation is at least `warning`. The escalation cutoff is policy,
/// not a fixed constant: overshoot is measured against the threshold's
/// allowed deviation and escalates to `critical` at `critical_ratio`
/// times that deviation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SeverityPolicy {
    /// Overshoot multiple of the allowed deviation at which a violation
    /// becomes critical
    pub critical_ratio: f64,
    /// Fraction of the bound's magnitude used as the allowed deviation
    /// when only one bound is configured
    pub single_bound_margin: f64,
}

impl Default for SeverityPolicy {
    fn default() -> Self {
        Self {
            critical_ratio: 2.0,
            single_bound_margin: 0.25,
        }
    }
}

impl SeverityPolicy {
    /// Severity of a violation against its threshold
    pub fn classify(&self, threshold: &Threshold, violation: &Violation) -> Severity {
        let excess = match violation {
            Violation::BelowMin { excess, .. } | Violation::AboveMax { excess, .. } => *excess,
        };
        if excess >= self.critical_ratio * self.allowed_deviation(threshold) {
            Severity::Critical
        } else {
            Severity::Warning
        }
    }

    /// Allowed deviation: half the band width when both bounds exist,
    /// else a configured fraction of the single bound's magnitude.
    /// Floored at 1.0 so a zero-width band cannot make every violation
    /// critical.
    fn allowed_deviation(&self, threshold: &Threshold) -> f64 {
        let deviation = match threshold.band_width() {
            Some(width) => width / 2.0,
            None => {
                let bound = threshold
                    .max_value
                    .or(threshold.min_value)
                    .unwrap_or_default();
                bound.abs() * self.single_bound_margin
            }
        };
        deviation.max(1.0)
    }
}
