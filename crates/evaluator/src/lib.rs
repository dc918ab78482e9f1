//! Evaluator
//!
//! Consumes vitals events from the bus, compares every reading against
//! the patient's configured thresholds, appends anomalies to the log,
//! and raises an alert for each fresh violation.

mod evaluator;

pub use evaluator::{Evaluator, EvaluatorError};
