//! Threshold Store
//!
//! Per-patient, per-metric min/max bounds read by the evaluator and
//! written through the administrative API. Replacing a threshold is
//! destructive to the old bounds; no history is retained.

mod store;

pub use store::{Threshold, ThresholdStore, Violation};
