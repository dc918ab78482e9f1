//! Route Handlers

pub mod alerts;
pub mod anomalies;
pub mod thresholds;
pub mod vitals;
