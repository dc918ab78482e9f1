//! Vital-Sign Domain Types
//!
//! Provides the metric catalog, ingestion event payloads, and
//! physiological plausibility validation.

mod error;
mod event;
mod metric;
mod validator;

pub use error::ValidationError;
pub use event::VitalsEvent;
pub use metric::Metric;
pub use validator::{ValidationConfig, Validator};
