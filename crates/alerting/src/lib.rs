//! Alerting System
//!
//! Owns the Alert entity lifecycle: creation from anomalies or direct
//! sends, hand-off to the notification dispatcher, acknowledgment by a
//! doctor, and the severity policy applied to threshold violations.

mod manager;
mod severity;

pub use manager::{AlertError, AlertManager};
pub use severity::SeverityPolicy;
