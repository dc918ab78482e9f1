//! Record Types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vitals::Metric;

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Alert lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    /// Created, not yet handed to a provider
    Pending,
    /// Handed off to the provider successfully
    Sent,
    /// Delivery settled as failed after the retry budget was spent
    Failed,
    /// Marked read by a doctor; terminal
    Acknowledged,
}

impl AlertStatus {
    /// Whether the state machine permits moving to `next` from here.
    ///
    /// pending → {sent, failed}; failed → pending (dispatcher retry);
    /// sent → acknowledged; acknowledged is terminal.
    pub fn accepts(&self, next: AlertStatus) -> bool {
        matches!(
            (self, next),
            (AlertStatus::Pending, AlertStatus::Sent)
                | (AlertStatus::Pending, AlertStatus::Failed)
                | (AlertStatus::Failed, AlertStatus::Pending)
                | (AlertStatus::Sent, AlertStatus::Acknowledged)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AlertStatus::Acknowledged)
    }
}

/// A recorded threshold violation.
///
/// Append-only: every violation is a factual event worth keeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub id: i64,
    pub patient_id: Uuid,
    pub metric: Metric,
    pub observed_value: f64,
    pub threshold_id: Uuid,
    pub severity: Severity,
    pub description: String,
    /// Timestamp of the originating event, not of log insertion
    pub detected_at: DateTime<Utc>,
    /// Collapses redeliveries of the same observation
    #[serde(skip_serializing, default)]
    pub observation_key: String,
}

/// A caregiver-facing notification record.
///
/// Never destroyed; status is the mutable projection of lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Option<Uuid>,
    /// Anomaly that triggered this alert, absent for direct sends
    pub anomaly_id: Option<i64>,
    pub message: String,
    pub severity: Severity,
    pub status: AlertStatus,
    /// Phone used at send time, kept for historical accuracy
    pub recipient_phone: Option<String>,
    pub provider_message_id: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub acknowledged_by: Option<Uuid>,
    /// Optimistic concurrency token, bumped on every update
    #[serde(skip_serializing, default)]
    pub version: u64,
}

impl AlertRecord {
    /// Create a pending alert
    pub fn pending(patient_id: Uuid, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id: None,
            anomaly_id: None,
            message: message.into(),
            severity,
            status: AlertStatus::Pending,
            recipient_phone: None,
            provider_message_id: None,
            error_message: None,
            created_at: Utc::now(),
            sent_at: None,
            acknowledged_at: None,
            acknowledged_by: None,
            version: 0,
        }
    }
}
