//! Alert Manager Implementation

use chrono::Utc;
use identity::ContactDirectory;
use notify::Dispatcher;
use std::sync::Arc;
use storage::{AlertRecord, AlertStatus, AnomalyRecord, Repository, Severity, StorageError};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// Bounded CAS retries for the acknowledge transition
const ACK_ATTEMPTS: u32 = 4;

/// Alert lifecycle errors
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("Alert not found")]
    NotFound,

    #[error("Alert is {actual:?}; only sent alerts can be acknowledged")]
    InvalidState { actual: AlertStatus },

    #[error("Doctor {0} is not a care provider for this patient")]
    Unauthorized(Uuid),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Directory unavailable: {0}")]
    Directory(String),

    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for AlertError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => AlertError::NotFound,
            other => AlertError::Storage(other),
        }
    }
}

/// Owns the alert state machine: pending → {sent, failed} → acknowledged.
///
/// Creation paths return as soon as the pending record is durable; the
/// dispatcher settles the terminal delivery status asynchronously.
pub struct AlertManager {
    repository: Arc<Repository>,
    dispatcher: Arc<Dispatcher>,
    directory: Arc<dyn ContactDirectory>,
}

impl AlertManager {
    pub fn new(
        repository: Arc<Repository>,
        dispatcher: Arc<Dispatcher>,
        directory: Arc<dyn ContactDirectory>,
    ) -> Self {
        info!(
            "Creating alert manager with provider {}",
            dispatcher.provider_name()
        );
        Self {
            repository,
            dispatcher,
            directory,
        }
    }

    /// Create an alert for a recorded anomaly and hand it to dispatch.
    ///
    /// Severity comes from the anomaly's classification, floored at
    /// warning: a threshold violation is never merely informational.
    pub fn raise(&self, anomaly: &AnomalyRecord) -> Result<AlertRecord, AlertError> {
        let mut alert = AlertRecord::pending(
            anomaly.patient_id,
            format!("Anomaly detected: {}", anomaly.description),
            anomaly.severity.max(Severity::Warning),
        );
        alert.anomaly_id = Some(anomaly.id);

        let alert = self.repository.insert_alert(alert)?;
        debug!(
            "Raised alert {} for anomaly {} ({:?})",
            alert.id, anomaly.id, alert.severity
        );
        self.dispatcher.spawn(alert.clone());
        Ok(alert)
    }

    /// Direct-send path for callers that are not anomaly-triggered
    pub fn send(
        &self,
        patient_id: Uuid,
        message: impl Into<String>,
        severity: Severity,
        doctor_id: Option<Uuid>,
    ) -> Result<AlertRecord, AlertError> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(AlertError::Validation(
                "message must not be empty".to_string(),
            ));
        }

        let mut alert = AlertRecord::pending(patient_id, message, severity);
        alert.doctor_id = doctor_id;

        let alert = self.repository.insert_alert(alert)?;
        debug!("Created direct alert {} for patient {}", alert.id, patient_id);
        self.dispatcher.spawn(alert.clone());
        Ok(alert)
    }

    /// Mark a delivered alert as read by a doctor. One-way.
    ///
    /// Only `sent` alerts can be acknowledged: a caregiver acknowledges
    /// a notification they received, not one still pending or failed.
    pub async fn acknowledge(
        &self,
        alert_id: Uuid,
        doctor_id: Uuid,
    ) -> Result<AlertRecord, AlertError> {
        let alert = self.repository.get_alert(alert_id)?;

        let authorized = self
            .directory
            .is_care_provider(doctor_id, alert.patient_id)
            .await
            .map_err(|e| AlertError::Directory(e.to_string()))?;
        if !authorized {
            return Err(AlertError::Unauthorized(doctor_id));
        }

        // CAS loop: a concurrent settle bumps the version and we re-check
        // the state rule against the fresh record.
        for _ in 0..ACK_ATTEMPTS {
            let current = self.repository.get_alert(alert_id)?;
            if current.status != AlertStatus::Sent {
                return Err(AlertError::InvalidState {
                    actual: current.status,
                });
            }

            let result = self.repository.update_alert(alert_id, current.version, |record| {
                record.status = AlertStatus::Acknowledged;
                record.acknowledged_at = Some(Utc::now());
                record.acknowledged_by = Some(doctor_id);
            });

            match result {
                Ok(updated) => {
                    info!("Alert {} acknowledged by doctor {}", alert_id, doctor_id);
                    return Ok(updated);
                }
                Err(StorageError::VersionConflict { .. }) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(AlertError::Storage(StorageError::StoreError(format!(
            "gave up acknowledging alert {} after {} version conflicts",
            alert_id, ACK_ATTEMPTS
        ))))
    }

    /// Alert history for a patient, newest first
    pub fn history(&self, patient_id: Uuid) -> Result<Vec<AlertRecord>, AlertError> {
        Ok(self.repository.alerts_for(patient_id)?)
    }
}
