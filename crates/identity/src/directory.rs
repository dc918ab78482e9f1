//! Directory Capability

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A patient's registered contact channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub phone: String,
}

/// Directory lookup errors
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Patient not found")]
    PatientNotFound,
    #[error("No contact channel on record")]
    NoContact,
    #[error("Directory unavailable: {0}")]
    Unavailable(String),
}

/// Read-only view of the identity service
#[async_trait]
pub trait ContactDirectory: Send + Sync {
    /// Resolve a patient's contact channel
    async fn contact_for(&self, patient_id: Uuid) -> Result<Contact, DirectoryError>;

    /// Whether the doctor is linked to the patient as a care provider
    async fn is_care_provider(
        &self,
        doctor_id: Uuid,
        patient_id: Uuid,
    ) -> Result<bool, DirectoryError>;
}
