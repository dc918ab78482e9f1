//! HTTP Directory Client

use crate::directory::{Contact, ContactDirectory, DirectoryError};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Directory backed by the identity service's REST API
pub struct HttpDirectory {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    phone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PatientRef {
    id: Uuid,
}

impl HttpDirectory {
    /// Create a client for the identity service at `base_url`.
    ///
    /// Lookups are bounded at 2 seconds so a stalled identity service
    /// cannot hold up dispatch or acknowledgment.
    pub fn new(base_url: impl Into<String>) -> Result<Self, DirectoryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }
}

#[async_trait]
impl ContactDirectory for HttpDirectory {
    async fn contact_for(&self, patient_id: Uuid) -> Result<Contact, DirectoryError> {
        let url = format!("{}/{}", self.base_url, patient_id);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(DirectoryError::PatientNotFound);
        }
        if !resp.status().is_success() {
            return Err(DirectoryError::Unavailable(format!(
                "identity service returned {}",
                resp.status()
            )));
        }

        let user: UserResponse = resp
            .json()
            .await
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;

        debug!("Resolved contact for patient {}", patient_id);
        user.phone
            .map(|phone| Contact { phone })
            .ok_or(DirectoryError::NoContact)
    }

    async fn is_care_provider(
        &self,
        doctor_id: Uuid,
        patient_id: Uuid,
    ) -> Result<bool, DirectoryError> {
        let url = format!("{}/{}/patients", self.base_url, doctor_id);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !resp.status().is_success() {
            return Err(DirectoryError::Unavailable(format!(
                "identity service returned {}",
                resp.status()
            )));
        }

        let patients: Vec<PatientRef> = resp
            .json()
            .await
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;

        Ok(patients.iter().any(|p| p.id == patient_id))
    }
}
