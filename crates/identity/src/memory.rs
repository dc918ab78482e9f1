//! In-Memory Directory

use crate::directory::{Contact, ContactDirectory, DirectoryError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use uuid::Uuid;

/// Directory backed by registrations made at startup.
///
/// Used in tests and single-process deployments where no identity
/// service is running.
#[derive(Default)]
pub struct StaticDirectory {
    contacts: Mutex<HashMap<Uuid, Contact>>,
    linkage: Mutex<HashSet<(Uuid, Uuid)>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a patient's phone number
    pub fn register_contact(&self, patient_id: Uuid, phone: impl Into<String>) {
        let mut contacts = self.contacts.lock().unwrap_or_else(|e| e.into_inner());
        contacts.insert(
            patient_id,
            Contact {
                phone: phone.into(),
            },
        );
    }

    /// Link a doctor to a patient
    pub fn link(&self, doctor_id: Uuid, patient_id: Uuid) {
        let mut linkage = self.linkage.lock().unwrap_or_else(|e| e.into_inner());
        linkage.insert((doctor_id, patient_id));
    }
}

#[async_trait]
impl ContactDirectory for StaticDirectory {
    async fn contact_for(&self, patient_id: Uuid) -> Result<Contact, DirectoryError> {
        let contacts = self.contacts.lock().unwrap_or_else(|e| e.into_inner());
        contacts
            .get(&patient_id)
            .cloned()
            .ok_or(DirectoryError::NoContact)
    }

    async fn is_care_provider(
        &self,
        doctor_id: Uuid,
        patient_id: Uuid,
    ) -> Result<bool, DirectoryError> {
        let linkage = self.linkage.lock().unwrap_or_else(|e| e.into_inner());
        Ok(linkage.contains(&(doctor_id, patient_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_contact_registration() {
        let directory = StaticDirectory::new();
        let patient = Uuid::new_v4();

        assert!(directory.contact_for(patient).await.is_err());

        directory.register_contact(patient, "+15550100");
        let contact = directory.contact_for(patient).await.unwrap();
        assert_eq!(contact.phone, "+15550100");
    }

    #[tokio::test]
    async fn test_linkage() {
        let directory = StaticDirectory::new();
        let doctor = Uuid::new_v4();
        let patient = Uuid::new_v4();

        assert!(!directory.is_care_provider(doctor, patient).await.unwrap());
        directory.link(doctor, patient);
        assert!(directory.is_care_provider(doctor, patient).await.unwrap());
    }
}
