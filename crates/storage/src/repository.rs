//! Repository Implementation

use crate::record::{AlertRecord, AnomalyRecord};
use crate::StorageError;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// Outcome of an anomaly log write
#[derive(Debug, Clone)]
pub enum AnomalyWrite {
    /// The observation was new and has been appended
    Inserted(AnomalyRecord),
    /// The observation key was already present; the stored record is returned
    Duplicate(AnomalyRecord),
}

impl AnomalyWrite {
    pub fn record(&self) -> &AnomalyRecord {
        match self {
            AnomalyWrite::Inserted(r) | AnomalyWrite::Duplicate(r) => r,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, AnomalyWrite::Inserted(_))
    }
}

/// Repository for anomaly and alert records (in-memory implementation)
pub struct Repository {
    /// Anomaly log, append order
    anomalies: Mutex<Vec<AnomalyRecord>>,
    /// observation_key → anomaly id, for upsert-on-conflict
    observation_index: Mutex<HashMap<String, i64>>,
    /// Alert records by id
    alerts: Mutex<HashMap<Uuid, AlertRecord>>,
    /// Alert ids in creation order
    alert_order: Mutex<Vec<Uuid>>,
    /// Next anomaly ID
    next_anomaly_id: Mutex<i64>,
}

impl Repository {
    /// Create a new in-memory repository
    pub fn new() -> Self {
        info!("Creating in-memory repository");
        Self {
            anomalies: Mutex::new(Vec::new()),
            observation_index: Mutex::new(HashMap::new()),
            alerts: Mutex::new(HashMap::new()),
            alert_order: Mutex::new(Vec::new()),
            next_anomaly_id: Mutex::new(1),
        }
    }

    fn lock_err(e: impl std::fmt::Display) -> StorageError {
        StorageError::StoreError(format!("Lock error: {}", e))
    }

    /// Append an anomaly, collapsing redeliveries by observation key.
    ///
    /// A record whose key is already indexed is not appended again; the
    /// previously stored record is returned instead so callers can tell
    /// a fresh violation from a redelivered one.
    pub fn insert_anomaly(&self, mut record: AnomalyRecord) -> Result<AnomalyWrite, StorageError> {
        let mut index = self.observation_index.lock().map_err(Self::lock_err)?;
        let mut log = self.anomalies.lock().map_err(Self::lock_err)?;

        if let Some(&existing_id) = index.get(&record.observation_key) {
            let existing = log
                .iter()
                .find(|a| a.id == existing_id)
                .cloned()
                .ok_or(StorageError::NotFound)?;
            debug!(
                "Anomaly upsert hit existing record {} for key {}",
                existing_id, record.observation_key
            );
            return Ok(AnomalyWrite::Duplicate(existing));
        }

        let mut id = self.next_anomaly_id.lock().map_err(Self::lock_err)?;
        record.id = *id;
        *id += 1;

        index.insert(record.observation_key.clone(), record.id);
        log.push(record.clone());
        debug!("Inserted anomaly {} ({})", record.id, record.description);

        Ok(AnomalyWrite::Inserted(record))
    }

    /// Anomalies for a patient, newest first
    pub fn anomalies_for(&self, patient_id: Uuid) -> Result<Vec<AnomalyRecord>, StorageError> {
        let log = self.anomalies.lock().map_err(Self::lock_err)?;
        let mut rows: Vec<_> = log
            .iter()
            .filter(|a| a.patient_id == patient_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.detected_at.cmp(&a.detected_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    /// Insert a new alert record
    pub fn insert_alert(&self, record: AlertRecord) -> Result<AlertRecord, StorageError> {
        let mut alerts = self.alerts.lock().map_err(Self::lock_err)?;
        let mut order = self.alert_order.lock().map_err(Self::lock_err)?;

        order.push(record.id);
        alerts.insert(record.id, record.clone());
        debug!("Inserted alert {} for patient {}", record.id, record.patient_id);

        Ok(record)
    }

    /// Fetch an alert by id
    pub fn get_alert(&self, id: Uuid) -> Result<AlertRecord, StorageError> {
        let alerts = self.alerts.lock().map_err(Self::lock_err)?;
        alerts.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    /// Alerts for a patient, newest first
    pub fn alerts_for(&self, patient_id: Uuid) -> Result<Vec<AlertRecord>, StorageError> {
        let alerts = self.alerts.lock().map_err(Self::lock_err)?;
        let order = self.alert_order.lock().map_err(Self::lock_err)?;
        Ok(order
            .iter()
            .rev()
            .filter_map(|id| alerts.get(id))
            .filter(|a| a.patient_id == patient_id)
            .cloned()
            .collect())
    }

    /// Apply a mutation to an alert iff its version still matches.
    ///
    /// The stored version must equal `expected_version` or the update is
    /// rejected with `VersionConflict` and the caller retries against the
    /// fresh record. On success the version is bumped.
    pub fn update_alert<F>(
        &self,
        id: Uuid,
        expected_version: u64,
        apply: F,
    ) -> Result<AlertRecord, StorageError>
    where
        F: FnOnce(&mut AlertRecord),
    {
        let mut alerts = self.alerts.lock().map_err(Self::lock_err)?;
        let record = alerts.get_mut(&id).ok_or(StorageError::NotFound)?;

        if record.version != expected_version {
            return Err(StorageError::VersionConflict {
                expected: expected_version,
                found: record.version,
            });
        }

        apply(record);
        record.version += 1;
        Ok(record.clone())
    }

    /// Total anomaly count
    pub fn anomaly_count(&self) -> usize {
        self.anomalies.lock().map(|l| l.len()).unwrap_or(0)
    }

    /// Total alert count
    pub fn alert_count(&self) -> usize {
        self.alerts.lock().map(|a| a.len()).unwrap_or(0)
    }

    /// Clear all data (for testing)
    pub fn clear(&self) {
        if let Ok(mut log) = self.anomalies.lock() {
            log.clear();
        }
        if let Ok(mut index) = self.observation_index.lock() {
            index.clear();
        }
        if let Ok(mut alerts) = self.alerts.lock() {
            alerts.clear();
        }
        if let Ok(mut order) = self.alert_order.lock() {
            order.clear();
        }
    }
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}
