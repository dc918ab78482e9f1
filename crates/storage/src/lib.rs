//! Storage Layer
//!
//! In-memory repository for the anomaly log and alert records.
//! The anomaly log is append-only with upsert-on-conflict deduplication;
//! alert records carry a version for optimistic concurrency.

mod record;
mod repository;

pub use record::{AlertRecord, AlertStatus, AnomalyRecord, Severity};
pub use repository::{AnomalyWrite, Repository};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Store error: {0}")]
    StoreError(String),
    #[error("Record not found")]
    NotFound,
    #[error("Version conflict: expected {expected}, found {found}")]
    VersionConflict { expected: u64, found: u64 },
}
