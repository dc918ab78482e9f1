//! Anomaly Routes

use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;
use storage::AnomalyRecord;
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

/// Anomaly history for a patient, newest first
pub async fn history(
    State(state): State<Arc<AppState>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Vec<AnomalyRecord>>, ApiError> {
    Ok(Json(state.repository.anomalies_for(patient_id)?))
}
