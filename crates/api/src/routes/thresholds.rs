//! Threshold Routes

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use thresholds::Threshold;
use uuid::Uuid;
use vitals::Metric;

use crate::error::ApiError;
use crate::AppState;

/// Create/replace payload
#[derive(Debug, Deserialize)]
pub struct ThresholdPayload {
    pub patient_id: Uuid,
    pub metric: Metric,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
}

/// Create or replace the active threshold for a (patient, metric) pair
pub async fn set(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ThresholdPayload>,
) -> Result<Json<Threshold>, ApiError> {
    let threshold = state.thresholds.set(
        payload.patient_id,
        payload.metric,
        payload.min_value,
        payload.max_value,
    )?;
    Ok(Json(threshold))
}

/// List a patient's configured thresholds
pub async fn list(
    State(state): State<Arc<AppState>>,
    Path(patient_id): Path<Uuid>,
) -> Json<Vec<Threshold>> {
    Json(state.thresholds.list(patient_id))
}
