//! Alert Routes

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use storage::{AlertRecord, Severity};
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

/// Direct-send payload
#[derive(Debug, Deserialize)]
pub struct SendPayload {
    /// Optional so the path-scoped compatibility route can supply it
    pub patient_id: Option<Uuid>,
    pub message: String,
    #[serde(default = "default_severity")]
    pub severity: Severity,
    pub doctor_id: Option<Uuid>,
}

fn default_severity() -> Severity {
    Severity::Info
}

/// Acknowledge payload
#[derive(Debug, Deserialize)]
pub struct AcknowledgePayload {
    pub status: String,
    pub doctor_id: Uuid,
}

/// Send a manual notification: `{patient_id, message, severity}`
pub async fn send(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SendPayload>,
) -> Result<(StatusCode, Json<AlertRecord>), ApiError> {
    let patient_id = payload
        .patient_id
        .ok_or_else(|| ApiError::Validation("patient_id is required".to_string()))?;
    let alert = state
        .alerts
        .send(patient_id, payload.message, payload.severity, payload.doctor_id)?;
    Ok((StatusCode::CREATED, Json(alert)))
}

/// Compatibility route with the patient id taken from the path
pub async fn send_for_patient(
    State(state): State<Arc<AppState>>,
    Path(patient_id): Path<Uuid>,
    Json(payload): Json<SendPayload>,
) -> Result<(StatusCode, Json<AlertRecord>), ApiError> {
    let alert = state
        .alerts
        .send(patient_id, payload.message, payload.severity, payload.doctor_id)?;
    Ok((StatusCode::CREATED, Json(alert)))
}

/// Alert history for a patient, newest first
pub async fn history(
    State(state): State<Arc<AppState>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Vec<AlertRecord>>, ApiError> {
    Ok(Json(state.alerts.history(patient_id)?))
}

/// Mark a delivered alert as read by a doctor
pub async fn acknowledge(
    State(state): State<Arc<AppState>>,
    Path(alert_id): Path<Uuid>,
    Json(payload): Json<AcknowledgePayload>,
) -> Result<Json<AlertRecord>, ApiError> {
    if payload.status != "acknowledged" {
        return Err(ApiError::Validation(
            "status must be \"acknowledged\"".to_string(),
        ));
    }
    let alert = state.alerts.acknowledge(alert_id, payload.doctor_id).await?;
    Ok(Json(alert))
}
