//! Vitals Ingestion Route

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use vitals::{Metric, VitalsEvent};

use crate::error::ApiError;
use crate::AppState;

/// Ingestion payload: one reading batch, flat optional fields
#[derive(Debug, Deserialize)]
pub struct VitalsPayload {
    /// Reading time; defaults to arrival time
    pub timestamp: Option<DateTime<Utc>>,
    pub heart_rate: Option<f64>,
    pub spo2: Option<f64>,
    pub respiratory_rate: Option<f64>,
    pub systolic_bp: Option<f64>,
    pub diastolic_bp: Option<f64>,
    pub temperature: Option<f64>,
    pub glucose: Option<f64>,
}

impl VitalsPayload {
    fn into_event(self, patient_id: Uuid) -> VitalsEvent {
        let mut event = VitalsEvent::new(patient_id, self.timestamp.unwrap_or_else(Utc::now));
        let readings = [
            (Metric::HeartRate, self.heart_rate),
            (Metric::Spo2, self.spo2),
            (Metric::RespiratoryRate, self.respiratory_rate),
            (Metric::SystolicBp, self.systolic_bp),
            (Metric::DiastolicBp, self.diastolic_bp),
            (Metric::Temperature, self.temperature),
            (Metric::Glucose, self.glucose),
        ];
        for (metric, value) in readings {
            if let Some(value) = value {
                event = event.with_reading(metric, value);
            }
        }
        event
    }
}

/// Response for the ingestion endpoint
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub published: bool,
    pub queue_depth: usize,
}

/// Validate a reading batch and publish it to the event bus.
///
/// Returns once the event is durably enqueued; evaluation and dispatch
/// run on the consumption path.
pub async fn ingest(
    State(state): State<Arc<AppState>>,
    Path(patient_id): Path<Uuid>,
    Json(payload): Json<VitalsPayload>,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
    let event = payload.into_event(patient_id);
    state.validator.validate_event(&event)?;
    state.bus.publish(event).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(IngestResponse {
            published: true,
            queue_depth: state.bus.depth(),
        }),
    ))
}
