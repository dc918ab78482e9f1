//! End-to-end scenarios over the HTTP surface: ingestion through
//! evaluation, alert dispatch, and acknowledgment.

use api::{create_router, AppState, Settings};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use event_bus::{BusConfig, EventHandler};
use identity::{ContactDirectory, StaticDirectory};
use notify::{NotificationProvider, RetryPolicy, TestProvider};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tower::ServiceExt;
use uuid::Uuid;

struct Harness {
    router: Router,
    directory: Arc<StaticDirectory>,
    provider: Arc<TestProvider>,
}

fn harness() -> Harness {
    let mut settings = Settings::default();
    settings.retry = RetryPolicy {
        max_attempts: 2,
        backoff_base_ms: 1,
        attempt_timeout_ms: 1000,
    };
    settings.bus = BusConfig {
        capacity: 64,
        max_deliveries: 3,
        redelivery_backoff_ms: 1,
    };

    let provider = Arc::new(TestProvider::new());
    let directory = Arc::new(StaticDirectory::new());
    let (state, consumer, evaluator) = AppState::build(
        &settings,
        Arc::clone(&provider) as Arc<dyn NotificationProvider>,
        Arc::clone(&directory) as Arc<dyn ContactDirectory>,
    );
    let handler: Arc<dyn EventHandler> = evaluator;
    tokio::spawn(consumer.run(handler));

    Harness {
        router: create_router(state),
        directory,
        provider,
    }
}

async fn request(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    let request = match body {
        Some(json) => builder.body(Body::from(json.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    request(router, "GET", uri, None).await
}

async fn post(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    request(router, "POST", uri, Some(body)).await
}

/// Poll a GET endpoint until the predicate holds; evaluation and
/// dispatch run asynchronously behind the ingestion response.
async fn wait_until<F>(router: &Router, uri: &str, predicate: F) -> Value
where
    F: Fn(&Value) -> bool,
{
    for _ in 0..200 {
        let (status, value) = get(router, uri).await;
        assert_eq!(status, StatusCode::OK);
        if predicate(&value) {
            return value;
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!("condition never held for {}", uri);
}

fn all_settled(alerts: &Value) -> bool {
    let rows = alerts.as_array().expect("alert list");
    !rows.is_empty() && rows.iter().all(|a| a["status"] != "pending")
}

#[tokio::test]
async fn scenario_heart_rate_over_max_produces_one_anomaly_and_alert() {
    let hx = harness();
    let patient = Uuid::new_v4();

    let (status, _) = post(
        &hx.router,
        "/api/v1/thresholds",
        json!({"patient_id": patient, "metric": "heart_rate", "max_value": 120.0}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post(
        &hx.router,
        &format!("/api/v1/vitals/{}", patient),
        json!({"heart_rate": 160.0}),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["published"], true);

    let anomalies = wait_until(
        &hx.router,
        &format!("/api/v1/anomalies/{}", patient),
        |v| v.as_array().is_some_and(|a| !a.is_empty()),
    )
    .await;
    let anomalies = anomalies.as_array().unwrap();
    assert_eq!(anomalies.len(), 1, "exactly one anomaly");
    let description = anomalies[0]["description"].as_str().unwrap();
    assert!(description.contains("160"));
    assert!(description.contains("120"));

    let alerts = wait_until(&hx.router, &format!("/api/v1/alerts/{}", patient), all_settled).await;
    let alerts = alerts.as_array().unwrap();
    assert_eq!(alerts.len(), 1, "exactly one alert");
    assert_eq!(alerts[0]["status"], "sent");
    assert!(alerts[0]["provider_message_id"]
        .as_str()
        .unwrap()
        .starts_with("test-"));

    let deliveries = hx.provider.deliveries();
    assert_eq!(deliveries.len(), 1);
    assert!(deliveries[0].body.contains("exceeds max"));
}

#[tokio::test]
async fn scenario_alert_message_references_the_violation() {
    let hx = harness();
    let patient = Uuid::new_v4();

    post(
        &hx.router,
        "/api/v1/thresholds",
        json!({"patient_id": patient, "metric": "heart_rate", "max_value": 60.0}),
    )
    .await;
    post(
        &hx.router,
        &format!("/api/v1/vitals/{}", patient),
        json!({"heart_rate": 95.0}),
    )
    .await;

    let anomalies = wait_until(
        &hx.router,
        &format!("/api/v1/anomalies/{}", patient),
        |v| v.as_array().is_some_and(|a| !a.is_empty()),
    )
    .await;
    assert!(!anomalies.as_array().unwrap().is_empty());

    let alerts = wait_until(&hx.router, &format!("/api/v1/alerts/{}", patient), all_settled).await;
    let message = alerts[0]["message"].as_str().unwrap();
    assert!(message.contains("95"), "message must reference the violation: {}", message);
    assert!(message.contains("60"));
}

#[tokio::test]
async fn scenario_acknowledge_latest_alert_then_repeat_fails() {
    let hx = harness();
    let patient = Uuid::new_v4();
    let doctor = Uuid::new_v4();
    hx.directory.link(doctor, patient);

    post(
        &hx.router,
        "/api/v1/thresholds",
        json!({"patient_id": patient, "metric": "spo2", "min_value": 90.0}),
    )
    .await;
    post(
        &hx.router,
        &format!("/api/v1/vitals/{}", patient),
        json!({"spo2": 82.0}),
    )
    .await;

    let alerts = wait_until(&hx.router, &format!("/api/v1/alerts/{}", patient), all_settled).await;
    let alert_id = alerts[0]["id"].as_str().unwrap().to_string();

    let (status, acked) = post(
        &hx.router,
        &format!("/api/v1/alerts/{}/acknowledge", alert_id),
        json!({"status": "acknowledged", "doctor_id": doctor}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(acked["status"], "acknowledged");
    assert_eq!(acked["acknowledged_by"].as_str().unwrap(), doctor.to_string());

    let (_, alerts) = get(&hx.router, &format!("/api/v1/alerts/{}", patient)).await;
    assert_eq!(alerts[0]["status"], "acknowledged");

    // Repeating the same acknowledge must be rejected
    let (status, body) = post(
        &hx.router,
        &format!("/api/v1/alerts/{}/acknowledge", alert_id),
        json!({"status": "acknowledged", "doctor_id": doctor}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("acknowledged"));
}

#[tokio::test]
async fn scenario_no_threshold_means_no_anomalies_or_alerts() {
    let hx = harness();
    let patient = Uuid::new_v4();

    let (status, _) = post(
        &hx.router,
        &format!("/api/v1/vitals/{}", patient),
        json!({"heart_rate": 80.0}),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    // Give the consumer a moment to process before asserting absence
    sleep(Duration::from_millis(100)).await;

    let (_, anomalies) = get(&hx.router, &format!("/api/v1/anomalies/{}", patient)).await;
    assert_eq!(anomalies.as_array().unwrap().len(), 0);

    let (_, alerts) = get(&hx.router, &format!("/api/v1/alerts/{}", patient)).await;
    assert_eq!(alerts.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn implausible_reading_is_rejected_at_the_boundary() {
    let hx = harness();
    let patient = Uuid::new_v4();

    let (status, body) = post(
        &hx.router,
        &format!("/api/v1/vitals/{}", patient),
        json!({"heart_rate": 400.0}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("heart_rate"));

    let (status, _) = post(
        &hx.router,
        &format!("/api/v1/vitals/{}", patient),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn inverted_threshold_bounds_are_rejected() {
    let hx = harness();
    let (status, body) = post(
        &hx.router,
        "/api/v1/thresholds",
        json!({"patient_id": Uuid::new_v4(), "metric": "spo2", "min_value": 95.0, "max_value": 90.0}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("greater"));
}

#[tokio::test]
async fn direct_send_and_compatibility_route() {
    let hx = harness();
    let patient = Uuid::new_v4();

    let (status, alert) = post(
        &hx.router,
        "/api/v1/alerts/send",
        json!({"patient_id": patient, "message": "please schedule a follow-up", "severity": "warning"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(alert["severity"], "warning");

    // Path-scoped form: patient id from the path, severity defaults to info
    let (status, alert) = post(
        &hx.router,
        &format!("/api/v1/alerts/send/{}", patient),
        json!({"message": "medication reminder"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(alert["severity"], "info");
    assert_eq!(alert["patient_id"].as_str().unwrap(), patient.to_string());

    let alerts = wait_until(&hx.router, &format!("/api/v1/alerts/{}", patient), all_settled).await;
    let rows = alerts.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|a| a["status"] == "sent"));
    assert_eq!(rows[0]["message"], "medication reminder", "newest first");
}

#[tokio::test]
async fn acknowledge_error_paths() {
    let hx = harness();
    let patient = Uuid::new_v4();
    let doctor = Uuid::new_v4();

    // Unknown alert id
    let (status, _) = post(
        &hx.router,
        &format!("/api/v1/alerts/{}/acknowledge", Uuid::new_v4()),
        json!({"status": "acknowledged", "doctor_id": doctor}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, alert) = post(
        &hx.router,
        "/api/v1/alerts/send",
        json!({"patient_id": patient, "message": "check in", "severity": "info"}),
    )
    .await;
    let alert_id = alert["id"].as_str().unwrap().to_string();
    wait_until(&hx.router, &format!("/api/v1/alerts/{}", patient), all_settled).await;

    // Wrong status value
    let (status, _) = post(
        &hx.router,
        &format!("/api/v1/alerts/{}/acknowledge", alert_id),
        json!({"status": "resolved", "doctor_id": doctor}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Doctor not linked to the patient
    let (status, _) = post(
        &hx.router,
        &format!("/api/v1/alerts/{}/acknowledge", alert_id),
        json!({"status": "acknowledged", "doctor_id": doctor}),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn health_reports_pipeline_components() {
    let hx = harness();

    let (status, body) = get(&hx.router, "/api/v1/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["components"]["provider"]["detail"], "test");
    assert_eq!(body["metrics"]["alert_count"], 0);
}

#[tokio::test]
async fn threshold_listing_returns_configured_bounds() {
    let hx = harness();
    let patient = Uuid::new_v4();

    post(
        &hx.router,
        "/api/v1/thresholds",
        json!({"patient_id": patient, "metric": "heart_rate", "min_value": 40.0, "max_value": 120.0}),
    )
    .await;
    post(
        &hx.router,
        "/api/v1/thresholds",
        json!({"patient_id": patient, "metric": "glucose", "max_value": 180.0}),
    )
    .await;

    let (status, body) = get(&hx.router, &format!("/api/v1/thresholds/{}", patient)).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().any(|t| t["metric"] == "heart_rate" && t["max_value"] == 120.0));
}
