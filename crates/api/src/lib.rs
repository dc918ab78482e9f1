//! Patient Monitoring API Server
//!
//! REST surface over the anomaly-detection and alert-lifecycle pipeline:
//! vitals ingestion, threshold administration, anomaly and alert queries,
//! direct sends, and acknowledgment.

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_governor::GovernorLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod error;
mod rate_limit;
mod routes;
mod settings;

pub use error::ApiError;
pub use rate_limit::{create_governor_config, RateLimitConfig};
pub use settings::{
    DirectoryMode, DirectorySettings, ProviderMode, ProviderSettings, Settings,
};

use alerting::AlertManager;
use evaluator::Evaluator;
use event_bus::{EventBus, EventConsumer, EventHandler};
use identity::ContactDirectory;
use notify::{Dispatcher, NotificationProvider};
use storage::Repository;
use thresholds::ThresholdStore;
use vitals::Validator;

/// Application state shared across handlers
pub struct AppState {
    /// Publisher side of the event bus
    pub bus: EventBus,
    /// Ingestion payload validator
    pub validator: Validator,
    /// Threshold store
    pub thresholds: Arc<ThresholdStore>,
    /// Anomaly log + alert repository
    pub repository: Arc<Repository>,
    /// Alert manager
    pub alerts: Arc<AlertManager>,
    /// Name of the configured notification provider
    pub provider_name: &'static str,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Wire the pipeline around the given provider and directory.
    ///
    /// Returns the shared state plus the consumer worker and its handler;
    /// the caller spawns `consumer.run(handler)` on the runtime.
    pub fn build(
        settings: &Settings,
        provider: Arc<dyn NotificationProvider>,
        directory: Arc<dyn ContactDirectory>,
    ) -> (Arc<Self>, EventConsumer, Arc<Evaluator>) {
        let repository = Arc::new(Repository::new());
        let thresholds = Arc::new(ThresholdStore::new());
        let provider_name = provider.name();

        let dispatcher = Arc::new(Dispatcher::new(
            provider,
            Arc::clone(&directory),
            Arc::clone(&repository),
            settings.retry.clone(),
        ));
        let alerts = Arc::new(AlertManager::new(
            Arc::clone(&repository),
            dispatcher,
            directory,
        ));
        let evaluator = Arc::new(Evaluator::new(
            Arc::clone(&thresholds),
            Arc::clone(&repository),
            Arc::clone(&alerts),
            settings.severity.clone(),
        ));
        let (bus, consumer) = event_bus::channel(settings.bus.clone());

        let state = Arc::new(Self {
            bus,
            validator: Validator::new(settings.validation.clone()),
            thresholds,
            repository,
            alerts,
            provider_name,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        });

        (state, consumer, evaluator)
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: ComponentStatus,
    pub metrics: SystemMetrics,
}

/// Component status
#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub event_bus: ComponentHealth,
    pub repository: ComponentHealth,
    pub provider: ComponentHealth,
}

/// Individual component health
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: String,
    pub detail: Option<String>,
}

/// System metrics
#[derive(Debug, Serialize)]
pub struct SystemMetrics {
    pub queue_depth: usize,
    pub threshold_count: usize,
    pub anomaly_count: usize,
    pub alert_count: usize,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/vitals/:id", post(routes::vitals::ingest))
        .route("/api/v1/thresholds", post(routes::thresholds::set))
        .route("/api/v1/thresholds/:id", get(routes::thresholds::list))
        .route("/api/v1/anomalies/:id", get(routes::anomalies::history))
        .route("/api/v1/alerts/send", post(routes::alerts::send))
        .route(
            "/api/v1/alerts/send/:id",
            post(routes::alerts::send_for_patient),
        )
        .route("/api/v1/alerts/:id", get(routes::alerts::history))
        .route(
            "/api/v1/alerts/:id/acknowledge",
            post(routes::alerts::acknowledge),
        )
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let response = HealthResponse {
        status: "healthy".to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        components: ComponentStatus {
            event_bus: ComponentHealth {
                status: "ok".to_string(),
                detail: Some(format!("{} in flight", state.bus.depth())),
            },
            repository: ComponentHealth {
                status: "ok".to_string(),
                detail: None,
            },
            provider: ComponentHealth {
                status: "ok".to_string(),
                detail: Some(state.provider_name.to_string()),
            },
        },
        metrics: SystemMetrics {
            queue_depth: state.bus.depth(),
            threshold_count: state.thresholds.count(),
            anomaly_count: state.repository.anomaly_count(),
            alert_count: state.repository.alert_count(),
        },
    };

    Json(response)
}

/// Initialize logging
pub fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Run the server
pub async fn run_server(settings: Settings) -> anyhow::Result<()> {
    let provider = settings.provider.build()?;
    let directory = settings.directory.build()?;

    let (state, consumer, evaluator) = AppState::build(&settings, provider, directory);
    let handler: Arc<dyn EventHandler> = evaluator;
    tokio::spawn(consumer.run(handler));

    let governor_config = create_governor_config(&settings.rate_limit);
    let app = create_router(state)
        .layer(GovernorLayer {
            config: governor_config,
        })
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = settings.listen_addr().to_string();
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
