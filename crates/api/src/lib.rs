//! Meme Classification API Server
//!
//! REST surface over the shared model runtime and the classification
//! engine.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

mod config;
mod routes;

pub use config::{AppConfig, ModelConfig};

use classifier::Classifier;
use model_runtime::ModelRuntime;

/// Application state shared across handlers
pub struct AppState {
    /// Shared model runtime
    pub runtime: Arc<ModelRuntime>,
    /// Classification engine over the runtime
    pub classifier: Classifier,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create application state from model configuration
    pub fn new(config: &ModelConfig) -> Self {
        let runtime = Arc::new(ModelRuntime::new(
            &config.model_dir,
            &config.model_id,
            config.precision,
            config.labels.clone(),
        ));
        let classifier = Classifier::new(runtime.clone())
            .with_timeout(Duration::from_millis(config.inference_timeout_ms));

        Self {
            runtime,
            classifier,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub model_status: model_runtime::ModelStatus,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/model/status", get(routes::model::get_status))
        .route("/api/v1/model/load", post(routes::model::load_model))
        .route("/api/v1/classify", post(routes::classify::classify_one))
        .route(
            "/api/v1/classify/batch",
            post(routes::classify::classify_batch),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        model_status: state.runtime.status(),
    })
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
pub async fn run_server(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::new(&config.model));

    // Load once at startup. A failure keeps the server up so callers can
    // query /model/status and retry the load.
    if let Err(e) = state.runtime.load().await {
        error!("Startup model load failed: {}", e);
    }

    let app = create_router(state);

    info!("Starting API server on {}", config.listen_addr);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
