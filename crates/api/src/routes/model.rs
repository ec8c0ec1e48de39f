//! Model lifecycle routes

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use tracing::warn;

use model_runtime::{AcquireAttempt, ModelStatus};

use crate::AppState;

/// Model status response
#[derive(Debug, Serialize)]
pub struct ModelStatusResponse {
    pub status: ModelStatus,
    pub ready: bool,
    /// Per-backend report of the most recent load attempt
    pub last_load: Vec<AcquireAttempt>,
}

fn status_response(state: &AppState) -> ModelStatusResponse {
    ModelStatusResponse {
        status: state.runtime.status(),
        ready: state.runtime.is_ready(),
        last_load: state.runtime.last_load_report(),
    }
}

/// Get current model status
pub async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(status_response(&state))
}

/// Trigger a model load
///
/// Idempotent: a ready model returns immediately. Retry policy is the
/// caller's; the server never retries on its own.
pub async fn load_model(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.runtime.load().await {
        Ok(()) => (StatusCode::OK, Json(status_response(&state))),
        Err(e) => {
            warn!("Model load request failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(status_response(&state)))
        }
    }
}
