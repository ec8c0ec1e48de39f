//! Classification routes

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::warn;

use classifier::ClassificationResult;
use model_runtime::ImageSource;

use crate::AppState;

/// Single-image classification request (base64-encoded image bytes)
#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub image_data: String,
}

/// Batch classification request
#[derive(Debug, Deserialize)]
pub struct ClassifyBatchRequest {
    pub images: Vec<String>,
}

/// Batch classification response, order-matched to the request
#[derive(Debug, Serialize)]
pub struct ClassifyBatchResponse {
    pub results: Vec<ClassificationResult>,
}

/// API error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

fn decode_image(data: &str) -> Result<ImageSource, base64::DecodeError> {
    base64::engine::general_purpose::STANDARD
        .decode(data)
        .map(ImageSource::Bytes)
}

/// Classify one image
pub async fn classify_one(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ClassifyRequest>,
) -> Response {
    let image = match decode_image(&request.image_data) {
        Ok(image) => image,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("invalid image payload: {}", e),
            )
        }
    };

    match state.classifier.classify_one(image).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => {
            warn!("Classification rejected: {}", e);
            error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
    }
}

/// Classify a batch of images
pub async fn classify_batch(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ClassifyBatchRequest>,
) -> Response {
    let mut images = Vec::with_capacity(request.images.len());
    for (index, data) in request.images.iter().enumerate() {
        match decode_image(data) {
            Ok(image) => images.push(image),
            Err(e) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    format!("invalid image payload at index {}: {}", index, e),
                )
            }
        }
    }

    match state.classifier.classify_batch(images).await {
        Ok(results) => Json(ClassifyBatchResponse { results }).into_response(),
        Err(e) => {
            warn!("Batch classification rejected: {}", e);
            error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ModelConfig;

    fn state() -> Arc<AppState> {
        // Runtime built but never loaded: classification must report 503.
        Arc::new(AppState::new(&ModelConfig::default()))
    }

    #[test]
    fn rejects_garbage_base64() {
        assert!(decode_image("%%not-base64%%").is_err());
        assert!(decode_image("aGVsbG8=").is_ok());
    }

    #[tokio::test]
    async fn classify_rejects_undecodable_payload() {
        let response = classify_one(
            State(state()),
            Json(ClassifyRequest {
                image_data: "%%not-base64%%".to_string(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn classify_without_model_is_unavailable() {
        let response = classify_one(
            State(state()),
            Json(ClassifyRequest {
                image_data: "aGVsbG8=".to_string(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn batch_reports_the_offending_index() {
        let response = classify_batch(
            State(state()),
            Json(ClassifyBatchRequest {
                images: vec!["aGVsbG8=".to_string(), "%%".to_string()],
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
