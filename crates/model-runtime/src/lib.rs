//! Model Runtime
//!
//! Owns the shared ONNX inference session for the meme classifier:
//! acquisition with accelerated-hardware fallback, the readiness state
//! machine, and the session seam consumed by the classification engine.

mod backend;
mod device;
mod ort_backend;
mod runtime;
mod status;

pub use backend::{AcquireAttempt, ClassScore, ImageSource, InferenceBackend, InferenceSession};
pub use device::{DeviceKind, Precision};
pub use ort_backend::OrtBackend;
pub use runtime::ModelRuntime;
pub use status::ModelStatus;

use thiserror::Error;

/// Errors from model loading and inference
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model load failed for {model_id}: all backends exhausted")]
    LoadFailed { model_id: String },
    #[error("model is not loaded; call load() first")]
    NotLoaded,
    #[error("backend acquisition failed: {0}")]
    Acquire(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("invalid image input: {0}")]
    InvalidImage(String),
}
