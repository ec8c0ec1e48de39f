//! Backend and session seams
//!
//! The runtime treats the inference stack as two capabilities: acquiring a
//! session on a specific device, and running a session on one image. Both
//! are traits so the classifier and the lifecycle tests can substitute the
//! real ort stack.

use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::{DeviceKind, ModelError, Precision};

/// A single class label with its softmax score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassScore {
    pub label: String,
    /// Probability mass for this class (0.0 to 1.0)
    pub score: f32,
}

/// Backend-resolvable reference to image bytes
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Image file on local disk
    Path(PathBuf),
    /// In-memory encoded image (PNG, JPEG, ...)
    Bytes(Vec<u8>),
}

impl ImageSource {
    /// Resolve the encoded bytes this source points at
    pub fn encoded_bytes(&self) -> Result<Cow<'_, [u8]>, ModelError> {
        match self {
            ImageSource::Path(path) => std::fs::read(path).map(Cow::Owned).map_err(|e| {
                ModelError::InvalidImage(format!("read {}: {}", path.display(), e))
            }),
            ImageSource::Bytes(bytes) => Ok(Cow::Borrowed(bytes)),
        }
    }
}

/// A loaded, ready-to-run model session bound to one device
pub trait InferenceSession: Send + Sync {
    /// Device this session was acquired on
    fn device(&self) -> DeviceKind;

    /// Run the model on one image, returning per-class scores sorted by
    /// descending score
    fn infer(&self, image: &ImageSource) -> Result<Vec<ClassScore>, ModelError>;
}

/// A strategy for acquiring a session on a specific device
pub trait InferenceBackend: Send + Sync {
    /// Device this backend targets
    fn device(&self) -> DeviceKind;

    /// Bind the model to this device
    fn acquire(
        &self,
        model_id: &str,
        precision: Precision,
    ) -> Result<Arc<dyn InferenceSession>, ModelError>;
}

/// Outcome of one backend acquisition attempt during a load
#[derive(Debug, Clone, Serialize)]
pub struct AcquireAttempt {
    pub device: DeviceKind,
    pub ok: bool,
    pub error: Option<String>,
}
