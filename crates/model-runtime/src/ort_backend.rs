//! ort-backed session acquisition and inference

use std::path::PathBuf;
use std::sync::Arc;

use image::imageops::FilterType;
use ndarray::Array4;
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use tracing::{debug, info, warn};

use crate::backend::{ClassScore, ImageSource, InferenceBackend, InferenceSession};
use crate::{DeviceKind, ModelError, Precision};

/// Classifier input edge in pixels (square ViT-style input)
const INPUT_EDGE: u32 = 224;

/// Acquires ort sessions for one device kind
///
/// Two instances of this backend, one `Accelerated` and one `Fallback`,
/// form the runtime's standard preference chain.
pub struct OrtBackend {
    device: DeviceKind,
    model_dir: PathBuf,
    labels: Vec<String>,
}

impl OrtBackend {
    /// Create a backend rooted at `model_dir`, holding the output label
    /// table in model output order
    pub fn new(device: DeviceKind, model_dir: impl Into<PathBuf>, labels: Vec<String>) -> Self {
        Self {
            device,
            model_dir: model_dir.into(),
            labels,
        }
    }
}

impl InferenceBackend for OrtBackend {
    fn device(&self) -> DeviceKind {
        self.device
    }

    fn acquire(
        &self,
        model_id: &str,
        precision: Precision,
    ) -> Result<Arc<dyn InferenceSession>, ModelError> {
        let model_path = self.model_dir.join(model_id).join(precision.model_file());
        info!(
            "Acquiring {} session for {} from {}",
            self.device.as_str(),
            model_id,
            model_path.display()
        );

        let builder = Session::builder()
            .map_err(|e| ModelError::Acquire(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ModelError::Acquire(e.to_string()))?;

        let builder = match self.device {
            DeviceKind::Accelerated => builder
                .with_execution_providers([CUDAExecutionProvider::default().build()])
                .map_err(|e| ModelError::Acquire(e.to_string()))?,
            DeviceKind::Fallback => builder,
        };

        let session = builder
            .commit_from_file(&model_path)
            .map_err(|e| ModelError::Acquire(e.to_string()))?;

        Ok(Arc::new(OrtSession {
            session,
            device: self.device,
            labels: self.labels.clone(),
        }))
    }
}

/// A committed ort session plus its label table
struct OrtSession {
    session: Session,
    device: DeviceKind,
    labels: Vec<String>,
}

impl InferenceSession for OrtSession {
    fn device(&self) -> DeviceKind {
        self.device
    }

    fn infer(&self, image: &ImageSource) -> Result<Vec<ClassScore>, ModelError> {
        let bytes = image.encoded_bytes()?;
        let decoded = image::load_from_memory(&bytes)
            .map_err(|e| ModelError::InvalidImage(e.to_string()))?
            .to_rgb8();

        let resized = image::imageops::resize(&decoded, INPUT_EDGE, INPUT_EDGE, FilterType::Triangle);

        // Normalize to [-1, 1] into a 1x3xHxW tensor
        let edge = INPUT_EDGE as usize;
        let mut input = Array4::<f32>::zeros((1, 3, edge, edge));
        for (x, y, pixel) in resized.enumerate_pixels() {
            input[[0, 0, y as usize, x as usize]] = (pixel[0] as f32 / 127.5) - 1.0;
            input[[0, 1, y as usize, x as usize]] = (pixel[1] as f32 / 127.5) - 1.0;
            input[[0, 2, y as usize, x as usize]] = (pixel[2] as f32 / 127.5) - 1.0;
        }

        let outputs = self
            .session
            .run(ort::inputs![input].map_err(|e| ModelError::Inference(e.to_string()))?)
            .map_err(|e| ModelError::Inference(e.to_string()))?;

        let logits = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ModelError::Inference(e.to_string()))?;
        let logits: Vec<f32> = logits.iter().copied().collect();

        if logits.len() != self.labels.len() {
            warn!(
                "Model produced {} logits for {} labels",
                logits.len(),
                self.labels.len()
            );
        }
        debug!("Raw logits: {:?}", logits);

        Ok(scores_from_logits(&logits, &self.labels))
    }
}

/// Softmax over raw logits zipped with the label table, sorted by
/// descending score
fn scores_from_logits(logits: &[f32], labels: &[String]) -> Vec<ClassScore> {
    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exp: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exp.iter().sum();

    let mut scores: Vec<ClassScore> = labels
        .iter()
        .zip(exp.iter())
        .map(|(label, e)| ClassScore {
            label: label.clone(),
            score: if sum > 0.0 { e / sum } else { 0.0 },
        })
        .collect();

    scores.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scores
}
