//! Classification engine
//!
//! Wraps the shared model runtime with latency measurement, raw-output
//! validation, and safe-default degradation for per-image failures. Once
//! the model is loaded, classification is total: one bad image never aborts
//! a batch or surfaces an error to the caller.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, warn};

use model_runtime::{ImageSource, ModelError, ModelRuntime};

use crate::decision;

/// Default per-call inference timeout
pub const DEFAULT_INFERENCE_TIMEOUT: Duration = Duration::from_secs(30);

/// Final classification for one image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub is_meme: bool,
    /// Raw meme-class score (0.0 to 1.0)
    pub confidence: f32,
    /// Wall time spent in inference (milliseconds)
    pub inference_time_ms: u64,
}

/// Why a classification degraded to the safe default
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradeReason {
    /// Backend returned no class scores
    EmptyOutput,
    /// Backend call failed or panicked
    BackendError,
    /// Per-call timeout expired
    Timeout,
}

/// A classification outcome, before collapsing to the external contract
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The decision algorithm ran on valid backend output
    Classified(ClassificationResult),
    /// Inference could not produce a usable result
    Degraded {
        result: ClassificationResult,
        reason: DegradeReason,
    },
}

impl Outcome {
    /// Collapse to the plain result callers consume
    pub fn into_result(self) -> ClassificationResult {
        match self {
            Outcome::Classified(result) => result,
            Outcome::Degraded { result, .. } => result,
        }
    }
}

fn safe_default(inference_time_ms: u64) -> ClassificationResult {
    ClassificationResult {
        is_meme: false,
        confidence: 0.0,
        inference_time_ms,
    }
}

/// Meme classification engine over the shared model runtime
///
/// Cheap to clone; clones share the runtime.
#[derive(Clone)]
pub struct Classifier {
    runtime: Arc<ModelRuntime>,
    inference_timeout: Duration,
}

impl Classifier {
    /// Create an engine over a shared runtime
    pub fn new(runtime: Arc<ModelRuntime>) -> Self {
        Self {
            runtime,
            inference_timeout: DEFAULT_INFERENCE_TIMEOUT,
        }
    }

    /// Override the per-call inference timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.inference_timeout = timeout;
        self
    }

    /// Classify a single image
    ///
    /// Fails only when the model is not loaded; that is a caller contract
    /// violation and is never defaulted. Failures local to the image itself
    /// (backend error, malformed output, timeout) degrade to the safe
    /// default instead of surfacing.
    pub async fn classify_one(
        &self,
        image: ImageSource,
    ) -> Result<ClassificationResult, ModelError> {
        self.classify_one_outcome(image)
            .await
            .map(Outcome::into_result)
    }

    /// Like [`Classifier::classify_one`], but keeps the degraded/classified
    /// distinction for call sites that need it
    pub async fn classify_one_outcome(&self, image: ImageSource) -> Result<Outcome, ModelError> {
        let session = self.runtime.session()?;

        let start = Instant::now();
        let infer = tokio::task::spawn_blocking(move || session.infer(&image));
        let raw = tokio::time::timeout(self.inference_timeout, infer).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let outcome = match raw {
            Err(_) => {
                warn!("Inference timed out after {}ms", elapsed_ms);
                Outcome::Degraded {
                    result: safe_default(elapsed_ms),
                    reason: DegradeReason::Timeout,
                }
            }
            Ok(Err(e)) => {
                warn!("Inference task failed: {}", e);
                Outcome::Degraded {
                    result: safe_default(elapsed_ms),
                    reason: DegradeReason::BackendError,
                }
            }
            Ok(Ok(Err(e))) => {
                warn!("Inference failed: {}", e);
                Outcome::Degraded {
                    result: safe_default(elapsed_ms),
                    reason: DegradeReason::BackendError,
                }
            }
            Ok(Ok(Ok(raw))) if raw.is_empty() => {
                warn!("Backend returned no class scores");
                Outcome::Degraded {
                    result: safe_default(elapsed_ms),
                    reason: DegradeReason::EmptyOutput,
                }
            }
            Ok(Ok(Ok(raw))) => {
                let verdict = decision::decide(&raw);
                debug!(
                    "Classified in {}ms: is_meme={} confidence={:.3}",
                    elapsed_ms, verdict.is_meme, verdict.confidence
                );
                Outcome::Classified(ClassificationResult {
                    is_meme: verdict.is_meme,
                    confidence: verdict.confidence,
                    inference_time_ms: elapsed_ms,
                })
            }
        };

        Ok(outcome)
    }

    /// Classify a batch of images concurrently
    ///
    /// Output order and length always match the input. A readiness
    /// violation fails the whole batch before any inference begins;
    /// anything after that resolves per slot, falling back to the safe
    /// default.
    pub async fn classify_batch(
        &self,
        images: Vec<ImageSource>,
    ) -> Result<Vec<ClassificationResult>, ModelError> {
        self.runtime.session()?;

        if images.is_empty() {
            return Ok(Vec::new());
        }

        let handles: Vec<_> = images
            .into_iter()
            .map(|image| {
                let engine = self.clone();
                tokio::spawn(async move { engine.classify_one(image).await })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            let result = match handle.await {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => {
                    // Readiness was checked up front; a slot that still
                    // fails resolves instead of aborting the rest.
                    warn!("Batch slot failed: {}", e);
                    safe_default(0)
                }
                Err(e) => {
                    warn!("Batch task join failed: {}", e);
                    safe_default(0)
                }
            };
            results.push(result);
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_runtime::{
        ClassScore, DeviceKind, InferenceBackend, InferenceSession, Precision,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FnSession<F>(F);

    impl<F> InferenceSession for FnSession<F>
    where
        F: Fn(&ImageSource) -> Result<Vec<ClassScore>, ModelError> + Send + Sync,
    {
        fn device(&self) -> DeviceKind {
            DeviceKind::Fallback
        }

        fn infer(&self, image: &ImageSource) -> Result<Vec<ClassScore>, ModelError> {
            (self.0)(image)
        }
    }

    struct FnBackend<F>(Arc<FnSession<F>>);

    impl<F> InferenceBackend for FnBackend<F>
    where
        F: Fn(&ImageSource) -> Result<Vec<ClassScore>, ModelError> + Send + Sync + 'static,
    {
        fn device(&self) -> DeviceKind {
            DeviceKind::Fallback
        }

        fn acquire(
            &self,
            _model_id: &str,
            _precision: Precision,
        ) -> Result<Arc<dyn InferenceSession>, ModelError> {
            Ok(self.0.clone())
        }
    }

    fn raw(meme: f32, not_meme: f32) -> Vec<ClassScore> {
        vec![
            ClassScore {
                label: "meme".to_string(),
                score: meme,
            },
            ClassScore {
                label: "not meme".to_string(),
                score: not_meme,
            },
        ]
    }

    async fn loaded_classifier<F>(infer: F) -> Classifier
    where
        F: Fn(&ImageSource) -> Result<Vec<ClassScore>, ModelError> + Send + Sync + 'static,
    {
        let backend = FnBackend(Arc::new(FnSession(infer)));
        let runtime = Arc::new(ModelRuntime::with_backends(
            "meme-test",
            Precision::Int8,
            vec![Box::new(backend)],
        ));
        runtime.load().await.unwrap();
        Classifier::new(runtime)
    }

    fn bytes(data: &[u8]) -> ImageSource {
        ImageSource::Bytes(data.to_vec())
    }

    #[tokio::test]
    async fn classify_before_load_is_a_contract_error() {
        let runtime = Arc::new(ModelRuntime::with_backends(
            "meme-test",
            Precision::Int8,
            vec![],
        ));
        let engine = Classifier::new(runtime);

        let result = engine.classify_one(bytes(&[0])).await;
        assert!(matches!(result, Err(ModelError::NotLoaded)));
    }

    #[tokio::test]
    async fn valid_output_runs_the_decision() {
        let engine = loaded_classifier(|_| Ok(raw(0.82, 0.18))).await;

        let result = engine.classify_one(bytes(&[0])).await.unwrap();
        assert!(result.is_meme);
        assert_eq!(result.confidence, 0.82);
    }

    #[tokio::test]
    async fn backend_error_degrades_to_safe_default() {
        let engine =
            loaded_classifier(|_| Err(ModelError::Inference("tensor shape".into()))).await;

        let outcome = engine.classify_one_outcome(bytes(&[0])).await.unwrap();
        match outcome {
            Outcome::Degraded { result, reason } => {
                assert_eq!(reason, DegradeReason::BackendError);
                assert!(!result.is_meme);
                assert_eq!(result.confidence, 0.0);
            }
            Outcome::Classified(_) => panic!("expected degraded outcome"),
        }
    }

    #[tokio::test]
    async fn empty_output_degrades_to_safe_default() {
        let engine = loaded_classifier(|_| Ok(vec![])).await;

        let outcome = engine.classify_one_outcome(bytes(&[0])).await.unwrap();
        assert!(matches!(
            outcome,
            Outcome::Degraded {
                reason: DegradeReason::EmptyOutput,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn backend_panic_degrades_to_safe_default() {
        let engine = loaded_classifier(|_| panic!("backend blew up")).await;

        let result = engine.classify_one(bytes(&[0])).await.unwrap();
        assert!(!result.is_meme);
        assert_eq!(result.confidence, 0.0);
    }

    #[tokio::test]
    async fn timeout_degrades_to_safe_default() {
        let engine = loaded_classifier(|_| {
            std::thread::sleep(Duration::from_millis(300));
            Ok(raw(0.9, 0.1))
        })
        .await
        .with_timeout(Duration::from_millis(50));

        let outcome = engine.classify_one_outcome(bytes(&[0])).await.unwrap();
        match outcome {
            Outcome::Degraded { result, reason } => {
                assert_eq!(reason, DegradeReason::Timeout);
                assert!(result.inference_time_ms >= 50);
            }
            Outcome::Classified(_) => panic!("expected timeout outcome"),
        }
    }

    #[tokio::test]
    async fn empty_batch_makes_no_inference_calls() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let engine = loaded_classifier(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(raw(0.9, 0.1))
        })
        .await;

        let results = engine.classify_batch(vec![]).await.unwrap();
        assert!(results.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn batch_before_load_fails_without_inference() {
        let runtime = Arc::new(ModelRuntime::with_backends(
            "meme-test",
            Precision::Int8,
            vec![],
        ));
        let engine = Classifier::new(runtime);

        let result = engine.classify_batch(vec![bytes(&[0]), bytes(&[1])]).await;
        assert!(matches!(result, Err(ModelError::NotLoaded)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn batch_preserves_input_order() {
        // Each payload carries its meme percentage and a delay; earlier
        // slots sleep longer, so completion order inverts input order.
        let engine = loaded_classifier(|image| {
            let ImageSource::Bytes(bytes) = image else {
                return Err(ModelError::InvalidImage("expected bytes".into()));
            };
            std::thread::sleep(Duration::from_millis(bytes[1] as u64));
            let meme = bytes[0] as f32 / 100.0;
            Ok(raw(meme, 1.0 - meme))
        })
        .await;

        let images = vec![
            bytes(&[90, 120]),
            bytes(&[85, 60]),
            bytes(&[95, 10]),
        ];
        let results = engine.classify_batch(images).await.unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].confidence, 0.90);
        assert_eq!(results[1].confidence, 0.85);
        assert_eq!(results[2].confidence, 0.95);
    }

    #[tokio::test]
    async fn batch_absorbs_per_item_failures() {
        let engine = loaded_classifier(|image| {
            let ImageSource::Bytes(bytes) = image else {
                return Err(ModelError::InvalidImage("expected bytes".into()));
            };
            if bytes[0] == 0xFF {
                Err(ModelError::Inference("corrupt image".into()))
            } else {
                Ok(raw(0.9, 0.1))
            }
        })
        .await;

        let results = engine
            .classify_batch(vec![bytes(&[1]), bytes(&[0xFF]), bytes(&[2])])
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert!(results[0].is_meme);
        assert!(!results[1].is_meme);
        assert_eq!(results[1].confidence, 0.0);
        assert!(results[2].is_meme);
    }

    #[test]
    fn outcome_collapses_to_the_same_shape() {
        let degraded = Outcome::Degraded {
            result: safe_default(7),
            reason: DegradeReason::EmptyOutput,
        };
        assert_eq!(degraded.into_result(), safe_default(7));
    }
}
