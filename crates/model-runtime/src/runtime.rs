//! Shared model runtime: load-once lifecycle with device fallback

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::backend::{AcquireAttempt, InferenceBackend, InferenceSession};
use crate::{DeviceKind, ModelError, ModelStatus, OrtBackend, Precision};

#[derive(Default)]
struct RuntimeState {
    status: ModelStatus,
    session: Option<Arc<dyn InferenceSession>>,
    last_load: Vec<AcquireAttempt>,
}

/// Context object owning the shared model session and its status
///
/// Constructed once by the application and handed to consumers by
/// reference. `load` is single-flighted; classification-side access goes
/// through [`ModelRuntime::session`], which is read-only and safe to call
/// concurrently once loaded.
pub struct ModelRuntime {
    model_id: String,
    precision: Precision,
    backends: Vec<Box<dyn InferenceBackend>>,
    state: RwLock<RuntimeState>,
    load_guard: Mutex<()>,
}

impl ModelRuntime {
    /// Runtime with the standard ort backend chain: CUDA first, CPU fallback
    pub fn new(
        model_dir: impl Into<PathBuf>,
        model_id: impl Into<String>,
        precision: Precision,
        labels: Vec<String>,
    ) -> Self {
        let model_dir = model_dir.into();
        let backends: Vec<Box<dyn InferenceBackend>> = vec![
            Box::new(OrtBackend::new(
                DeviceKind::Accelerated,
                model_dir.clone(),
                labels.clone(),
            )),
            Box::new(OrtBackend::new(DeviceKind::Fallback, model_dir, labels)),
        ];
        Self::with_backends(model_id, precision, backends)
    }

    /// Runtime over an explicit backend chain, tried in order
    pub fn with_backends(
        model_id: impl Into<String>,
        precision: Precision,
        backends: Vec<Box<dyn InferenceBackend>>,
    ) -> Self {
        Self {
            model_id: model_id.into(),
            precision,
            backends,
            state: RwLock::new(RuntimeState::default()),
            load_guard: Mutex::new(()),
        }
    }

    /// Acquire a session if none exists yet
    ///
    /// Idempotent: a runtime that is already ready returns without touching
    /// any backend. Concurrent callers serialize on the load guard, so at
    /// most one acquisition chain runs at a time. Failure of the accelerated
    /// backend is expected and non-fatal; only exhausting the whole chain
    /// fails the load.
    pub async fn load(&self) -> Result<(), ModelError> {
        let _guard = self.load_guard.lock().await;

        if self.is_ready() {
            debug!("Model {} already loaded", self.model_id);
            return Ok(());
        }

        info!(
            "Loading model {} ({})",
            self.model_id,
            self.precision.as_str()
        );
        self.set_status(ModelStatus::Downloading);

        let mut attempts = Vec::with_capacity(self.backends.len());
        let mut acquired: Option<Arc<dyn InferenceSession>> = None;

        for backend in &self.backends {
            match backend.acquire(&self.model_id, self.precision) {
                Ok(session) => {
                    attempts.push(AcquireAttempt {
                        device: backend.device(),
                        ok: true,
                        error: None,
                    });
                    acquired = Some(session);
                    break;
                }
                Err(e) => {
                    warn!(
                        "{} backend unavailable for {}: {}",
                        backend.device().as_str(),
                        self.model_id,
                        e
                    );
                    attempts.push(AcquireAttempt {
                        device: backend.device(),
                        ok: false,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let mut state = self.state.write().expect("runtime state lock poisoned");
        state.last_load = attempts;

        match acquired {
            Some(session) => {
                info!(
                    "Model {} ready on {} backend",
                    self.model_id,
                    session.device().as_str()
                );
                state.session = Some(session);
                state.status = ModelStatus::Ready;
                Ok(())
            }
            None => {
                error!("All backends failed to load model {}", self.model_id);
                state.status = ModelStatus::Error;
                Err(ModelError::LoadFailed {
                    model_id: self.model_id.clone(),
                })
            }
        }
    }

    /// Current lifecycle status
    pub fn status(&self) -> ModelStatus {
        self.state
            .read()
            .expect("runtime state lock poisoned")
            .status
    }

    /// True iff a session is set and the status is `Ready`
    pub fn is_ready(&self) -> bool {
        let state = self.state.read().expect("runtime state lock poisoned");
        state.session.is_some() && state.status == ModelStatus::Ready
    }

    /// The shared session, or `NotLoaded` when no load has succeeded
    pub fn session(&self) -> Result<Arc<dyn InferenceSession>, ModelError> {
        self.state
            .read()
            .expect("runtime state lock poisoned")
            .session
            .clone()
            .ok_or(ModelError::NotLoaded)
    }

    /// Per-attempt report of the most recent load
    pub fn last_load_report(&self) -> Vec<AcquireAttempt> {
        self.state
            .read()
            .expect("runtime state lock poisoned")
            .last_load
            .clone()
    }

    /// Model identifier this runtime serves
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    fn set_status(&self, status: ModelStatus) {
        self.state
            .write()
            .expect("runtime state lock poisoned")
            .status = status;
    }
}
