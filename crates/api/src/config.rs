//! Service configuration

use serde::{Deserialize, Serialize};

use model_runtime::Precision;

/// Top-level service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Address the HTTP server binds to
    pub listen_addr: String,
    /// Model runtime configuration
    pub model: ModelConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            model: ModelConfig::default(),
        }
    }
}

/// Model runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory holding per-model subdirectories with ONNX files
    pub model_dir: String,
    /// Model identifier (subdirectory under `model_dir`)
    pub model_id: String,
    /// Weight precision used for every acquisition attempt
    pub precision: Precision,
    /// Output class labels, in model output order
    pub labels: Vec<String>,
    /// Per-call inference timeout (milliseconds)
    pub inference_timeout_ms: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_dir: "models".to_string(),
            model_id: "meme-classifier".to_string(),
            precision: Precision::Int8,
            labels: vec!["not meme".to_string(), "meme".to_string()],
            inference_timeout_ms: 30_000,
        }
    }
}

impl AppConfig {
    /// Load from an optional `memescan.toml` plus `MEMESCAN_*` environment
    /// overrides
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("memescan").required(false))
            .add_source(config::Environment::with_prefix("MEMESCAN").separator("__"))
            .build()?
            .try_deserialize()
    }
}
