//! Execution device and weight precision selection

use serde::{Deserialize, Serialize};

/// Execution backend kind, in fallback preference order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// Hardware-accelerated execution provider (CUDA)
    Accelerated,
    /// Universal CPU execution
    Fallback,
}

impl DeviceKind {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Accelerated => "accelerated",
            DeviceKind::Fallback => "fallback",
        }
    }
}

/// Model weight precision
///
/// Every acquisition attempt of one load uses the same precision, so the
/// accelerated and fallback sessions run identical weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    /// Quantized 8-bit weights
    #[default]
    Int8,
    /// Full-precision 32-bit weights
    Fp32,
}

impl Precision {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Precision::Int8 => "int8",
            Precision::Fp32 => "fp32",
        }
    }

    /// Model file name for this precision
    pub fn model_file(&self) -> &'static str {
        match self {
            Precision::Int8 => "model_quantized.onnx",
            Precision::Fp32 => "model.onnx",
        }
    }
}
