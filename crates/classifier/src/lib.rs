//! Meme Classification Engine
//!
//! Converts raw two-class inference output into a final meme/not-meme
//! decision with an associated confidence, measuring per-call latency and
//! degrading per-image failures to a safe default.

mod decision;
mod engine;

pub use decision::{decide, Verdict, HIGH_CONFIDENCE, LOW_CONFIDENCE, SMALL_MARGIN};
pub use engine::{
    ClassificationResult, Classifier, DegradeReason, Outcome, DEFAULT_INFERENCE_TIMEOUT,
};
