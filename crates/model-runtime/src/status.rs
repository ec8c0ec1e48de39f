//! Model readiness state machine

use serde::{Deserialize, Serialize};

/// Lifecycle status of the shared model session
///
/// Starts at `Loading`, moves to `Downloading` when a load begins, then to
/// `Ready` or `Error`. Only a fresh load attempt leaves `Error`; `Ready` is
/// terminal apart from idempotent re-loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    /// No load attempted yet
    #[default]
    Loading,
    /// A load is in flight
    Downloading,
    /// Session acquired and usable
    Ready,
    /// Every backend failed to produce a session
    Error,
}

impl ModelStatus {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelStatus::Loading => "loading",
            ModelStatus::Downloading => "downloading",
            ModelStatus::Ready => "ready",
            ModelStatus::Error => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_loading() {
        assert_eq!(ModelStatus::default(), ModelStatus::Loading);
    }

    #[test]
    fn string_representation() {
        assert_eq!(ModelStatus::Downloading.as_str(), "downloading");
        assert_eq!(ModelStatus::Ready.as_str(), "ready");
    }
}
