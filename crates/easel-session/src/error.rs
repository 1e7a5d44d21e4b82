//! Engine error taxonomy
//!
//! Every variant here is recovered locally: the session stays usable and
//! the transcript/artifact are never left half-applied. Only the current
//! generation or the current request fails.

use crate::state::SessionPhase;
use easel_artifact::ArtifactError;
use easel_diff::DiffError;
use easel_store::StoreError;

/// Main session engine error type
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Network or HTTP failure; local state preserved
    #[error("transport failure: {0}")]
    Transport(String),

    /// Requested version does not exist; selection unchanged
    #[error("version {index} not found")]
    VersionNotFound {
        /// Requested index
        index: u32,
    },

    /// Diff requested across incompatible variants; no diff rendered
    #[error(transparent)]
    TypeMismatch(#[from] DiffError),

    /// Persistence write failed; flagged, not retried automatically
    #[error("save failed: {0}")]
    SaveFailure(String),

    /// Operation refused while a stream is writing the artifact
    #[error("a stream is in progress")]
    StreamInProgress,

    /// Session phase machine rejected a transition
    #[error("illegal session transition: {from:?} -> {to:?}")]
    IllegalTransition {
        /// Phase the session was in
        from: SessionPhase,
        /// Phase that was requested
        to: SessionPhase,
    },

    /// Artifact store rejected a mutation
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::VersionNotFound { index } => Self::VersionNotFound { index },
            StoreError::Transport(msg) => Self::Transport(msg),
            StoreError::Status { code } => Self::Transport(format!("unexpected status {code}")),
            StoreError::Decode(err) => Self::Transport(format!("decode failure: {err}")),
        }
    }
}
