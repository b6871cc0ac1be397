//! Error types for the scroll engine.

use thiserror::Error;

/// Engine-level failures.
///
/// None of these escape the engine's public lifecycle calls; they are logged and
/// kept as [`ScrollEngine::last_error`](crate::ScrollEngine::last_error).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("accessibility permission not granted")]
    PermissionDenied,
    #[error("event tap installation failed: {0}")]
    HookInstallationFailed(String),
    #[error("event tap could not be re-enabled: {0}")]
    HookDisabledByWatchdog(String),
    #[error("failed to synthesize scroll event")]
    SynthesisFailed,
    #[error("failed to post scroll event: {0}")]
    PostFailed(String),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
