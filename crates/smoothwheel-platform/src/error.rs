//! Common error types for smoothwheel-platform.

use smoothwheel_core::EngineError;
use thiserror::Error;

/// Platform-level errors.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("not supported on this platform")]
    NotSupported,
    #[error("CGEventTapCreate returned null")]
    TapCreateFailed,
    #[error("failed to create run loop source")]
    RunLoopSourceFailed,
    #[error("failed to spawn tap thread: {0}")]
    ThreadSpawn(String),
    #[error("tap thread exited before reporting")]
    TapThreadGone,
    #[error("failed to create scroll event")]
    EventCreateFailed,
}

/// Result type for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;

impl From<PlatformError> for EngineError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::EventCreateFailed => EngineError::PostFailed(err.to_string()),
            other => EngineError::HookInstallationFailed(other.to_string()),
        }
    }
}
