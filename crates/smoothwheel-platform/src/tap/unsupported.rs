//! Fallback for platforms without a scroll tap implementation.

use crate::error::PlatformError;
use smoothwheel_core::{EngineResult, PixelDelta, TapBackend, TapHandle, TapHandler};
use std::sync::Arc;
use tracing::warn;

/// Backend whose install always fails, leaving the engine stopped.
#[derive(Debug, Default)]
pub struct UnsupportedBackend;

impl UnsupportedBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Placeholder event type; never constructed.
#[derive(Debug)]
pub enum NoEvent {}

impl TapBackend for UnsupportedBackend {
    type Event = NoEvent;

    fn install(&self, _handler: Arc<dyn TapHandler<NoEvent>>) -> EngineResult<Arc<dyn TapHandle>> {
        warn!(
            os = std::env::consts::OS,
            "scroll interception is not supported on this platform"
        );
        Err(PlatformError::NotSupported.into())
    }

    fn synthesize(&self, _delta: PixelDelta) -> Option<NoEvent> {
        None
    }

    fn post(&self, _delta: PixelDelta) -> EngineResult<()> {
        Err(smoothwheel_core::EngineError::PostFailed(
            PlatformError::NotSupported.to_string(),
        ))
    }
}
