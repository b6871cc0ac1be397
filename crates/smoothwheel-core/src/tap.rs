//! Seams between the engine and the platform layer.
//!
//! The platform crate owns the OS callback convention. It turns each intercepted
//! event into a [`TapEvent`], hands it to the registered [`TapHandler`], and turns
//! the returned [`Disposition`] back into whatever the OS expects.

use crate::{EngineResult, PixelDelta, ScrollSample};
use std::sync::Arc;

/// An intercepted event, as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TapEvent {
    /// A scroll-wheel event from a device.
    Scroll(ScrollSample),
    /// The OS disabled the tap because the callback was too slow.
    DisabledByTimeout,
    /// The OS disabled the tap in response to user input.
    DisabledByUserInput,
}

/// What the hook should do with the original event.
#[derive(Debug)]
pub enum Disposition<E> {
    /// Deliver the original event unchanged.
    PassThrough,
    /// Deliver this synthesized event instead.
    Replace(E),
}

impl<E> Disposition<E> {
    pub fn is_pass_through(&self) -> bool {
        matches!(self, Disposition::PassThrough)
    }
}

/// Receives intercepted events on the hook thread. Must return quickly.
pub trait TapHandler<E>: Send + Sync {
    fn handle(&self, event: TapEvent) -> Disposition<E>;
}

/// A live interception hook.
pub trait TapHandle: Send + Sync {
    /// Re-enable the hook after the OS disabled it.
    fn rearm(&self) -> EngineResult<()>;

    /// Disable and release the hook. After this returns the handler is never
    /// called again. Calling it twice is a no-op.
    fn uninstall(&self);
}

/// Platform binding for scroll interception and event synthesis.
pub trait TapBackend: Send + Sync + 'static {
    /// Synthesized event returned from the hook in place of the original.
    type Event: Send + 'static;

    /// Install a hook for scroll-wheel events only, delivering to `handler`.
    fn install(&self, handler: Arc<dyn TapHandler<Self::Event>>)
        -> EngineResult<Arc<dyn TapHandle>>;

    /// Build a pixel-unit scroll event, or `None` if the platform refuses.
    fn synthesize(&self, delta: PixelDelta) -> Option<Self::Event>;

    /// Post a pixel-unit scroll event straight into the OS event stream,
    /// bypassing this backend's own hook.
    fn post(&self, delta: PixelDelta) -> EngineResult<()>;
}

/// Authorization to observe and modify system input.
pub trait PermissionGate: Send + Sync {
    /// Non-prompting check.
    fn is_trusted(&self) -> bool;

    /// Ask the OS to show its permission prompt.
    fn request_prompt(&self);

    /// Open the system settings pane where the permission is granted.
    fn open_system_settings(&self);
}
