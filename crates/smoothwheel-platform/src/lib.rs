//! smoothwheel-platform: OS boundary for the scroll engine.
//!
//! This crate provides:
//! - A scroll-wheel event tap that can replace events in flight
//! - Pixel-unit scroll event synthesis and posting
//! - The accessibility permission check and prompt
//!
//! ## Module Structure
//!
//! - `error` - Common error types
//! - `tap` - Event tap backend (native on macOS, unsupported elsewhere)
//! - `permission` - Accessibility trust gate

mod error;
mod permission;
mod tap;

pub use error::{PlatformError, PlatformResult};

pub use permission::{NativePermissionGate, SYSTEM_SETTINGS_URL};

pub use tap::{NativeBackend, SELF_POSTED_MARKER};

#[cfg(target_os = "macos")]
pub use tap::SynthesizedEvent;
