//! Accessibility permission gate.
//!
//! Platform implementations:
//! - macOS: `AXIsProcessTrustedWithOptions` (`macos.rs`)
//! - Others: always trusted; installation fails later with a clearer reason (`unsupported.rs`)

use tracing::{error, info};

#[cfg(target_os = "macos")]
mod macos;

#[cfg(not(target_os = "macos"))]
mod unsupported;

#[cfg(target_os = "macos")]
pub use macos::MacPermissionGate as NativePermissionGate;

#[cfg(not(target_os = "macos"))]
pub use unsupported::UnsupportedPermissionGate as NativePermissionGate;

/// Deep link to Privacy & Security > Accessibility.
pub const SYSTEM_SETTINGS_URL: &str =
    "x-apple.systempreferences:com.apple.preference.security?Privacy_Accessibility";

#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
pub(crate) fn open_settings_pane() {
    match open::that(SYSTEM_SETTINGS_URL) {
        Ok(()) => info!("Opened accessibility settings"),
        Err(e) => error!(error = %e, "failed to open accessibility settings"),
    }
}
