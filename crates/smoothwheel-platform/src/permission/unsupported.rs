use smoothwheel_core::PermissionGate;
use tracing::info;

/// Gate for platforms with no accessibility permission model.
#[derive(Debug, Default)]
pub struct UnsupportedPermissionGate;

impl UnsupportedPermissionGate {
    pub fn new() -> Self {
        Self
    }
}

impl PermissionGate for UnsupportedPermissionGate {
    fn is_trusted(&self) -> bool {
        true
    }

    fn request_prompt(&self) {
        info!("no accessibility permission to request on this platform");
    }

    fn open_system_settings(&self) {
        info!("no accessibility settings pane on this platform");
    }
}
