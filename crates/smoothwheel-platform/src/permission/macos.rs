use super::open_settings_pane;
use core_foundation::base::{CFTypeRef, TCFType};
use core_foundation::boolean::CFBoolean;
use core_foundation::dictionary::CFDictionary;
use core_foundation::string::CFString;
use smoothwheel_core::PermissionGate;
use tracing::{info, warn};

#[link(name = "ApplicationServices", kind = "framework")]
extern "C" {
    fn AXIsProcessTrustedWithOptions(options: CFTypeRef) -> bool;
}

fn is_trusted_with_prompt(prompt: bool) -> bool {
    let key = CFString::new("AXTrustedCheckOptionPrompt");
    let value = if prompt {
        CFBoolean::true_value()
    } else {
        CFBoolean::false_value()
    };
    let options = CFDictionary::from_CFType_pairs(&[(key.as_CFType(), value.as_CFType())]);

    unsafe { AXIsProcessTrustedWithOptions(options.as_concrete_TypeRef() as CFTypeRef) }
}

/// Accessibility trust as reported by the ApplicationServices framework.
#[derive(Debug, Default)]
pub struct MacPermissionGate;

impl MacPermissionGate {
    pub fn new() -> Self {
        Self
    }
}

impl PermissionGate for MacPermissionGate {
    fn is_trusted(&self) -> bool {
        is_trusted_with_prompt(false)
    }

    fn request_prompt(&self) {
        if is_trusted_with_prompt(true) {
            info!("Accessibility permission already granted");
        } else {
            warn!("Accessibility permission requested; restart after granting it");
        }
    }

    fn open_system_settings(&self) {
        open_settings_pane();
    }
}
