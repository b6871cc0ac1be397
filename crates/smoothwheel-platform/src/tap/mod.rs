//! Scroll-wheel event tap.
//!
//! Platform implementations:
//! - macOS: CGEventTap on a dedicated run-loop thread (`macos.rs`)
//! - Others: installation always fails (`unsupported.rs`)

use smoothwheel_core::{ScrollSample, TapEvent};

#[cfg(target_os = "macos")]
mod macos;

#[cfg(not(target_os = "macos"))]
mod unsupported;

#[cfg(target_os = "macos")]
pub use macos::{MacTapBackend as NativeBackend, SynthesizedEvent};

#[cfg(not(target_os = "macos"))]
pub use unsupported::UnsupportedBackend as NativeBackend;

/// CGEventType::ScrollWheel
const EVENT_TYPE_SCROLL_WHEEL: u32 = 22;
/// kCGEventTapDisabledByTimeout
const EVENT_TAP_DISABLED_BY_TIMEOUT: u32 = 0xFFFF_FFFE;
/// kCGEventTapDisabledByUserInput
const EVENT_TAP_DISABLED_BY_USER_INPUT: u32 = 0xFFFF_FFFF;

/// Source user-data tag stamped on every event we create, so the tap lets
/// its own inertia posts through untouched.
pub const SELF_POSTED_MARKER: i64 = 0x534D_5748;

/// Only scroll wheel events. The tap-disabled notifications arrive regardless.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
pub(crate) fn scroll_event_mask() -> u64 {
    1 << EVENT_TYPE_SCROLL_WHEEL
}

/// Scroll fields read off a native event.
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
pub(crate) struct RawScroll {
    pub user_data: i64,
    pub delta_y: f64,
    pub delta_x: f64,
    pub continuous: i64,
}

/// Map a native event type to a [`TapEvent`]. `read` is only called for
/// scroll events. Returns `None` for anything the engine should not see,
/// including events we posted ourselves.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
pub(crate) fn classify(event_type: u32, read: impl FnOnce() -> RawScroll) -> Option<TapEvent> {
    match event_type {
        EVENT_TAP_DISABLED_BY_TIMEOUT => Some(TapEvent::DisabledByTimeout),
        EVENT_TAP_DISABLED_BY_USER_INPUT => Some(TapEvent::DisabledByUserInput),
        EVENT_TYPE_SCROLL_WHEEL => {
            let raw = read();
            if raw.user_data == SELF_POSTED_MARKER {
                return None;
            }
            Some(TapEvent::Scroll(ScrollSample {
                delta_y: raw.delta_y,
                delta_x: raw.delta_x,
                is_continuous: raw.continuous != 0,
            }))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_is_scroll_only() {
        assert_eq!(scroll_event_mask(), 0x0040_0000);
    }

    #[test]
    fn test_classify_disabled_notifications() {
        let read = || -> RawScroll { panic!("fields read for a non-scroll event") };
        assert_eq!(
            classify(0xFFFF_FFFE, read),
            Some(TapEvent::DisabledByTimeout)
        );
        assert_eq!(
            classify(0xFFFF_FFFF, read),
            Some(TapEvent::DisabledByUserInput)
        );
    }

    #[test]
    fn test_classify_scroll() {
        let event = classify(22, || RawScroll {
            delta_y: -2.0,
            delta_x: 0.5,
            continuous: 1,
            ..RawScroll::default()
        });
        assert_eq!(
            event,
            Some(TapEvent::Scroll(ScrollSample::continuous(-2.0, 0.5)))
        );

        let event = classify(22, || RawScroll {
            delta_y: 1.0,
            ..RawScroll::default()
        });
        assert_eq!(event, Some(TapEvent::Scroll(ScrollSample::wheel(1.0, 0.0))));
    }

    #[test]
    fn test_classify_skips_own_events_and_others() {
        let own = classify(22, || RawScroll {
            user_data: SELF_POSTED_MARKER,
            delta_y: 3.0,
            ..RawScroll::default()
        });
        assert_eq!(own, None);
        assert_eq!(classify(5, RawScroll::default), None);
    }
}
