//! macOS scroll tap via CGEventTap.
//!
//! Each install spawns a thread that owns the tap and its CFRunLoop. The
//! handler pointer is handed to the callback as `user_info` and stays alive
//! until the run loop has exited and the tap has been released.

use super::{classify, scroll_event_mask, RawScroll, SELF_POSTED_MARKER};
use crate::error::PlatformError;
use core_foundation::base::{CFRelease, CFRetain, CFTypeRef};
use core_foundation::runloop::{kCFRunLoopCommonModes, kCFRunLoopDefaultMode};
use core_graphics::event::{CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement};
use crossbeam_channel::{bounded, Sender};
use smoothwheel_core::{
    Disposition, EngineError, EngineResult, PixelDelta, TapBackend, TapHandle, TapHandler,
};
use std::ffi::c_void;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

type CGEventRef = *mut c_void;
type CGEventTapProxy = *const c_void;
type CFMachPortRef = *mut c_void;

const TAP_LOCATION_HID: u32 = CGEventTapLocation::HID as u32;
const TAP_PLACEMENT_HEAD_INSERT: u32 = CGEventTapPlacement::HeadInsertEventTap as u32;
const TAP_OPTION_DEFAULT: u32 = CGEventTapOptions::Default as u32;

const FIELD_SCROLL_DELTA_AXIS_1: u32 = 11;
const FIELD_SCROLL_DELTA_AXIS_2: u32 = 12;
const FIELD_SOURCE_USER_DATA: u32 = 42;
const FIELD_SCROLL_IS_CONTINUOUS: u32 = 88;

const SCROLL_UNIT_PIXEL: u32 = 0;

/// How long one run-loop pass may block before the stop flag is rechecked.
const RUN_LOOP_SLICE_SECS: f64 = 0.25;

type TapCallback = extern "C" fn(CGEventTapProxy, u32, CGEventRef, *mut c_void) -> CGEventRef;

#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGEventTapCreate(
        tap: u32,
        place: u32,
        options: u32,
        events_of_interest: u64,
        callback: TapCallback,
        user_info: *mut c_void,
    ) -> CFMachPortRef;
    fn CGEventTapEnable(tap: CFMachPortRef, enable: bool);
    fn CGEventTapIsEnabled(tap: CFMachPortRef) -> bool;

    fn CGEventGetDoubleValueField(event: CGEventRef, field: u32) -> f64;
    fn CGEventGetIntegerValueField(event: CGEventRef, field: u32) -> i64;
    fn CGEventSetIntegerValueField(event: CGEventRef, field: u32, value: i64);

    fn CGEventCreateScrollWheelEvent2(
        source: *const c_void,
        units: u32,
        wheel_count: u32,
        wheel1: i32,
        wheel2: i32,
        wheel3: i32,
    ) -> CGEventRef;
    fn CGEventPost(tap: u32, event: CGEventRef);
}

#[link(name = "CoreFoundation", kind = "framework")]
extern "C" {
    fn CFMachPortCreateRunLoopSource(
        allocator: CFTypeRef,
        port: CFMachPortRef,
        order: isize,
    ) -> CFTypeRef;
    fn CFRunLoopGetCurrent() -> CFTypeRef;
    fn CFRunLoopAddSource(rl: CFTypeRef, source: CFTypeRef, mode: CFTypeRef);
    fn CFRunLoopRunInMode(
        mode: CFTypeRef,
        seconds: f64,
        return_after_source_handled: bool,
    ) -> i32;
    fn CFRunLoopStop(rl: CFTypeRef);
}

/// A scroll event created by us. Released on drop unless handed to the OS.
pub struct SynthesizedEvent(NonNull<c_void>);

// A freshly created CGEvent is not shared with anything until posted or returned.
unsafe impl Send for SynthesizedEvent {}

impl SynthesizedEvent {
    fn scroll(delta: PixelDelta) -> Option<Self> {
        let raw = unsafe {
            CGEventCreateScrollWheelEvent2(ptr::null(), SCROLL_UNIT_PIXEL, 2, delta.y, delta.x, 0)
        };
        let event = NonNull::new(raw).map(Self)?;
        unsafe {
            CGEventSetIntegerValueField(event.as_ptr(), FIELD_SOURCE_USER_DATA, SELF_POSTED_MARKER);
        }
        Some(event)
    }

    fn as_ptr(&self) -> CGEventRef {
        self.0.as_ptr()
    }

    /// Give up ownership; the event system releases it.
    fn into_raw(self) -> CGEventRef {
        let raw = self.as_ptr();
        std::mem::forget(self);
        raw
    }
}

impl Drop for SynthesizedEvent {
    fn drop(&mut self) {
        unsafe { CFRelease(self.as_ptr() as CFTypeRef) };
    }
}

/// Retained CF object pointer that may cross threads.
#[derive(Clone, Copy)]
struct CfPtr(CFTypeRef);

unsafe impl Send for CfPtr {}
unsafe impl Sync for CfPtr {}

impl CfPtr {
    fn retain(raw: CFTypeRef) -> Self {
        unsafe { CFRetain(raw) };
        Self(raw)
    }
}

struct TapRefs {
    port: CfPtr,
    run_loop: CfPtr,
}

struct TapContext {
    handler: Arc<dyn TapHandler<SynthesizedEvent>>,
    stopping: Arc<AtomicBool>,
}

/// CGEventTap-backed [`TapBackend`].
#[derive(Debug, Default)]
pub struct MacTapBackend;

impl MacTapBackend {
    pub fn new() -> Self {
        Self
    }
}

impl TapBackend for MacTapBackend {
    type Event = SynthesizedEvent;

    fn install(
        &self,
        handler: Arc<dyn TapHandler<SynthesizedEvent>>,
    ) -> EngineResult<Arc<dyn TapHandle>> {
        let stopping = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = bounded(1);

        let context = TapContext {
            handler,
            stopping: stopping.clone(),
        };
        let thread = thread::Builder::new()
            .name("smoothwheel-tap".into())
            .spawn(move || run_tap_loop(context, ready_tx))
            .map_err(|e| PlatformError::ThreadSpawn(e.to_string()))?;

        let refs = match ready_rx.recv() {
            Ok(Ok(refs)) => refs,
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e.into());
            }
            Err(_) => {
                let _ = thread.join();
                return Err(PlatformError::TapThreadGone.into());
            }
        };

        Ok(Arc::new(MacTapHandle {
            port: refs.port,
            run_loop: refs.run_loop,
            stopping,
            thread: Mutex::new(Some(thread)),
        }))
    }

    fn synthesize(&self, delta: PixelDelta) -> Option<SynthesizedEvent> {
        SynthesizedEvent::scroll(delta)
    }

    fn post(&self, delta: PixelDelta) -> EngineResult<()> {
        let event = SynthesizedEvent::scroll(delta).ok_or(PlatformError::EventCreateFailed)?;
        unsafe { CGEventPost(TAP_LOCATION_HID, event.as_ptr()) };
        Ok(())
    }
}

struct MacTapHandle {
    port: CfPtr,
    run_loop: CfPtr,
    stopping: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl TapHandle for MacTapHandle {
    fn rearm(&self) -> EngineResult<()> {
        if self.stopping.load(Ordering::SeqCst) {
            return Ok(());
        }

        let enabled = unsafe {
            CGEventTapEnable(self.port.0 as CFMachPortRef, true);
            CGEventTapIsEnabled(self.port.0 as CFMachPortRef)
        };
        if enabled {
            Ok(())
        } else {
            Err(EngineError::HookDisabledByWatchdog(
                "tap still disabled after CGEventTapEnable".into(),
            ))
        }
    }

    fn uninstall(&self) {
        if self.stopping.swap(true, Ordering::SeqCst) {
            return;
        }

        unsafe { CFRunLoopStop(self.run_loop.0) };

        let thread = self
            .thread
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(thread) = thread {
            if thread.thread().id() == thread::current().id() {
                warn!("event tap uninstalled from its own callback, not joining");
                return;
            }
            if thread.join().is_err() {
                error!("event tap thread panicked");
            }
        }
        debug!("event tap uninstalled");
    }
}

impl Drop for MacTapHandle {
    fn drop(&mut self) {
        self.uninstall();
        unsafe {
            CFRelease(self.port.0);
            CFRelease(self.run_loop.0);
        }
    }
}

/// Disables and releases the tap on drop.
struct EventTapGuard(CFMachPortRef);

impl Drop for EventTapGuard {
    fn drop(&mut self) {
        unsafe {
            CGEventTapEnable(self.0, false);
            CFRelease(self.0 as CFTypeRef);
        }
    }
}

/// Releases the run loop source on drop.
struct RunLoopSourceGuard(CFTypeRef);

impl Drop for RunLoopSourceGuard {
    fn drop(&mut self) {
        unsafe { CFRelease(self.0) };
    }
}

/// Frees the callback context on drop. Declared before the tap guard so the
/// tap is gone first.
struct ContextGuard(*mut TapContext);

impl Drop for ContextGuard {
    fn drop(&mut self) {
        unsafe { drop(Box::from_raw(self.0)) };
    }
}

fn run_tap_loop(context: TapContext, ready: Sender<Result<TapRefs, PlatformError>>) {
    let stopping = context.stopping.clone();
    let context_ptr = Box::into_raw(Box::new(context));
    let _context_guard = ContextGuard(context_ptr);

    let port = unsafe {
        CGEventTapCreate(
            TAP_LOCATION_HID,
            TAP_PLACEMENT_HEAD_INSERT,
            TAP_OPTION_DEFAULT,
            scroll_event_mask(),
            tap_callback,
            context_ptr as *mut c_void,
        )
    };
    if port.is_null() {
        error!("Failed to create scroll event tap");
        let _ = ready.send(Err(PlatformError::TapCreateFailed));
        return;
    }
    let _tap_guard = EventTapGuard(port);

    let source = unsafe { CFMachPortCreateRunLoopSource(ptr::null(), port, 0) };
    if source.is_null() {
        error!("Failed to create run loop source");
        let _ = ready.send(Err(PlatformError::RunLoopSourceFailed));
        return;
    }
    let _source_guard = RunLoopSourceGuard(source);

    let run_loop = unsafe { CFRunLoopGetCurrent() };
    unsafe {
        CFRunLoopAddSource(run_loop, source, kCFRunLoopCommonModes as CFTypeRef);
        CGEventTapEnable(port, true);
    }

    let refs = TapRefs {
        port: CfPtr::retain(port as CFTypeRef),
        run_loop: CfPtr::retain(run_loop),
    };
    if ready.send(Ok(refs)).is_err() {
        return;
    }

    info!("Scroll event tap running");
    while !stopping.load(Ordering::SeqCst) {
        unsafe {
            CFRunLoopRunInMode(kCFRunLoopDefaultMode as CFTypeRef, RUN_LOOP_SLICE_SECS, false);
        }
    }
    info!("Scroll event tap stopped");
}

extern "C" fn tap_callback(
    _proxy: CGEventTapProxy,
    event_type: u32,
    event: CGEventRef,
    user_info: *mut c_void,
) -> CGEventRef {
    if user_info.is_null() {
        return event;
    }
    let context = unsafe { &*(user_info as *const TapContext) };
    if context.stopping.load(Ordering::Relaxed) {
        return event;
    }

    let Some(tap_event) = classify(event_type, || read_scroll(event)) else {
        return event;
    };

    match catch_unwind(AssertUnwindSafe(|| context.handler.handle(tap_event))) {
        Ok(Disposition::PassThrough) => event,
        Ok(Disposition::Replace(replacement)) => replacement.into_raw(),
        Err(_) => {
            error!("scroll handler panicked, passing event through");
            event
        }
    }
}

fn read_scroll(event: CGEventRef) -> RawScroll {
    unsafe {
        RawScroll {
            user_data: CGEventGetIntegerValueField(event, FIELD_SOURCE_USER_DATA),
            delta_y: CGEventGetDoubleValueField(event, FIELD_SCROLL_DELTA_AXIS_1),
            delta_x: CGEventGetDoubleValueField(event, FIELD_SCROLL_DELTA_AXIS_2),
            continuous: CGEventGetIntegerValueField(event, FIELD_SCROLL_IS_CONTINUOUS),
        }
    }
}
