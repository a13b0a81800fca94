//! Suppressing event tap
//!
//! A second handle on the system event stream, observing scroll and
//! mouse-moved events at the HID insertion point. While the engine owns
//! scrolling it drops untagged scroll events (the driver's own gesture
//! output) and cursor motion; everything else passes untouched.
//!
//! The callback runs synchronously on the tap thread and must decide
//! within the callback: it reads only the mutex-guarded shared cell and
//! never calls back into engine state.

use crate::events::types::TRACKPAL_EVENT_TAG;
use crate::Result;
use parking_lot::Mutex;
use std::sync::Arc;

/// The two fields the tap callback reads without entering the main
/// loop. Guarded by an unfair, non-reentrant mutex; hold it only for
/// the get/set accessors.
#[derive(Debug, Default)]
pub struct SharedState {
    inner: Mutex<SharedFields>,
}

#[derive(Debug, Default, Clone, Copy)]
struct SharedFields {
    actively_scrolling: bool,
    finger_count: u32,
}

impl SharedState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_actively_scrolling(&self) -> bool {
        self.inner.lock().actively_scrolling
    }

    pub fn set_actively_scrolling(&self, value: bool) {
        self.inner.lock().actively_scrolling = value;
    }

    pub fn finger_count(&self) -> u32 {
        self.inner.lock().finger_count
    }

    pub fn set_finger_count(&self, value: u32) {
        self.inner.lock().finger_count = value;
    }
}

/// Event classes the tap observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptKind {
    Scroll,
    MouseMoved,
}

/// Pure suppression decision. A scroll event is dropped iff the engine
/// owns scrolling and the event is not its own (tag mismatch); cursor
/// motion is dropped whenever the engine owns scrolling.
pub fn should_drop_event(kind: InterceptKind, actively_scrolling: bool, user_data_tag: i64) -> bool {
    if !actively_scrolling {
        return false;
    }
    match kind {
        InterceptKind::Scroll => user_data_tag != TRACKPAL_EVENT_TAG,
        InterceptKind::MouseMoved => true,
    }
}

/// Capability over the suppressing tap; owned exclusively by the
/// engine.
pub trait Interceptor: Send {
    fn start(&mut self) -> Result<()>;
    fn stop(&mut self);
    fn is_running(&self) -> bool;
}

#[cfg(target_os = "macos")]
pub use platform::QuartzInterceptor;

#[cfg(target_os = "macos")]
mod platform {
    use super::{should_drop_event, InterceptKind, Interceptor, SharedState};
    use crate::{Error, Result};
    use core_foundation::base::CFRelease;
    use core_foundation::runloop::kCFRunLoopCommonModes;
    use std::ffi::c_void;
    use std::ptr;
    use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};
    use std::sync::Arc;
    use std::thread::{self, JoinHandle};
    use tracing::{debug, error, info, warn};

    type CFTypeRef = *const c_void;
    type CGEventRef = CFTypeRef;
    type CGEventTapProxy = *const c_void;
    type CGEventMask = u64;

    #[repr(u32)]
    #[derive(Copy, Clone)]
    #[allow(dead_code)]
    enum CGEventTapLocation {
        HidEventTap = 0,
        SessionEventTap = 1,
        AnnotatedSessionEventTap = 2,
    }

    #[repr(u32)]
    #[derive(Copy, Clone)]
    #[allow(dead_code)]
    enum CGEventTapPlacement {
        HeadInsertEventTap = 0,
        TailAppendEventTap = 1,
    }

    #[repr(u32)]
    #[derive(Copy, Clone)]
    #[allow(dead_code)]
    enum CGEventTapOptions {
        DefaultTap = 0,
        ListenOnly = 1,
    }

    // CGEventType values the tap observes
    const CG_EVENT_MOUSE_MOVED: u32 = 5;
    const CG_EVENT_SCROLL_WHEEL: u32 = 22;
    const CG_EVENT_TAP_DISABLED_BY_TIMEOUT: u32 = 0xFFFF_FFFE;
    const CG_EVENT_TAP_DISABLED_BY_USER_INPUT: u32 = 0xFFFF_FFFF;

    const CG_EVENT_SOURCE_USER_DATA: u32 = 42;

    fn intercept_mask() -> CGEventMask {
        (1u64 << CG_EVENT_SCROLL_WHEEL) | (1u64 << CG_EVENT_MOUSE_MOVED)
    }

    #[link(name = "CoreGraphics", kind = "framework")]
    extern "C" {
        fn CGEventTapCreate(
            tap: CGEventTapLocation,
            place: CGEventTapPlacement,
            options: CGEventTapOptions,
            events_of_interest: CGEventMask,
            callback: extern "C" fn(CGEventTapProxy, u32, CGEventRef, *mut c_void) -> CGEventRef,
            user_info: *mut c_void,
        ) -> CFTypeRef;

        fn CGEventTapEnable(tap: CFTypeRef, enable: bool);
        fn CGEventGetIntegerValueField(event: CGEventRef, field: u32) -> i64;
    }

    #[link(name = "CoreFoundation", kind = "framework")]
    extern "C" {
        fn CFMachPortCreateRunLoopSource(
            allocator: CFTypeRef,
            port: CFTypeRef,
            order: i64,
        ) -> CFTypeRef;

        fn CFRunLoopGetCurrent() -> CFTypeRef;
        fn CFRunLoopAddSource(rl: CFTypeRef, source: CFTypeRef, mode: CFTypeRef);
        fn CFRunLoopRun();
        fn CFRunLoopStop(rl: CFTypeRef);
    }

    extern "C" {
        fn AXIsProcessTrusted() -> bool;
    }

    /// Context handed to the tap callback.
    struct TapContext {
        shared: Arc<SharedState>,
        suppressed: std::sync::atomic::AtomicU64,
    }

    /// Global pointers for the C callback; CGEventTapCreate cannot
    /// capture Rust closures.
    static CONTEXT_PTR: AtomicPtr<TapContext> = AtomicPtr::new(ptr::null_mut());
    static TAP_PORT_PTR: AtomicPtr<c_void> = AtomicPtr::new(ptr::null_mut());
    static RUN_LOOP_PTR: AtomicPtr<c_void> = AtomicPtr::new(ptr::null_mut());

    /// Active Quartz tap intercepting native scroll and cursor motion.
    pub struct QuartzInterceptor {
        shared: Arc<SharedState>,
        thread_handle: Option<JoinHandle<()>>,
        running: Arc<AtomicBool>,
    }

    impl QuartzInterceptor {
        pub fn new(shared: Arc<SharedState>) -> Self {
            Self {
                shared,
                thread_handle: None,
                running: Arc::new(AtomicBool::new(false)),
            }
        }

        /// Whether this process has the Accessibility trust the tap
        /// requires.
        pub fn accessibility_trusted() -> bool {
            unsafe { AXIsProcessTrusted() }
        }
    }

    impl Interceptor for QuartzInterceptor {
        fn start(&mut self) -> Result<()> {
            if self.running.swap(true, Ordering::SeqCst) {
                return Ok(());
            }

            if !Self::accessibility_trusted() {
                self.running.store(false, Ordering::SeqCst);
                return Err(Error::Tap(
                    "Accessibility permission not granted; enable TrackPal under \
                     System Settings > Privacy & Security > Accessibility"
                        .into(),
                ));
            }

            let context = Box::new(TapContext {
                shared: Arc::clone(&self.shared),
                suppressed: std::sync::atomic::AtomicU64::new(0),
            });
            let context_ptr = Box::into_raw(context);
            CONTEXT_PTR.store(context_ptr, Ordering::SeqCst);

            let running = Arc::clone(&self.running);
            let handle = thread::Builder::new()
                .name("trackpal-tap".into())
                .spawn(move || {
                    if let Err(e) = run_tap_loop() {
                        error!("Event tap error: {}", e);
                        running.store(false, Ordering::SeqCst);
                    }
                })
                .map_err(|e| {
                    // Roll back on spawn failure
                    unsafe {
                        let _ = Box::from_raw(context_ptr);
                    }
                    CONTEXT_PTR.store(ptr::null_mut(), Ordering::SeqCst);
                    self.running.store(false, Ordering::SeqCst);
                    Error::Tap(format!("failed to spawn tap thread: {e}"))
                })?;

            self.thread_handle = Some(handle);
            info!("Event interceptor started at HID insertion point");
            Ok(())
        }

        fn stop(&mut self) {
            if !self.running.swap(false, Ordering::SeqCst) {
                return;
            }

            let run_loop = RUN_LOOP_PTR.swap(ptr::null_mut(), Ordering::SeqCst);
            if !run_loop.is_null() {
                unsafe { CFRunLoopStop(run_loop as _) };
            }
            if let Some(handle) = self.thread_handle.take() {
                let _ = handle.join();
            }

            let context_ptr = CONTEXT_PTR.swap(ptr::null_mut(), Ordering::SeqCst);
            if !context_ptr.is_null() {
                let context = unsafe { Box::from_raw(context_ptr) };
                info!(
                    "Event interceptor stopped ({} events suppressed)",
                    context.suppressed.load(Ordering::Relaxed)
                );
            } else {
                info!("Event interceptor stopped");
            }
        }

        fn is_running(&self) -> bool {
            self.running.load(Ordering::SeqCst)
        }
    }

    impl Drop for QuartzInterceptor {
        fn drop(&mut self) {
            self.stop();
        }
    }

    extern "C" fn tap_callback(
        _proxy: CGEventTapProxy,
        event_type: u32,
        event: CGEventRef,
        _user_info: *mut c_void,
    ) -> CGEventRef {
        // The OS disables taps that stall; re-enable inline, no state
        // reset
        if event_type == CG_EVENT_TAP_DISABLED_BY_TIMEOUT
            || event_type == CG_EVENT_TAP_DISABLED_BY_USER_INPUT
        {
            let port = TAP_PORT_PTR.load(Ordering::SeqCst);
            if !port.is_null() {
                unsafe { CGEventTapEnable(port as _, true) };
                warn!("Event tap was disabled by the OS; re-enabled");
            }
            return event;
        }

        let ctx = CONTEXT_PTR.load(Ordering::SeqCst);
        if ctx.is_null() {
            return event;
        }
        let context = unsafe { &*ctx };

        let kind = match event_type {
            CG_EVENT_SCROLL_WHEEL => InterceptKind::Scroll,
            CG_EVENT_MOUSE_MOVED => InterceptKind::MouseMoved,
            _ => return event,
        };

        let actively_scrolling = context.shared.is_actively_scrolling();
        let tag = unsafe { CGEventGetIntegerValueField(event, CG_EVENT_SOURCE_USER_DATA) };

        if should_drop_event(kind, actively_scrolling, tag) {
            context.suppressed.fetch_add(1, Ordering::Relaxed);
            // Returning NULL deletes the event
            return ptr::null();
        }

        event
    }

    /// RAII guard for the tap mach port: disables, clears the global
    /// and releases on drop.
    struct TapPortGuard(CFTypeRef);

    impl Drop for TapPortGuard {
        fn drop(&mut self) {
            TAP_PORT_PTR.store(ptr::null_mut(), Ordering::SeqCst);
            unsafe {
                CGEventTapEnable(self.0, false);
                CFRelease(self.0 as _);
            }
        }
    }

    struct RunLoopSourceGuard(CFTypeRef);

    impl Drop for RunLoopSourceGuard {
        fn drop(&mut self) {
            unsafe { CFRelease(self.0 as _) };
        }
    }

    struct RunLoopPtrGuard;

    impl Drop for RunLoopPtrGuard {
        fn drop(&mut self) {
            RUN_LOOP_PTR.store(ptr::null_mut(), Ordering::SeqCst);
        }
    }

    fn run_tap_loop() -> Result<()> {
        debug!("Interceptor tap loop starting");

        let tap = unsafe {
            CGEventTapCreate(
                CGEventTapLocation::HidEventTap,
                CGEventTapPlacement::HeadInsertEventTap,
                CGEventTapOptions::DefaultTap,
                intercept_mask(),
                tap_callback,
                ptr::null_mut(),
            )
        };
        if tap.is_null() {
            return Err(Error::Tap(
                "failed to create event tap; check Accessibility permission".into(),
            ));
        }
        TAP_PORT_PTR.store(tap as *mut c_void, Ordering::SeqCst);
        let _tap_guard = TapPortGuard(tap);

        let source = unsafe { CFMachPortCreateRunLoopSource(ptr::null(), tap, 0) };
        if source.is_null() {
            return Err(Error::Tap("failed to create run loop source".into()));
        }
        let _source_guard = RunLoopSourceGuard(source);

        let run_loop = unsafe { CFRunLoopGetCurrent() };
        RUN_LOOP_PTR.store(run_loop as *mut c_void, Ordering::SeqCst);
        let _ptr_guard = RunLoopPtrGuard;

        unsafe {
            CFRunLoopAddSource(run_loop, source, kCFRunLoopCommonModes as CFTypeRef);
            CGEventTapEnable(tap, true);
        }

        debug!("Interceptor tap loop running");
        unsafe { CFRunLoopRun() };
        debug!("Interceptor tap loop stopped");
        Ok(())
    }
}
