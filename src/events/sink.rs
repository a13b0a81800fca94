//! Event sink capability
//!
//! The engine emits through this trait so tests can run against a
//! recording sink; the Quartz implementation posts real events at the
//! HID insertion point with the TrackPal tag in their user-data field.

use super::types::ScrollEvent;
use crate::app::config::CornerAction;

/// Consumer of synthesized events.
pub trait EventSink: Send {
    /// Post one scroll-wheel event.
    fn post_scroll(&mut self, event: &ScrollEvent);
    /// Post a middle-button click (down + up) at the current cursor.
    fn post_middle_click(&mut self);
    /// Execute a hot-corner action.
    fn trigger_corner_action(&mut self, action: CornerAction);
}

/// Sink that records everything it is asked to post. Used by the test
/// suites and the doctor dry-run.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub scrolls: Vec<ScrollEvent>,
    pub middle_clicks: usize,
    pub corner_actions: Vec<CornerAction>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events that actually carry pixel deltas.
    pub fn non_zero_scrolls(&self) -> Vec<&ScrollEvent> {
        self.scrolls.iter().filter(|e| !e.is_zero_delta()).collect()
    }
}

impl EventSink for RecordingSink {
    fn post_scroll(&mut self, event: &ScrollEvent) {
        self.scrolls.push(*event);
    }

    fn post_middle_click(&mut self) {
        self.middle_clicks += 1;
    }

    fn trigger_corner_action(&mut self, action: CornerAction) {
        self.corner_actions.push(action);
    }
}

/// Clonable handle over a [`RecordingSink`], so a test can keep
/// inspecting events after handing the sink to an engine.
#[derive(Debug, Clone, Default)]
pub struct SharedRecordingSink {
    inner: std::sync::Arc<parking_lot::Mutex<RecordingSink>>,
}

impl SharedRecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scrolls(&self) -> Vec<ScrollEvent> {
        self.inner.lock().scrolls.clone()
    }

    pub fn non_zero_scrolls(&self) -> Vec<ScrollEvent> {
        self.inner
            .lock()
            .scrolls
            .iter()
            .filter(|e| !e.is_zero_delta())
            .copied()
            .collect()
    }

    pub fn middle_clicks(&self) -> usize {
        self.inner.lock().middle_clicks
    }

    pub fn corner_actions(&self) -> Vec<CornerAction> {
        self.inner.lock().corner_actions.clone()
    }

    pub fn clear(&self) {
        let mut sink = self.inner.lock();
        sink.scrolls.clear();
        sink.middle_clicks = 0;
        sink.corner_actions.clear();
    }
}

impl EventSink for SharedRecordingSink {
    fn post_scroll(&mut self, event: &ScrollEvent) {
        self.inner.lock().post_scroll(event);
    }

    fn post_middle_click(&mut self) {
        self.inner.lock().post_middle_click();
    }

    fn trigger_corner_action(&mut self, action: CornerAction) {
        self.inner.lock().trigger_corner_action(action);
    }
}

#[cfg(target_os = "macos")]
pub use platform::QuartzEventSink;

#[cfg(target_os = "macos")]
mod platform {
    use super::EventSink;
    use crate::app::config::CornerAction;
    use crate::events::types::{MomentumPhase, ScrollEvent};
    use std::ffi::c_void;
    use std::process::Command;
    use std::ptr;
    use tracing::{trace, warn};

    type CGEventRef = *mut c_void;
    type CFTypeRef = *const c_void;

    #[repr(C)]
    #[derive(Copy, Clone, Debug, Default)]
    struct CGPoint {
        x: f64,
        y: f64,
    }

    // CoreGraphics event constants used by the sink
    mod cg {
        // Scroll units
        pub const SCROLL_UNIT_PIXEL: u32 = 0;

        // Event fields
        pub const SCROLL_DELTA_AXIS_1: u32 = 11;
        pub const SCROLL_DELTA_AXIS_2: u32 = 12;
        pub const EVENT_SOURCE_USER_DATA: u32 = 42;
        pub const SCROLL_IS_CONTINUOUS: u32 = 88;
        pub const SCROLL_POINT_DELTA_AXIS_1: u32 = 96;
        pub const SCROLL_POINT_DELTA_AXIS_2: u32 = 97;
        pub const SCROLL_MOMENTUM_PHASE: u32 = 123;

        // Mouse event types and buttons
        pub const EVENT_RIGHT_MOUSE_DOWN: u32 = 3;
        pub const EVENT_RIGHT_MOUSE_UP: u32 = 4;
        pub const EVENT_OTHER_MOUSE_DOWN: u32 = 25;
        pub const EVENT_OTHER_MOUSE_UP: u32 = 26;
        pub const MOUSE_BUTTON_RIGHT: u32 = 1;
        pub const MOUSE_BUTTON_CENTER: u32 = 2;

        // Posting location
        pub const HID_EVENT_TAP: u32 = 0;

        // Momentum phase raw values
        pub const MOMENTUM_BEGIN: i64 = 1;
        pub const MOMENTUM_CONTINUE: i64 = 2;
        pub const MOMENTUM_END: i64 = 3;
    }

    #[link(name = "CoreGraphics", kind = "framework")]
    extern "C" {
        fn CGEventCreate(source: CFTypeRef) -> CGEventRef;
        fn CGEventCreateScrollWheelEvent2(
            source: CFTypeRef,
            units: u32,
            wheel_count: u32,
            wheel1: i32,
            wheel2: i32,
            wheel3: i32,
        ) -> CGEventRef;
        fn CGEventCreateMouseEvent(
            source: CFTypeRef,
            mouse_type: u32,
            location: CGPoint,
            button: u32,
        ) -> CGEventRef;
        fn CGEventGetLocation(event: CGEventRef) -> CGPoint;
        fn CGEventSetIntegerValueField(event: CGEventRef, field: u32, value: i64);
        fn CGEventPost(tap: u32, event: CGEventRef);
    }

    #[link(name = "CoreFoundation", kind = "framework")]
    extern "C" {
        fn CFRelease(cf: CFTypeRef);
    }

    /// Posts synthesized events at the HID insertion point.
    #[derive(Debug, Default)]
    pub struct QuartzEventSink {
        unsupported_warned: bool,
    }

    impl QuartzEventSink {
        pub fn new() -> Self {
            Self::default()
        }

        fn cursor_location(&self) -> CGPoint {
            unsafe {
                let probe = CGEventCreate(ptr::null());
                if probe.is_null() {
                    return CGPoint::default();
                }
                let location = CGEventGetLocation(probe);
                CFRelease(probe);
                location
            }
        }

        fn post_click_pair(&self, down_type: u32, up_type: u32, button: u32, tag: i64) {
            let location = self.cursor_location();
            unsafe {
                for event_type in [down_type, up_type] {
                    let event = CGEventCreateMouseEvent(ptr::null(), event_type, location, button);
                    if event.is_null() {
                        warn!("Failed to create synthetic mouse event");
                        return;
                    }
                    CGEventSetIntegerValueField(event, cg::EVENT_SOURCE_USER_DATA, tag);
                    CGEventPost(cg::HID_EVENT_TAP, event);
                    CFRelease(event);
                }
            }
        }
    }

    impl EventSink for QuartzEventSink {
        fn post_scroll(&mut self, event: &ScrollEvent) {
            unsafe {
                // Axis 1 is vertical, axis 2 horizontal
                let cg_event = CGEventCreateScrollWheelEvent2(
                    ptr::null(),
                    cg::SCROLL_UNIT_PIXEL,
                    2,
                    event.pixel_dy,
                    event.pixel_dx,
                    0,
                );
                if cg_event.is_null() {
                    warn!("Failed to create synthetic scroll event");
                    return;
                }

                CGEventSetIntegerValueField(cg_event, cg::SCROLL_IS_CONTINUOUS, 1);
                CGEventSetIntegerValueField(
                    cg_event,
                    cg::SCROLL_POINT_DELTA_AXIS_1,
                    event.pixel_dy as i64,
                );
                CGEventSetIntegerValueField(
                    cg_event,
                    cg::SCROLL_POINT_DELTA_AXIS_2,
                    event.pixel_dx as i64,
                );
                CGEventSetIntegerValueField(
                    cg_event,
                    cg::SCROLL_DELTA_AXIS_1,
                    event.line_dy as i64,
                );
                CGEventSetIntegerValueField(
                    cg_event,
                    cg::SCROLL_DELTA_AXIS_2,
                    event.line_dx as i64,
                );
                CGEventSetIntegerValueField(cg_event, cg::EVENT_SOURCE_USER_DATA, event.tag);

                // The scroll-phase field (99) stays zero: a nonzero value
                // enrolls the event in the host's responsive-scrolling
                // tracking loop, and some hosts silently drop synthetic
                // events that do. Momentum phases are safe to set.
                let momentum = match event.momentum {
                    MomentumPhase::None => 0,
                    MomentumPhase::Began => cg::MOMENTUM_BEGIN,
                    MomentumPhase::Changed => cg::MOMENTUM_CONTINUE,
                    MomentumPhase::Ended => cg::MOMENTUM_END,
                };
                if momentum != 0 {
                    CGEventSetIntegerValueField(cg_event, cg::SCROLL_MOMENTUM_PHASE, momentum);
                }

                CGEventPost(cg::HID_EVENT_TAP, cg_event);
                CFRelease(cg_event);
            }
            trace!(
                "Posted scroll dx={} dy={} momentum={:?}",
                event.pixel_dx,
                event.pixel_dy,
                event.momentum
            );
        }

        fn post_middle_click(&mut self) {
            self.post_click_pair(
                cg::EVENT_OTHER_MOUSE_DOWN,
                cg::EVENT_OTHER_MOUSE_UP,
                cg::MOUSE_BUTTON_CENTER,
                crate::events::types::TRACKPAL_EVENT_TAG,
            );
            trace!("Posted middle click");
        }

        fn trigger_corner_action(&mut self, action: CornerAction) {
            match action {
                CornerAction::None => {}
                CornerAction::RightClick => {
                    self.post_click_pair(
                        cg::EVENT_RIGHT_MOUSE_DOWN,
                        cg::EVENT_RIGHT_MOUSE_UP,
                        cg::MOUSE_BUTTON_RIGHT,
                        crate::events::types::TRACKPAL_EVENT_TAG,
                    );
                }
                CornerAction::MissionControl | CornerAction::AppWindows => {
                    launch_bundle("com.apple.exposelauncher");
                }
                CornerAction::Launchpad => {
                    launch_bundle("com.apple.launchpad.launcher");
                }
                CornerAction::ShowDesktop | CornerAction::NotificationCenter => {
                    // These need host-level hooks the core does not own
                    if !self.unsupported_warned {
                        warn!("Corner action {:?} requires host integration; ignoring", action);
                        self.unsupported_warned = true;
                    }
                }
            }
        }
    }

    fn launch_bundle(bundle_id: &str) {
        if let Err(e) = Command::new("open").arg("-b").arg(bundle_id).spawn() {
            warn!("Failed to launch {}: {}", bundle_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::types::{ScrollEvent, ScrollPhase};

    #[test]
    fn test_recording_sink_collects() {
        let mut sink = RecordingSink::new();
        sink.post_scroll(&ScrollEvent::pixels(5, 0, ScrollPhase::Began));
        sink.post_scroll(&ScrollEvent::phase_ended());
        sink.post_middle_click();
        sink.trigger_corner_action(CornerAction::AppWindows);

        assert_eq!(sink.scrolls.len(), 2);
        assert_eq!(sink.non_zero_scrolls().len(), 1);
        assert_eq!(sink.middle_clicks, 1);
        assert_eq!(sink.corner_actions, vec![CornerAction::AppWindows]);
    }
}
