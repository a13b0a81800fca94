//! Frame clock capability
//!
//! Drives the inertia loop at display refresh. The display-link
//! callback fires on a media thread and only pushes a timestamp onto a
//! ring; the engine steps inertia when the main loop drains it. The
//! link is created lazily on start and destroyed on stop.

use crate::Result;

/// Producer half of the tick ring, filled at display refresh with
/// monotonic second timestamps.
pub type TickProducer = rtrb::Producer<f64>;

/// Capability over the display-refresh clock. Owned by the engine and
/// held for the lifetime of an inertia phase.
pub trait FrameClock: Send {
    fn start(&mut self) -> Result<()>;
    fn stop(&mut self);
    fn is_running(&self) -> bool;
}

/// Clock for tests: never ticks by itself, the test drives
/// `Engine::handle_tick` directly.
#[derive(Debug, Default)]
pub struct ManualClock {
    running: bool,
    pub starts: u32,
    pub stops: u32,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameClock for ManualClock {
    fn start(&mut self) -> Result<()> {
        if !self.running {
            self.running = true;
            self.starts += 1;
        }
        Ok(())
    }

    fn stop(&mut self) {
        if self.running {
            self.running = false;
            self.stops += 1;
        }
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

#[cfg(target_os = "macos")]
pub use platform::DisplayLinkClock;

#[cfg(target_os = "macos")]
mod platform {
    use super::{FrameClock, TickProducer};
    use crate::time::Timebase;
    use crate::{Error, Result};
    use std::cell::UnsafeCell;
    use std::ffi::c_void;
    use std::ptr;
    use tracing::{debug, trace};

    type CVDisplayLinkRef = *mut c_void;
    type CVReturn = i32;

    const KCV_RETURN_SUCCESS: CVReturn = 0;

    type CVDisplayLinkOutputCallback = extern "C" fn(
        link: CVDisplayLinkRef,
        in_now: *const c_void,
        in_output_time: *const c_void,
        flags_in: u64,
        flags_out: *mut u64,
        context: *mut c_void,
    ) -> CVReturn;

    #[link(name = "CoreVideo", kind = "framework")]
    extern "C" {
        fn CVDisplayLinkCreateWithActiveCGDisplays(link: *mut CVDisplayLinkRef) -> CVReturn;
        fn CVDisplayLinkSetOutputCallback(
            link: CVDisplayLinkRef,
            callback: CVDisplayLinkOutputCallback,
            context: *mut c_void,
        ) -> CVReturn;
        fn CVDisplayLinkStart(link: CVDisplayLinkRef) -> CVReturn;
        fn CVDisplayLinkStop(link: CVDisplayLinkRef) -> CVReturn;
        fn CVDisplayLinkRelease(link: CVDisplayLinkRef);
    }

    /// Callback context; the producer is single-thread on the display
    /// link's media thread.
    struct ClockContext {
        producer: UnsafeCell<TickProducer>,
    }

    // Safety: only the display-link thread touches the producer while
    // the link is running; create/destroy happen with the link stopped.
    unsafe impl Sync for ClockContext {}

    /// CVDisplayLink-backed frame clock.
    pub struct DisplayLinkClock {
        link: CVDisplayLinkRef,
        context: Option<Box<ClockContext>>,
        producer: Option<TickProducer>,
        running: bool,
    }

    // Safety: the link pointer is only used from the owning thread.
    unsafe impl Send for DisplayLinkClock {}

    impl DisplayLinkClock {
        pub fn new(producer: TickProducer) -> Self {
            Self {
                link: ptr::null_mut(),
                context: None,
                producer: Some(producer),
                running: false,
            }
        }
    }

    impl FrameClock for DisplayLinkClock {
        fn start(&mut self) -> Result<()> {
            if self.running {
                return Ok(());
            }

            // Lazy creation: the link exists only while inertia runs
            if self.link.is_null() {
                let producer = self
                    .producer
                    .take()
                    .or_else(|| self.context.take().map(|c| c.producer.into_inner()))
                    .ok_or_else(|| Error::Clock("tick producer already consumed".into()))?;

                let mut link: CVDisplayLinkRef = ptr::null_mut();
                let rc = unsafe { CVDisplayLinkCreateWithActiveCGDisplays(&mut link) };
                if rc != KCV_RETURN_SUCCESS || link.is_null() {
                    self.producer = Some(producer);
                    return Err(Error::Clock(format!("CVDisplayLinkCreate failed ({rc})")));
                }

                let context = Box::new(ClockContext {
                    producer: UnsafeCell::new(producer),
                });
                let refcon = &*context as *const ClockContext as *mut c_void;
                let rc = unsafe { CVDisplayLinkSetOutputCallback(link, tick_callback, refcon) };
                if rc != KCV_RETURN_SUCCESS {
                    unsafe { CVDisplayLinkRelease(link) };
                    self.producer = Some(context.producer.into_inner());
                    return Err(Error::Clock(format!("CVDisplayLinkSetOutputCallback failed ({rc})")));
                }

                self.link = link;
                self.context = Some(context);
            }

            let rc = unsafe { CVDisplayLinkStart(self.link) };
            if rc != KCV_RETURN_SUCCESS {
                return Err(Error::Clock(format!("CVDisplayLinkStart failed ({rc})")));
            }
            self.running = true;
            debug!("Display link started");
            Ok(())
        }

        fn stop(&mut self) {
            if !self.running && self.link.is_null() {
                return;
            }
            if !self.link.is_null() {
                unsafe {
                    CVDisplayLinkStop(self.link);
                    CVDisplayLinkRelease(self.link);
                }
                self.link = ptr::null_mut();
            }
            self.running = false;
            debug!("Display link stopped and released");
        }

        fn is_running(&self) -> bool {
            self.running
        }
    }

    impl Drop for DisplayLinkClock {
        fn drop(&mut self) {
            self.stop();
        }
    }

    extern "C" fn tick_callback(
        _link: CVDisplayLinkRef,
        _in_now: *const c_void,
        _in_output_time: *const c_void,
        _flags_in: u64,
        _flags_out: *mut u64,
        context: *mut c_void,
    ) -> CVReturn {
        if context.is_null() {
            return KCV_RETURN_SUCCESS;
        }
        let context = unsafe { &*(context as *const ClockContext) };
        // Safety: single-threaded access on the display-link thread
        let producer = unsafe { &mut *context.producer.get() };
        if producer.push(Timebase::now_seconds()).is_err() {
            trace!("Tick ring full, dropping frame tick");
        }
        KCV_RETURN_SUCCESS
    }
}
