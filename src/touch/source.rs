//! Raw multitouch device source
//!
//! FFI bridge to the private MultitouchSupport framework. The contact
//! callback fires on a framework-owned worker thread; it copies the
//! primitive scalar fields of each frame into a [`FrameMessage`] and
//! pushes it onto a lock-free ring for the main loop. Driver-owned
//! structs never cross the thread boundary.

use crate::touch::types::FrameMessage;
use crate::Result;

/// Producer half of the frame ring, filled by the device callback.
pub type FrameProducer = rtrb::Producer<FrameMessage>;

/// Capability over the raw multitouch source. Owned exclusively by the
/// engine: started once on enable, stopped once on disable.
pub trait TouchSource: Send {
    fn start(&mut self) -> Result<()>;
    fn stop(&mut self);
    fn is_running(&self) -> bool;
}

#[cfg(target_os = "macos")]
pub use platform::MultitouchDevice;

#[cfg(target_os = "macos")]
mod platform {
    use super::{FrameProducer, TouchSource};
    use crate::touch::types::{ContactFrame, ContactPhase, FrameMessage};
    use crate::{Error, Result};
    use std::cell::UnsafeCell;
    use std::ffi::c_void;
    use std::ptr;
    use tracing::{info, trace, warn};

    // MultitouchSupport private framework types
    type MTDeviceRef = *mut c_void;
    type CFArrayRef = *const c_void;

    #[repr(C)]
    #[derive(Copy, Clone)]
    struct MTPoint {
        x: f32,
        y: f32,
    }

    #[repr(C)]
    #[derive(Copy, Clone)]
    struct MTVector {
        position: MTPoint,
        velocity: MTPoint,
    }

    #[repr(C)]
    #[derive(Copy, Clone)]
    struct MTTouch {
        frame: i32,
        timestamp: f64,
        identifier: i32,
        state: i32,
        finger_id: i32,
        hand_id: i32,
        normalized: MTVector,
        size: f32,
        zero1: i32,
        angle: f32,
        major_axis: f32,
        minor_axis: f32,
        absolute_vector: MTVector,
        zero2: i32,
        zero3: i32,
        density: f32,
    }

    type MTContactCallbackWithRefcon = extern "C" fn(
        device: MTDeviceRef,
        touches: *const MTTouch,
        num_touches: i32,
        timestamp: f64,
        frame: i32,
        refcon: *mut c_void,
    );

    extern "C" {
        fn MTDeviceCreateList() -> CFArrayRef;
        fn MTRegisterContactFrameCallbackWithRefcon(
            device: MTDeviceRef,
            callback: MTContactCallbackWithRefcon,
            refcon: *mut c_void,
        );
        fn MTUnregisterContactFrameCallback(device: MTDeviceRef, callback: MTContactCallbackWithRefcon);
        fn MTDeviceStart(device: MTDeviceRef, mode: i32);
        fn MTDeviceStop(device: MTDeviceRef);
        fn MTDeviceIsRunning(device: MTDeviceRef) -> bool;
        fn MTDeviceIsBuiltIn(device: MTDeviceRef) -> bool;

        fn CFArrayGetCount(array: CFArrayRef) -> isize;
        fn CFArrayGetValueAtIndex(array: CFArrayRef, index: isize) -> *const c_void;
        fn CFRelease(cf: *const c_void);
    }

    /// Callback context. The producer lives in an UnsafeCell because
    /// `rtrb::Producer` is `!Sync`, and the framework invokes the
    /// callback on a single dedicated thread.
    struct SourceContext {
        producer: UnsafeCell<FrameProducer>,
    }

    // Safety: the callback is the only reader/writer of the producer and
    // runs on one framework thread; the main thread only allocates and
    // frees the context around registration.
    unsafe impl Sync for SourceContext {}

    /// Built-in trackpad contact source.
    pub struct MultitouchDevice {
        device: MTDeviceRef,
        device_list: CFArrayRef,
        context: Option<Box<SourceContext>>,
        producer: Option<FrameProducer>,
        running: bool,
    }

    // Safety: the raw device pointers are only used from the owning
    // engine thread; the callback context is handled separately.
    unsafe impl Send for MultitouchDevice {}

    impl MultitouchDevice {
        /// Locate the built-in trackpad. Errors when no multitouch
        /// device is present (e.g. a desktop Mac without a trackpad).
        pub fn open(producer: FrameProducer) -> Result<Self> {
            let list = unsafe { MTDeviceCreateList() };
            if list.is_null() {
                return Err(Error::Device("no multitouch devices available".into()));
            }

            let count = unsafe { CFArrayGetCount(list) };
            let mut chosen: MTDeviceRef = ptr::null_mut();
            for i in 0..count {
                let dev = unsafe { CFArrayGetValueAtIndex(list, i) } as MTDeviceRef;
                if dev.is_null() {
                    continue;
                }
                if unsafe { MTDeviceIsBuiltIn(dev) } {
                    chosen = dev;
                    break;
                }
                if chosen.is_null() {
                    chosen = dev;
                }
            }

            if chosen.is_null() {
                unsafe { CFRelease(list) };
                return Err(Error::Device("multitouch device list is empty".into()));
            }

            info!("Multitouch device selected ({} candidate(s))", count);
            Ok(Self {
                device: chosen,
                device_list: list,
                context: None,
                producer: Some(producer),
                running: false,
            })
        }
    }

    impl TouchSource for MultitouchDevice {
        fn start(&mut self) -> Result<()> {
            if self.running {
                return Ok(());
            }
            let producer = self
                .producer
                .take()
                .ok_or_else(|| Error::Device("frame producer already consumed".into()))?;

            let context = Box::new(SourceContext {
                producer: UnsafeCell::new(producer),
            });
            let refcon = &*context as *const SourceContext as *mut c_void;
            self.context = Some(context);

            unsafe {
                MTRegisterContactFrameCallbackWithRefcon(self.device, contact_callback, refcon);
                MTDeviceStart(self.device, 0);
            }
            if !unsafe { MTDeviceIsRunning(self.device) } {
                warn!("Multitouch device did not report running after start");
            }
            self.running = true;
            info!("Multitouch source started");
            Ok(())
        }

        fn stop(&mut self) {
            if !self.running {
                return;
            }
            unsafe {
                MTUnregisterContactFrameCallback(self.device, contact_callback);
                MTDeviceStop(self.device);
            }
            self.running = false;
            // Context freed only after the callback is unregistered
            self.context = None;
            info!("Multitouch source stopped");
        }

        fn is_running(&self) -> bool {
            self.running
        }
    }

    impl Drop for MultitouchDevice {
        fn drop(&mut self) {
            self.stop();
            unsafe { CFRelease(self.device_list) };
        }
    }

    extern "C" fn contact_callback(
        _device: MTDeviceRef,
        touches: *const MTTouch,
        num_touches: i32,
        timestamp: f64,
        _frame: i32,
        refcon: *mut c_void,
    ) {
        if refcon.is_null() {
            return;
        }
        let context = unsafe { &*(refcon as *const SourceContext) };

        let finger_count = num_touches.max(0) as u32;
        let contact = if finger_count == 1 && !touches.is_null() {
            let touch = unsafe { &*touches };
            ContactPhase::from_raw(touch.state).map(|phase| ContactFrame {
                x: touch.normalized.position.x as f64,
                y: touch.normalized.position.y as f64,
                phase,
                density: touch.density as f64,
                major_axis: touch.major_axis as f64,
                minor_axis: touch.minor_axis as f64,
                timestamp,
            })
        } else {
            None
        };

        let message = FrameMessage {
            contact,
            finger_count,
            timestamp,
        };

        // Safety: single-threaded access, see SourceContext
        let producer = unsafe { &mut *context.producer.get() };
        if producer.push(message).is_err() {
            trace!("Frame ring full, dropping contact frame");
        }
    }
}
