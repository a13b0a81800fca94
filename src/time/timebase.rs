//! Monotonic Timebase Bridge
//!
//! Provides microsecond-precision monotonic timestamps. On macOS this is
//! backed by `mach_absolute_time`, the only clock that is consistent
//! across Apple Silicon and Intel and that matches the timestamps the
//! multitouch driver stamps onto contact frames. On other targets (CI,
//! tests) a `std::time::Instant` epoch stands in.
//!
//! The touch pipeline works in `f64` seconds throughout; this module is
//! the single place raw ticks are converted.

use std::sync::OnceLock;

#[cfg(target_os = "macos")]
static TIMEBASE_INFO: OnceLock<TimebaseInfo> = OnceLock::new();

#[cfg(target_os = "macos")]
#[derive(Debug, Clone, Copy)]
struct TimebaseInfo {
    numer: u32,
    denom: u32,
}

#[cfg(not(target_os = "macos"))]
static EPOCH: OnceLock<std::time::Instant> = OnceLock::new();

/// Monotonic high-resolution timebase.
///
/// Call [`Timebase::init`] once at startup; all other methods are safe
/// to call from any thread afterwards.
#[derive(Debug, Clone, Copy)]
pub struct Timebase;

#[cfg(target_os = "macos")]
impl Timebase {
    /// Initialize the timebase. Fetches `mach_timebase_info()` once and
    /// caches the conversion factors.
    pub fn init() {
        TIMEBASE_INFO.get_or_init(|| {
            let mut info = mach2::mach_time::mach_timebase_info_data_t { numer: 0, denom: 0 };
            // Safety: mach_timebase_info is always safe to call
            unsafe {
                mach2::mach_time::mach_timebase_info(&mut info);
            }
            TimebaseInfo {
                numer: info.numer,
                denom: info.denom,
            }
        });
    }

    /// Raw hardware counter value. Extremely cheap; prefer this in hot
    /// paths and convert later.
    #[inline(always)]
    pub fn now_ticks() -> u64 {
        // Safety: mach_absolute_time is always safe to call
        unsafe { mach2::mach_time::mach_absolute_time() }
    }

    /// Convert raw ticks to nanoseconds.
    #[inline]
    pub fn ticks_to_nanos(ticks: u64) -> u64 {
        let info = TIMEBASE_INFO.get().expect("Timebase::init() not called");
        // u128 arithmetic prevents overflow on large tick counts
        ((ticks as u128 * info.numer as u128) / info.denom as u128) as u64
    }
}

#[cfg(not(target_os = "macos"))]
impl Timebase {
    /// Initialize the timebase epoch.
    pub fn init() {
        EPOCH.get_or_init(std::time::Instant::now);
    }

    /// Nanoseconds since the init epoch, reinterpreted as ticks.
    #[inline]
    pub fn now_ticks() -> u64 {
        let epoch = EPOCH.get().expect("Timebase::init() not called");
        epoch.elapsed().as_nanos() as u64
    }

    /// Ticks are already nanoseconds on the fallback clock.
    #[inline]
    pub fn ticks_to_nanos(ticks: u64) -> u64 {
        ticks
    }
}

impl Timebase {
    /// Current monotonic time in nanoseconds.
    #[inline]
    pub fn now_nanos() -> u64 {
        Self::ticks_to_nanos(Self::now_ticks())
    }

    /// Current monotonic time in seconds, the unit the touch pipeline
    /// and the multitouch driver use.
    #[inline]
    pub fn now_seconds() -> f64 {
        Self::now_nanos() as f64 / 1_000_000_000.0
    }

    /// Elapsed seconds between two tick values. Returns 0 if `end`
    /// precedes `start`.
    #[inline]
    pub fn elapsed_seconds(start_ticks: u64, end_ticks: u64) -> f64 {
        if end_ticks >= start_ticks {
            Self::ticks_to_nanos(end_ticks - start_ticks) as f64 / 1_000_000_000.0
        } else {
            0.0
        }
    }
}
