//! Inertial coast-down
//!
//! After lift-off with enough velocity, keeps emitting scroll events at
//! display refresh with a continuous exponential decay until both axes
//! fall below the minimum velocity, or a new touch or multi-finger
//! transition pre-empts the coast.

use crate::engine::intent::ASPECT_COMPENSATION;
use crate::events::sink::EventSink;
use crate::events::types::{MomentumPhase, ScrollEvent};
use crate::touch::zones::Axis;

/// Exponential decay factor per elapsed millisecond
/// (≈ 0.968 per 16.67 ms frame).
pub const DECELERATION_RATE_PER_MS: f64 = 0.998;

/// Both axes below this stop the coast (pixels per frame).
pub const MIN_VELOCITY: f64 = 2.0;

/// Scaled axis velocity required to start coasting at all.
pub const START_THRESHOLD: f64 = 20.0;

/// Average touch velocity to initial scroll velocity scale.
const VELOCITY_SCALE: f64 = 20.0;

/// Frame-clock-driven exponential coast-down.
#[derive(Debug, Clone, Default)]
pub struct InertiaEngine {
    velocity: (f64, f64),
    last_tick: f64,
    momentum_began: bool,
    active: bool,
}

impl InertiaEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Current scroll velocity, for diagnostics.
    pub fn velocity(&self) -> (f64, f64) {
        self.velocity
    }

    /// Arm the coast from the session's average touch velocity. The
    /// off-axis component is zeroed; returns false (and stays idle)
    /// when the scaled on-axis velocity is within the start threshold.
    pub fn try_start(
        &mut self,
        average_velocity: (f64, f64),
        axis: Axis,
        multiplier: f64,
        now: f64,
    ) -> bool {
        let (vx, vy) = match axis {
            // Natural scroll: same inversion as live emission
            Axis::Vertical => (0.0, -average_velocity.1 * multiplier * VELOCITY_SCALE),
            Axis::Horizontal => (
                average_velocity.0 * multiplier * VELOCITY_SCALE * ASPECT_COMPENSATION,
                0.0,
            ),
        };

        let on_axis = match axis {
            Axis::Vertical => vy.abs(),
            Axis::Horizontal => vx.abs(),
        };
        if on_axis <= START_THRESHOLD {
            return false;
        }

        self.velocity = (vx, vy);
        self.last_tick = now;
        self.momentum_began = false;
        self.active = true;
        true
    }

    /// One frame-clock tick. No-op when the coast already ended.
    /// Returns true while still coasting.
    pub fn step(&mut self, now: f64, sink: &mut dyn EventSink) -> bool {
        if !self.active {
            return false;
        }

        let dt_ms = ((now - self.last_tick) * 1000.0).max(0.0);
        self.last_tick = now;
        let decay = DECELERATION_RATE_PER_MS.powf(dt_ms);
        self.velocity.0 *= decay;
        self.velocity.1 *= decay;

        if self.velocity.0.abs() < MIN_VELOCITY && self.velocity.1.abs() < MIN_VELOCITY {
            self.finish(sink);
            return false;
        }

        let phase = if self.momentum_began {
            MomentumPhase::Changed
        } else {
            self.momentum_began = true;
            MomentumPhase::Began
        };
        sink.post_scroll(&ScrollEvent::momentum(
            self.velocity.0 as i32,
            self.velocity.1 as i32,
            phase,
        ));
        true
    }

    /// Cancel the coast (new touch, multi-finger transition, engine
    /// shutdown). Closes an open momentum phase.
    pub fn stop(&mut self, sink: &mut dyn EventSink) {
        if self.active {
            self.finish(sink);
        }
    }

    fn finish(&mut self, sink: &mut dyn EventSink) {
        if self.momentum_began {
            sink.post_scroll(&ScrollEvent::momentum_ended());
        }
        self.velocity = (0.0, 0.0);
        self.momentum_began = false;
        self.active = false;
    }
}
