//! Touch session state
//!
//! At most one session exists at any time: one contiguous single-finger
//! contact with its evaluation buffers, velocity history and sub-pixel
//! scroll accumulator.

use crate::touch::zones::Zone;

/// Maximum velocity samples retained.
pub const VELOCITY_HISTORY_LEN: usize = 5;

/// One velocity sample in normalized units per second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocitySample {
    pub vx: f64,
    pub vy: f64,
    pub time: f64,
}

/// Bounded, strictly chronological velocity history.
#[derive(Debug, Clone, Default)]
pub struct VelocityHistory {
    samples: Vec<VelocitySample>,
}

impl VelocityHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a sample; non-monotonic timestamps are discarded to keep
    /// the history strictly ordered.
    pub fn push(&mut self, vx: f64, vy: f64, time: f64) {
        if let Some(last) = self.samples.last() {
            if time <= last.time {
                return;
            }
        }
        if self.samples.len() == VELOCITY_HISTORY_LEN {
            self.samples.remove(0);
        }
        self.samples.push(VelocitySample { vx, vy, time });
    }

    pub fn latest(&self) -> Option<VelocitySample> {
        self.samples.last().copied()
    }

    /// Mean velocity over the retained samples.
    pub fn average(&self) -> (f64, f64) {
        if self.samples.is_empty() {
            return (0.0, 0.0);
        }
        let n = self.samples.len() as f64;
        let (sx, sy) = self
            .samples
            .iter()
            .fold((0.0, 0.0), |(ax, ay), s| (ax + s.vx, ay + s.vy));
        (sx / n, sy / n)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Evidence accumulated while a session is activation-pending.
#[derive(Debug, Clone, Default)]
pub struct Activation {
    /// Positions seen during the pending window
    pub frames: Vec<(f64, f64)>,
    /// Buffered deltas (the discarded first delta is not buffered)
    pub deltas: Vec<(f64, f64)>,
    /// Densities aligned with `deltas`
    pub densities: Vec<f64>,
    /// Accumulated confidence in `[0, 1]`
    pub confidence: f64,
    /// Deltas observed so far, including the discarded first one
    pub frames_observed: u32,
    /// Whether the noisy first delta has been dropped
    pub first_delta_discarded: bool,
    /// Last evidence snapshot, for the session record
    pub last_on_axis_ratio: f64,
    pub last_on_axis_speed: f64,
    pub last_off_axis_speed: f64,
    pub last_density: f64,
}

impl Activation {
    pub fn with_prior(confidence: f64) -> Self {
        Self {
            confidence,
            ..Default::default()
        }
    }

    /// Net displacement across the buffered deltas, used for corner
    /// promotion. Jitter cancels out; a deliberate slide does not.
    pub fn net_movement(&self) -> (f64, f64) {
        self.deltas
            .iter()
            .fold((0.0, 0.0), |(ax, ay), (dx, dy)| (ax + dx, ay + dy))
    }
}

/// One contiguous single-finger contact and its evaluation state.
#[derive(Debug, Clone)]
pub struct TouchSession {
    /// Current zone (may change via corner promotion or rejection)
    pub zone: Zone,
    /// Zone at first contact, before any promotion
    pub original_zone: Zone,
    pub start_position: (f64, f64),
    pub start_time: f64,
    pub last_position: (f64, f64),
    pub last_time: f64,
    pub velocity_history: VelocityHistory,
    /// Fractional pixel remainders between emitted events
    pub scroll_accumulator: (f64, f64),
    /// Present while the activation decision is pending
    pub activation: Option<Activation>,
    /// Whether a "began" scroll event has been posted without a
    /// matching "ended"
    pub scroll_phase_began: bool,
    /// Whether the session activated scrolling
    pub activated: bool,
}

impl TouchSession {
    pub fn new(zone: Zone, x: f64, y: f64, time: f64) -> Self {
        Self {
            zone,
            original_zone: zone,
            start_position: (x, y),
            start_time: time,
            last_position: (x, y),
            last_time: time,
            velocity_history: VelocityHistory::new(),
            scroll_accumulator: (0.0, 0.0),
            activation: None,
            scroll_phase_began: false,
            activated: false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.activation.is_some()
    }

    /// Advance position bookkeeping; returns the delta and updates the
    /// velocity history when time advanced.
    pub fn advance(&mut self, x: f64, y: f64, time: f64) -> (f64, f64) {
        let dx = x - self.last_position.0;
        let dy = y - self.last_position.1;
        let dt = time - self.last_time;
        if dt > 0.0 {
            self.velocity_history.push(dx / dt, dy / dt, time);
        }
        self.last_position = (x, y);
        self.last_time = time;
        (dx, dy)
    }

    pub fn duration(&self, now: f64) -> f64 {
        (now - self.start_time).max(0.0)
    }

    /// Net displacement from the start position.
    pub fn net_displacement(&self) -> (f64, f64) {
        (
            self.last_position.0 - self.start_position.0,
            self.last_position.1 - self.start_position.1,
        )
    }
}
