//! Adaptive threshold learning
//!
//! Two slow feedback loops, persisted across runs: an EMA of the
//! on-axis ratio observed at successful activations (recenters the
//! direction evidence for how this user actually swipes), and a
//! retry-bonus that lowers the activation threshold for an axis where
//! recent misses are quickly followed by retries.

use crate::engine::intent::ASPECT_COMPENSATION;
use crate::touch::zones::Axis;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// EMA weight applied per flushed ratio sample.
const EMA_ALPHA: f64 = 0.02;

/// Ratio samples buffered per axis before an EMA flush.
const RING_FLUSH_LEN: usize = 5;

/// Learned center bounds.
const CENTER_MIN: f64 = 0.40;
const CENTER_MAX: f64 = 0.55;

/// Retry bonus decay per successful activation, and its cap.
const BONUS_DECAY: f64 = 0.995;
const BONUS_MAX: f64 = 0.08;

/// A session start within this window of a same-axis miss is a retry.
const RETRY_WINDOW: f64 = 2.0;

const MIN_SAMPLES_FOR_BONUS: u32 = 5;
const RETRY_RATE_THRESHOLD: f64 = 0.30;
const COUNTER_HALVE_LIMIT: u32 = 1000;

/// Successful activations between persistence writes.
pub const PERSIST_EVERY: u32 = 20;

/// The persisted learner state. Clamped on load; see
/// [`AdaptiveState::clamped`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveState {
    pub dir_center_h: f64,
    pub dir_center_v: f64,
    pub retry_count_h: u32,
    pub miss_count_h: u32,
    pub retry_count_v: u32,
    pub miss_count_v: u32,
    pub retry_bonus_h: f64,
    pub retry_bonus_v: f64,
}

impl Default for AdaptiveState {
    fn default() -> Self {
        Self {
            dir_center_h: 0.50,
            dir_center_v: 0.50,
            retry_count_h: 0,
            miss_count_h: 0,
            retry_count_v: 0,
            miss_count_v: 0,
            retry_bonus_h: 0.0,
            retry_bonus_v: 0.0,
        }
    }
}

impl AdaptiveState {
    /// Force every field into its legal range. Out-of-range persisted
    /// values never reject startup.
    pub fn clamped(mut self) -> Self {
        self.dir_center_h = self.dir_center_h.clamp(CENTER_MIN, CENTER_MAX);
        self.dir_center_v = self.dir_center_v.clamp(CENTER_MIN, CENTER_MAX);
        self.retry_bonus_h = self.retry_bonus_h.clamp(0.0, BONUS_MAX);
        self.retry_bonus_v = self.retry_bonus_v.clamp(0.0, BONUS_MAX);
        self
    }
}

/// On-line learner over activation outcomes.
#[derive(Debug, Clone, Default)]
pub struct AdaptiveLearner {
    state: AdaptiveState,
    ratio_ring_h: Vec<f64>,
    ratio_ring_v: Vec<f64>,
    last_miss: Option<(Axis, f64)>,
    successes_since_persist: u32,
}

impl AdaptiveLearner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: AdaptiveState) -> Self {
        Self {
            state: state.clamped(),
            ..Self::default()
        }
    }

    pub fn state(&self) -> &AdaptiveState {
        &self.state
    }

    /// Learned on-axis ratio center for an axis.
    pub fn direction_center(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => self.state.dir_center_h,
            Axis::Vertical => self.state.dir_center_v,
        }
    }

    /// Current threshold reduction for an axis.
    pub fn retry_bonus(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => self.state.retry_bonus_h,
            Axis::Vertical => self.state.retry_bonus_v,
        }
    }

    /// A session started in a scroll zone. A start shortly after a
    /// same-axis miss counts as a retry, and a high retry rate earns
    /// the axis a threshold bonus.
    pub fn note_session_start(&mut self, axis: Axis, now: f64) {
        let Some((miss_axis, miss_time)) = self.last_miss else {
            return;
        };
        if miss_axis != axis || now - miss_time > RETRY_WINDOW {
            return;
        }

        let (retries, misses) = self.counters_mut(axis);
        *retries += 1;
        let (retry_count, miss_count) = (*retries, *misses);
        self.maybe_halve(axis);

        let total = retry_count + miss_count;
        if total >= MIN_SAMPLES_FOR_BONUS {
            let rate = retry_count as f64 / total as f64;
            if rate > RETRY_RATE_THRESHOLD {
                let bonus = (rate * 0.10).min(BONUS_MAX);
                match axis {
                    Axis::Horizontal => self.state.retry_bonus_h = bonus,
                    Axis::Vertical => self.state.retry_bonus_v = bonus,
                }
                debug!("Retry bonus on {:?} axis now {:.3}", axis, bonus);
            }
        }
    }

    /// An activation succeeded. Feeds buffered deltas into the axis's
    /// ratio ring (flushed into the EMA at five samples) and decays the
    /// retry bonus. Returns true when state should be persisted.
    pub fn record_success(&mut self, axis: Axis, deltas: &[(f64, f64)]) -> bool {
        for &(dx, dy) in deltas {
            let abs_dx = dx.abs() * ASPECT_COMPENSATION;
            let abs_dy = dy.abs();
            let total = abs_dx + abs_dy;
            if total <= 0.0 {
                continue;
            }
            let ratio = match axis {
                Axis::Horizontal => abs_dx / total,
                Axis::Vertical => abs_dy / total,
            };
            let ring = match axis {
                Axis::Horizontal => &mut self.ratio_ring_h,
                Axis::Vertical => &mut self.ratio_ring_v,
            };
            ring.push(ratio);
        }

        let ring_full = match axis {
            Axis::Horizontal => self.ratio_ring_h.len() >= RING_FLUSH_LEN,
            Axis::Vertical => self.ratio_ring_v.len() >= RING_FLUSH_LEN,
        };
        if ring_full {
            self.flush_ring(axis);
        }

        match axis {
            Axis::Horizontal => self.state.retry_bonus_h *= BONUS_DECAY,
            Axis::Vertical => self.state.retry_bonus_v *= BONUS_DECAY,
        }

        self.successes_since_persist += 1;
        if self.successes_since_persist >= PERSIST_EVERY {
            self.successes_since_persist = 0;
            true
        } else {
            false
        }
    }

    /// An activation was rejected or timed out.
    pub fn record_failure(&mut self, axis: Axis, now: f64) {
        self.last_miss = Some((axis, now));
        let (_, misses) = self.counters_mut(axis);
        *misses += 1;
        self.maybe_halve(axis);
    }

    fn flush_ring(&mut self, axis: Axis) {
        let (ring, center) = match axis {
            Axis::Horizontal => (&mut self.ratio_ring_h, &mut self.state.dir_center_h),
            Axis::Vertical => (&mut self.ratio_ring_v, &mut self.state.dir_center_v),
        };
        for sample in ring.drain(..) {
            *center = (*center * (1.0 - EMA_ALPHA) + sample * EMA_ALPHA)
                .clamp(CENTER_MIN, CENTER_MAX);
        }
        debug!(
            "Direction center on {:?} axis now {:.4}",
            axis,
            match axis {
                Axis::Horizontal => self.state.dir_center_h,
                Axis::Vertical => self.state.dir_center_v,
            }
        );
    }

    fn counters_mut(&mut self, axis: Axis) -> (&mut u32, &mut u32) {
        match axis {
            Axis::Horizontal => (&mut self.state.retry_count_h, &mut self.state.miss_count_h),
            Axis::Vertical => (&mut self.state.retry_count_v, &mut self.state.miss_count_v),
        }
    }

    fn maybe_halve(&mut self, axis: Axis) {
        let (retries, misses) = self.counters_mut(axis);
        if *retries + *misses > COUNTER_HALVE_LIMIT {
            *retries /= 2;
            *misses /= 2;
        }
    }

    /// Test support: pin a retry bonus directly.
    #[doc(hidden)]
    pub fn force_retry_bonus(&mut self, axis: Axis, bonus: f64) {
        match axis {
            Axis::Horizontal => self.state.retry_bonus_h = bonus.clamp(0.0, BONUS_MAX),
            Axis::Vertical => self.state.retry_bonus_v = bonus.clamp(0.0, BONUS_MAX),
        }
    }
}
