//! Bayesian intent evaluation
//!
//! Decides, from the first few frames of a touch, whether the user
//! means to scroll or should get the cursor back. Confidence starts at
//! a zone-depth prior and accumulates per-frame evidence: movement
//! direction against the learned on-axis center, speed along the zone
//! axis, and contact quality. Horizontal zones carry hard early
//! rejections because vertical drags through the bottom band are the
//! dominant false-positive source.

use crate::app::config::Config;
use crate::engine::learner::AdaptiveLearner;
use crate::engine::session::TouchSession;
use crate::touch::zones::{self, Axis, Zone};

/// Horizontal deltas are stretched by the trackpad's physical aspect
/// ratio so both axes produce comparable evidence.
pub const ASPECT_COMPENSATION: f64 = 1.6;

/// Net buffered movement that promotes a corner touch to a scroll.
pub const MIN_ACTIVATION_MOVEMENT: f64 = 0.003;

/// Deltas (including the discarded first) before a pending session is
/// forcibly rejected.
pub const ACTIVATION_MAX_FRAMES: u32 = 6;

/// Per-frame movement below this carries no usable evidence.
const MIN_EVIDENCE_TOTAL: f64 = 0.0005;

/// Base activation threshold and its floor under the retry bonus.
const BASE_THRESHOLD: f64 = 0.75;
const THRESHOLD_FLOOR: f64 = 0.67;

/// Confidence at or below this rejects outright.
const REJECT_THRESHOLD: f64 = 0.20;

/// Confidence that activates on a no-evidence (stationary) frame.
const STATIONARY_ACTIVATE_CONFIDENCE: f64 = 0.80;

/// A single noisy frame cannot kill accumulated momentum.
const MAX_NEGATIVE_UPDATE: f64 = -0.20;

const DIRECTION_DEAD_ZONE: f64 = 0.05;
const POSITIVE_DIRECTION_SCALE: f64 = 0.275;
const NEGATIVE_DIRECTION_SCALE: f64 = 0.25;

/// Verdict for one evaluated frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentDecision {
    Activated,
    Rejected,
    NeedMoreFrames,
}

/// Stateless evaluator; all per-touch state lives in the session.
#[derive(Debug, Clone)]
pub struct IntentEvaluator {
    pub max_frames: u32,
}

impl Default for IntentEvaluator {
    fn default() -> Self {
        Self {
            max_frames: ACTIVATION_MAX_FRAMES,
        }
    }
}

impl IntentEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial confidence for a touch starting at `(x, y)` in `zone`:
    /// `0.50 + 0.35 × depth`.
    pub fn zone_prior(zone: Zone, x: f64, y: f64, config: &Config) -> f64 {
        0.50 + 0.35 * zones::zone_depth(zone, x, y, config)
    }

    /// Feed one delta of a pending session. The caller guarantees
    /// `session.activation` is present.
    pub fn evaluate(
        &self,
        session: &mut TouchSession,
        delta: (f64, f64),
        density: f64,
        config: &Config,
        learner: &AdaptiveLearner,
    ) -> IntentDecision {
        let position = session.last_position;
        let latest_velocity = session.velocity_history.latest();
        let activation = session
            .activation
            .as_mut()
            .expect("evaluate called without a pending activation");

        activation.frames.push(position);
        activation.frames_observed += 1;

        // The initial contact frame is noisy at sensor edges; the first
        // delta carries no usable evidence.
        if !activation.first_delta_discarded {
            activation.first_delta_discarded = true;
            return IntentDecision::NeedMoreFrames;
        }

        activation.deltas.push(delta);
        activation.densities.push(density);

        // Corner touches have no scroll axis until promoted
        if session.zone.is_corner() {
            let (nx, ny) = session
                .activation
                .as_ref()
                .expect("activation present")
                .net_movement();
            if (nx * nx + ny * ny).sqrt() > MIN_ACTIVATION_MOVEMENT {
                match promote_corner(session.zone, nx, ny, config) {
                    Some(promoted) => {
                        let (sx, sy) = session.start_position;
                        session.zone = promoted;
                        let activation = session.activation.as_mut().expect("activation present");
                        activation.confidence = Self::zone_prior(promoted, sx, sy, config);
                        // fall through into normal evaluation
                    }
                    None => return IntentDecision::Rejected,
                }
            } else {
                let frames = session
                    .activation
                    .as_ref()
                    .expect("activation present")
                    .frames_observed;
                return if frames >= self.max_frames {
                    IntentDecision::Rejected
                } else {
                    IntentDecision::NeedMoreFrames
                };
            }
        }

        let axis = match session.zone.scroll_axis() {
            Some(axis) => axis,
            // Pending sessions only exist in scroll or corner zones
            None => return IntentDecision::Rejected,
        };

        let activation = session.activation.as_mut().expect("activation present");
        let (dx, dy) = delta;
        let abs_dx = dx.abs() * ASPECT_COMPENSATION;
        let abs_dy = dy.abs();
        let total = abs_dx + abs_dy;

        if total < MIN_EVIDENCE_TOTAL {
            return if activation.confidence >= STATIONARY_ACTIVATE_CONFIDENCE {
                IntentDecision::Activated
            } else {
                IntentDecision::NeedMoreFrames
            };
        }

        let on_axis_ratio = match axis {
            Axis::Horizontal => abs_dx / total,
            Axis::Vertical => abs_dy / total,
        };

        let (on_axis_speed, off_axis_speed) = match latest_velocity {
            Some(v) => match axis {
                Axis::Horizontal => (v.vx.abs(), v.vy.abs()),
                Axis::Vertical => (v.vy.abs(), v.vx.abs()),
            },
            None => (0.0, 0.0),
        };

        activation.last_on_axis_ratio = on_axis_ratio;
        activation.last_on_axis_speed = on_axis_speed;
        activation.last_off_axis_speed = off_axis_speed;
        activation.last_density = density;

        // Hard rejections for horizontal zones, before the positive test
        if axis == Axis::Horizontal {
            if off_axis_speed > 1.5 * on_axis_speed && activation.frames_observed <= 3 {
                return IntentDecision::Rejected;
            }
            if on_axis_ratio < 0.35 && activation.frames_observed >= 2 {
                return IntentDecision::Rejected;
            }
        }

        let center = learner.direction_center(axis);
        let deviation = on_axis_ratio - center;
        let direction_boost = if deviation.abs() <= DIRECTION_DEAD_ZONE {
            0.0
        } else if deviation > 0.0 {
            (deviation - DIRECTION_DEAD_ZONE) / (1.0 - center - DIRECTION_DEAD_ZONE)
                * POSITIVE_DIRECTION_SCALE
        } else {
            (deviation + DIRECTION_DEAD_ZONE) / (center - DIRECTION_DEAD_ZONE)
                * NEGATIVE_DIRECTION_SCALE
        };

        let velocity_boost = if on_axis_speed > 0.30 {
            0.10
        } else if on_axis_speed > 0.15 {
            0.05
        } else if on_axis_speed > 0.05 {
            0.02
        } else {
            0.0
        };

        let quality_weight = ((density - 0.02) / 0.08).clamp(0.0, 1.0) * 0.7 + 0.3;

        let update = ((direction_boost + velocity_boost) * quality_weight).max(MAX_NEGATIVE_UPDATE);
        activation.confidence = (activation.confidence + update).clamp(0.0, 1.0);

        let effective_threshold =
            (BASE_THRESHOLD - learner.retry_bonus(axis)).max(THRESHOLD_FLOOR);

        if activation.confidence >= effective_threshold {
            IntentDecision::Activated
        } else if activation.confidence <= REJECT_THRESHOLD {
            IntentDecision::Rejected
        } else if activation.frames_observed >= self.max_frames {
            IntentDecision::Rejected
        } else {
            IntentDecision::NeedMoreFrames
        }
    }
}

/// Pick the adjacent edge a sliding corner touch promotes into,
/// honoring the configured active edges. When both adjacent edges are
/// available the dominant direction decides, with a 1.5× horizontal
/// bias because edge sensor noise inflates Y.
fn promote_corner(corner_zone: Zone, net_dx: f64, net_dy: f64, config: &Config) -> Option<Zone> {
    use crate::app::config::{HorizontalPosition, VerticalEdgeMode};

    let horizontal_candidate = match corner_zone {
        Zone::BottomLeftCorner | Zone::BottomRightCorner
            if config.horizontal_position == HorizontalPosition::Bottom =>
        {
            Some(Zone::BottomEdge)
        }
        Zone::TopLeftCorner | Zone::TopRightCorner
            if config.horizontal_position == HorizontalPosition::Top =>
        {
            Some(Zone::TopEdge)
        }
        _ => None,
    };

    let vertical_candidate = match corner_zone {
        Zone::TopLeftCorner | Zone::BottomLeftCorner
            if matches!(
                config.vertical_edge_mode,
                VerticalEdgeMode::Left | VerticalEdgeMode::Both
            ) =>
        {
            Some(Zone::LeftEdge)
        }
        Zone::TopRightCorner | Zone::BottomRightCorner
            if matches!(
                config.vertical_edge_mode,
                VerticalEdgeMode::Right | VerticalEdgeMode::Both
            ) =>
        {
            Some(Zone::RightEdge)
        }
        _ => None,
    };

    match (horizontal_candidate, vertical_candidate) {
        (Some(h), Some(v)) => {
            if net_dx.abs() * 1.5 >= net_dy.abs() {
                Some(h)
            } else {
                Some(v)
            }
        }
        (Some(h), None) => Some(h),
        (None, Some(v)) => Some(v),
        (None, None) => None,
    }
}
