//! Scroll emission
//!
//! Turns activated session deltas into pixel-precise scroll events:
//! acceleration curve, natural-scroll accumulation with sub-pixel
//! remainders, phase bookkeeping and the activation ramp that flushes
//! buffered deltas without a visual jump.

use crate::app::config::{AccelerationCurve, Config};
use crate::engine::intent::ASPECT_COMPENSATION;
use crate::engine::session::TouchSession;
use crate::events::sink::EventSink;
use crate::events::types::{ScrollEvent, ScrollPhase};
use crate::touch::zones::Axis;

/// Normalized delta to pixel scale.
const PIXELS_PER_UNIT: f64 = 100.0;

/// Applies curves and accumulates deltas into emitted events.
#[derive(Debug, Clone, Default)]
pub struct ScrollEmitter;

/// Apply an acceleration curve to one component.
pub fn apply_curve(curve: AccelerationCurve, d: f64) -> f64 {
    match curve {
        AccelerationCurve::Linear => d,
        AccelerationCurve::Quadratic => d * d.abs(),
        AccelerationCurve::Cubic => d * d * d,
        AccelerationCurve::Ease => {
            let t = (d.abs() * 10.0).clamp(0.0, 1.0);
            let smooth = t * t * (3.0 - 2.0 * t);
            d * (0.5 + smooth * 0.5)
        }
    }
}

impl ScrollEmitter {
    pub fn new() -> Self {
        Self
    }

    /// Accumulate one delta and emit a scroll event when at least one
    /// whole pixel is available. Returns the emitted pixel deltas.
    ///
    /// Natural-scroll conventions: vertical content follows the finger
    /// (the vertical delta is inverted), horizontal does not invert and
    /// carries the aspect compensation.
    pub fn emit(
        &self,
        session: &mut TouchSession,
        delta: (f64, f64),
        config: &Config,
        sink: &mut dyn EventSink,
    ) -> Option<(i32, i32)> {
        let axis = session.zone.scroll_axis()?;

        let adjusted = (
            apply_curve(config.acceleration_curve, delta.0),
            apply_curve(config.acceleration_curve, delta.1),
        );

        match axis {
            Axis::Vertical => {
                session.scroll_accumulator.1 +=
                    -adjusted.1 * config.scroll_multiplier * PIXELS_PER_UNIT;
            }
            Axis::Horizontal => {
                session.scroll_accumulator.0 +=
                    adjusted.0 * config.scroll_multiplier * PIXELS_PER_UNIT * ASPECT_COMPENSATION;
            }
        }

        let sx = session.scroll_accumulator.0.trunc();
        let sy = session.scroll_accumulator.1.trunc();
        session.scroll_accumulator.0 -= sx;
        session.scroll_accumulator.1 -= sy;

        let (sx, sy) = (sx as i32, sy as i32);
        if sx == 0 && sy == 0 {
            return None;
        }

        let phase = if session.scroll_phase_began {
            ScrollPhase::Changed
        } else {
            session.scroll_phase_began = true;
            ScrollPhase::Began
        };

        sink.post_scroll(&ScrollEvent::pixels(sx, sy, phase));
        Some((sx, sy))
    }

    /// Flush buffered activation deltas with a linear ramp so the view
    /// does not jump: delta `i` of `n` is scaled by `(i+1)/(n+1)`.
    pub fn flush_ramp(
        &self,
        session: &mut TouchSession,
        deltas: &[(f64, f64)],
        config: &Config,
        sink: &mut dyn EventSink,
    ) {
        let n = deltas.len();
        for (i, &(dx, dy)) in deltas.iter().enumerate() {
            let scale = (i + 1) as f64 / (n + 1) as f64;
            self.emit(session, (dx * scale, dy * scale), config, sink);
        }
    }

    /// Close the drag phase with a zero-delta event if it was opened.
    pub fn end_session(&self, session: &mut TouchSession, sink: &mut dyn EventSink) {
        if session.scroll_phase_began {
            sink.post_scroll(&ScrollEvent::phase_ended());
            session.scroll_phase_began = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::sink::RecordingSink;
    use crate::touch::zones::Zone;

    fn vertical_session() -> TouchSession {
        TouchSession::new(Zone::RightEdge, 0.95, 0.5, 0.0)
    }

    fn horizontal_session() -> TouchSession {
        TouchSession::new(Zone::BottomEdge, 0.5, 0.05, 0.0)
    }

    #[test]
    fn test_curves() {
        assert_eq!(apply_curve(AccelerationCurve::Linear, 0.5), 0.5);
        assert_eq!(apply_curve(AccelerationCurve::Quadratic, -0.5), -0.25);
        assert_eq!(apply_curve(AccelerationCurve::Cubic, -0.5), -0.125);

        // Ease: large deltas pass through, small deltas are halved
        let large = apply_curve(AccelerationCurve::Ease, 0.5);
        assert!((large - 0.5).abs() < 1e-9);
        let small = apply_curve(AccelerationCurve::Ease, 0.001);
        assert!(small > 0.0 && small < 0.001);
    }

    #[test]
    fn test_curve_preserves_sign() {
        for curve in [
            AccelerationCurve::Linear,
            AccelerationCurve::Quadratic,
            AccelerationCurve::Cubic,
            AccelerationCurve::Ease,
        ] {
            assert!(apply_curve(curve, 0.3) > 0.0);
            assert!(apply_curve(curve, -0.3) < 0.0);
            assert_eq!(apply_curve(curve, 0.0), 0.0);
        }
    }

    #[test]
    fn test_vertical_natural_scroll_inversion() {
        let emitter = ScrollEmitter::new();
        let mut session = vertical_session();
        let mut sink = RecordingSink::new();
        let config = Config::default();

        // Finger moving down (negative dy) scrolls content positive-Y
        let emitted = emitter.emit(&mut session, (0.0, -0.0375), &config, &mut sink);
        let (sx, sy) = emitted.unwrap();
        assert_eq!(sx, 0);
        // -(-0.0375) * 3.0 * 100 = 11.25 -> 11 pixels
        assert_eq!(sy, 11);
    }

    #[test]
    fn test_horizontal_no_inversion_with_aspect() {
        let emitter = ScrollEmitter::new();
        let mut session = horizontal_session();
        let mut sink = RecordingSink::new();
        let config = Config::default();

        let emitted = emitter.emit(&mut session, (0.04, 0.0), &config, &mut sink);
        let (sx, sy) = emitted.unwrap();
        // 0.04 * 3.0 * 100 * 1.6 = 19.2 -> 19 pixels, same sign as the finger
        assert_eq!(sx, 19);
        assert_eq!(sy, 0);
    }

    #[test]
    fn test_accumulator_keeps_fraction() {
        let emitter = ScrollEmitter::new();
        let mut session = vertical_session();
        let mut sink = RecordingSink::new();
        let config = Config::default();

        emitter.emit(&mut session, (0.0, -0.0375), &config, &mut sink);
        // 11.25 emitted as 11, 0.25 remains
        assert!((session.scroll_accumulator.1 - 0.25).abs() < 1e-9);
        assert!(session.scroll_accumulator.1.abs() < 1.0);

        emitter.emit(&mut session, (0.0, -0.0375), &config, &mut sink);
        // 0.25 + 11.25 = 11.5 -> emit 11, keep 0.5
        assert!((session.scroll_accumulator.1 - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_accumulator_negative_remainder_bound() {
        let emitter = ScrollEmitter::new();
        let mut session = vertical_session();
        let mut sink = RecordingSink::new();
        let config = Config::default();

        // Finger moving up: negative pixel deltas
        for _ in 0..7 {
            emitter.emit(&mut session, (0.0, 0.0123), &config, &mut sink);
            assert!(session.scroll_accumulator.1.abs() < 1.0);
        }
        assert!(sink.scrolls.iter().all(|e| e.pixel_dy <= 0));
    }

    #[test]
    fn test_sub_pixel_deltas_skip_emission() {
        let emitter = ScrollEmitter::new();
        let mut session = vertical_session();
        let mut sink = RecordingSink::new();
        let config = Config::default();

        let emitted = emitter.emit(&mut session, (0.0, -0.001), &config, &mut sink);
        assert!(emitted.is_none());
        assert!(sink.scrolls.is_empty());
        // Phase only begins on a real emission
        assert!(!session.scroll_phase_began);
    }

    #[test]
    fn test_phase_began_then_changed() {
        let emitter = ScrollEmitter::new();
        let mut session = vertical_session();
        let mut sink = RecordingSink::new();
        let config = Config::default();

        emitter.emit(&mut session, (0.0, -0.04), &config, &mut sink);
        emitter.emit(&mut session, (0.0, -0.04), &config, &mut sink);
        assert_eq!(sink.scrolls[0].phase, ScrollPhase::Began);
        assert_eq!(sink.scrolls[1].phase, ScrollPhase::Changed);
        assert!(session.scroll_phase_began);
    }

    #[test]
    fn test_end_session_emits_zero_delta_ended() {
        let emitter = ScrollEmitter::new();
        let mut session = vertical_session();
        let mut sink = RecordingSink::new();
        let config = Config::default();

        emitter.emit(&mut session, (0.0, -0.04), &config, &mut sink);
        emitter.end_session(&mut session, &mut sink);

        let last = sink.scrolls.last().unwrap();
        assert!(last.is_zero_delta());
        assert_eq!(last.phase, ScrollPhase::Ended);
        assert!(!session.scroll_phase_began);

        // Idempotent: no second ended event
        emitter.end_session(&mut session, &mut sink);
        assert_eq!(sink.scrolls.len(), 2);
    }

    #[test]
    fn test_end_session_without_began_is_silent() {
        let emitter = ScrollEmitter::new();
        let mut session = vertical_session();
        let mut sink = RecordingSink::new();
        emitter.end_session(&mut session, &mut sink);
        assert!(sink.scrolls.is_empty());
    }

    #[test]
    fn test_flush_ramp_scales_up() {
        let emitter = ScrollEmitter::new();
        let mut session = vertical_session();
        let mut sink = RecordingSink::new();
        let config = Config::default();

        let deltas = vec![(0.0, -0.0375); 3];
        emitter.flush_ramp(&mut session, &deltas, &config, &mut sink);

        // Ramp swallows at most one event to rounding
        assert!(sink.scrolls.len() >= deltas.len() - 1);
        // Monotone non-decreasing magnitudes across the ramp
        let magnitudes: Vec<i32> = sink.scrolls.iter().map(|e| e.pixel_dy).collect();
        for pair in magnitudes.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
    }

    #[test]
    fn test_events_carry_tag() {
        let emitter = ScrollEmitter::new();
        let mut session = horizontal_session();
        let mut sink = RecordingSink::new();
        let config = Config::default();

        emitter.emit(&mut session, (0.05, 0.0), &config, &mut sink);
        emitter.end_session(&mut session, &mut sink);
        for event in &sink.scrolls {
            assert_eq!(event.tag, crate::events::types::TRACKPAL_EVENT_TAG);
            assert!(event.continuous);
        }
    }

    #[test]
    fn test_multiplier_scales_output() {
        let emitter = ScrollEmitter::new();
        let mut config = Config::default();
        config.scroll_multiplier = 6.0;
        let mut session = vertical_session();
        let mut sink = RecordingSink::new();

        let (_, sy) = emitter.emit(&mut session, (0.0, -0.0375), &config, &mut sink).unwrap();
        // 0.0375 * 6 * 100 = 22.5 -> 22
        assert_eq!(sy, 22);
    }

    #[test]
    fn test_center_zone_emits_nothing() {
        let emitter = ScrollEmitter::new();
        let mut session = TouchSession::new(Zone::Center, 0.5, 0.5, 0.0);
        let mut sink = RecordingSink::new();
        let config = Config::default();
        assert!(emitter.emit(&mut session, (0.1, 0.1), &config, &mut sink).is_none());
    }
}
